use crate::domain::briefing::BriefingRequest;
use crate::domain::contract::SchemaContract;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that provides a market briefing.";

/// User instruction for one run. Pure: the same request always yields the
/// same bytes.
pub fn build_prompt(request: &BriefingRequest) -> String {
    let shape = SchemaContract::new(request).describe();
    // Serializing a `Value` we just built cannot fail.
    let shape = serde_json::to_string_pretty(&shape).unwrap_or_default();

    let universe = request.watchlist_universe.join(", ");
    let positions = request
        .open_positions
        .iter()
        .map(|(ticker, entry)| format!("{ticker} (entry {entry:.2})"))
        .collect::<Vec<_>>()
        .join(", ");
    let positions = if positions.is_empty() {
        "none".to_string()
    } else {
        positions
    };

    format!(
        "You are a market analyst. Return ONLY valid JSON, no prose, matching this schema exactly:\n\n\
{shape}\n\n\
Guidance:\n\
- Watchlist universe: {universe}.\n\
- Open positions: {positions}.\n\
- Risk band per trade: {band}.\n\
- For `watchlist`, include only tickers from the watchlist universe.\n\
- For `open_positions`, find the latest price for the given tickers and put it in `current_price` as a number.\n\
- For `opportunities`, identify new trade setups drawn only from the watchlist universe.\n\
- Be concise and realistic with indicators.\n\
- Use USD numbers for entries and prices.\n\
- Do not include any text outside JSON.",
        band = request.risk_band,
    )
}
