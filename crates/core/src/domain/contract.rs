//! The shape the model must return, used both to describe that shape in the
//! prompt and to check the response before anything downstream touches it.

use serde_json::{json, Value};

use crate::domain::briefing::{
    alternatives, BriefingDocument, BriefingRequest, Journal, MacdSignal, MarketOverview,
    Opportunity, PositionSnapshot, Setup, WatchlistEntry,
};
use crate::error::{BriefingError, Result};
use crate::time::long_date;

pub const FIXED_REMINDERS: [&str; 2] = [
    "Stop-loss discipline check",
    "Emotional check-in & predicted mood",
];

#[derive(Debug, Clone, Copy)]
pub struct SchemaContract<'a> {
    request: &'a BriefingRequest,
}

impl<'a> SchemaContract<'a> {
    pub fn new(request: &'a BriefingRequest) -> Self {
        Self { request }
    }

    /// Example document with the exact key layout expected back. Literal
    /// values (date, tickers, entry prices, risk band) come from the request;
    /// everything the model must fill in is a type hint string.
    pub fn describe(&self) -> Value {
        let req = self.request;

        let watchlist: Vec<Value> = req
            .watchlist_universe
            .iter()
            .map(|ticker| {
                json!({
                    "ticker": ticker,
                    "rsi": "number",
                    "macd": alternatives(MacdSignal::ALL.map(MacdSignal::as_str)),
                    "rank": "string",
                    "action": "string",
                })
            })
            .collect();

        let open_positions: Vec<Value> = req
            .open_positions
            .iter()
            .map(|(ticker, entry_price)| {
                json!({
                    "ticker": ticker,
                    "entry_price": entry_price,
                    "current_price": "find current price (number)",
                })
            })
            .collect();

        let mut reminders = vec![format!("Max risk per trade: {}", req.risk_band)];
        reminders.extend(FIXED_REMINDERS.iter().map(|s| s.to_string()));

        json!({
            "date": long_date(req.reference_date),
            "market_overview": {
                "sentiment": "string",
                "indexes": {"sp500": "string", "nasdaq": "string"},
                "news": ["string", "string"],
            },
            "watchlist": watchlist,
            "open_positions": open_positions,
            "journal": {
                "did_right": ["string"],
                "improve": ["string"],
                "traps": ["string"],
            },
            "opportunities": [{
                "ticker": "identify ticker from universe",
                "setup": alternatives(Setup::ALL.map(Setup::as_str)),
                "entry_hint": "string describing entry trigger",
            }],
            "reminders": reminders,
        })
    }

    /// Parse-and-validate boundary. Unknown extra keys are ignored; anything
    /// missing, mistyped, outside an enumeration or outside the configured
    /// ticker sets is rejected with the offending path.
    pub fn validate(&self, candidate: &Value) -> Result<BriefingDocument> {
        let root = Node::root(candidate);
        let date = root.field("date")?.string()?;

        let overview = root.field("market_overview")?;
        let market_overview = MarketOverview {
            sentiment: overview.field("sentiment")?.string()?,
            indexes: overview
                .field("indexes")?
                .entries()?
                .into_iter()
                .map(|(name, node)| -> Result<(String, String)> { Ok((name, node.string()?)) })
                .collect::<Result<Vec<_>>>()?,
            news: overview.field("news")?.strings()?,
        };

        let watchlist = root
            .field("watchlist")?
            .items()?
            .into_iter()
            .map(|item| self.watchlist_entry(item))
            .collect::<Result<Vec<_>>>()?;

        let open_positions = root
            .field("open_positions")?
            .items()?
            .into_iter()
            .map(|item| self.position(item))
            .collect::<Result<Vec<_>>>()?;

        let journal_node = root.field("journal")?;
        let journal = Journal {
            did_right: journal_node.field("did_right")?.strings()?,
            improve: journal_node.field("improve")?.strings()?,
            traps: journal_node.field("traps")?.strings()?,
        };

        let opportunities = root
            .field("opportunities")?
            .items()?
            .into_iter()
            .map(|item| self.opportunity(item))
            .collect::<Result<Vec<_>>>()?;

        Ok(BriefingDocument {
            date,
            market_overview,
            watchlist,
            open_positions,
            journal,
            opportunities,
            reminders: root.field("reminders")?.strings()?,
        })
    }

    fn watchlist_entry(&self, node: Node<'_>) -> Result<WatchlistEntry> {
        let ticker_node = node.field("ticker")?;
        let ticker = ticker_node.string()?;
        if !self.request.in_universe(&ticker) {
            return Err(ticker_node.reject("ticker is not in the configured watchlist universe"));
        }

        let macd_node = node.field("macd")?;
        let macd = MacdSignal::parse(&macd_node.string()?)
            .ok_or_else(|| macd_node.reject("expected one of bullish|bearish|neutral"))?;

        Ok(WatchlistEntry {
            ticker,
            rsi: node.field("rsi")?.number()?,
            macd,
            rank: node.field("rank")?.string()?,
            action: node.field("action")?.string()?,
        })
    }

    fn position(&self, node: Node<'_>) -> Result<PositionSnapshot> {
        let ticker_node = node.field("ticker")?;
        let ticker = ticker_node.string()?;
        if !self.request.is_open_position(&ticker) {
            return Err(ticker_node.reject("ticker is not a configured open position"));
        }

        Ok(PositionSnapshot {
            ticker,
            entry_price: node.field("entry_price")?.number()?,
            current_price: node.field("current_price")?.number()?,
        })
    }

    fn opportunity(&self, node: Node<'_>) -> Result<Opportunity> {
        let ticker = node.field("ticker")?.string()?;
        if !self.request.in_universe(&ticker) {
            tracing::warn!(%ticker, path = %node.path(), "opportunity outside the watchlist universe");
        }

        let setup_node = node.field("setup")?;
        let setup = Setup::parse(&setup_node.string()?).ok_or_else(|| {
            setup_node.reject("expected one of oversold bounce|breakout|trend continuation")
        })?;

        Ok(Opportunity {
            ticker,
            setup,
            entry_hint: node.field("entry_hint")?.string()?,
        })
    }
}

/// A JSON value plus the path that led to it.
#[derive(Debug, Clone)]
struct Node<'v> {
    path: String,
    value: &'v Value,
}

impl<'v> Node<'v> {
    fn root(value: &'v Value) -> Self {
        Self {
            path: String::new(),
            value,
        }
    }

    fn path(&self) -> &str {
        if self.path.is_empty() {
            "$"
        } else {
            &self.path
        }
    }

    fn reject(&self, reason: &str) -> BriefingError {
        BriefingError::violation(self.path(), self.value, reason)
    }

    fn field(&self, key: &str) -> Result<Node<'v>> {
        let obj = self
            .value
            .as_object()
            .ok_or_else(|| self.reject("expected an object"))?;
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        };
        match obj.get(key) {
            Some(value) => Ok(Node { path, value }),
            None => Err(BriefingError::violation(
                path,
                &Value::Null,
                "required field is missing",
            )),
        }
    }

    fn items(&self) -> Result<Vec<Node<'v>>> {
        let arr = self
            .value
            .as_array()
            .ok_or_else(|| self.reject("expected an array"))?;
        Ok(arr
            .iter()
            .enumerate()
            .map(|(i, value)| Node {
                path: format!("{}[{i}]", self.path()),
                value,
            })
            .collect())
    }

    fn entries(&self) -> Result<Vec<(String, Node<'v>)>> {
        let obj = self
            .value
            .as_object()
            .ok_or_else(|| self.reject("expected an object"))?;
        Ok(obj
            .iter()
            .map(|(k, value)| {
                (
                    k.clone(),
                    Node {
                        path: format!("{}.{k}", self.path()),
                        value,
                    },
                )
            })
            .collect())
    }

    fn string(&self) -> Result<String> {
        self.value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.reject("expected a string"))
    }

    fn number(&self) -> Result<f64> {
        self.value
            .as_f64()
            .ok_or_else(|| self.reject("expected a number"))
    }

    fn strings(&self) -> Result<Vec<String>> {
        self.items()?.iter().map(Node::string).collect()
    }
}
