use chrono::NaiveDate;
use std::fmt;

use crate::config::BriefingProfile;

/// Inputs for one run. Built once from the static profile and the run date.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefingRequest {
    pub reference_date: NaiveDate,
    pub watchlist_universe: Vec<String>,
    pub open_positions: OpenPositions,
    pub risk_band: RiskBand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBand {
    pub lower_pct: f64,
    pub upper_pct: f64,
}

impl BriefingRequest {
    pub fn from_profile(reference_date: NaiveDate, profile: &BriefingProfile) -> Self {
        Self {
            reference_date,
            watchlist_universe: profile.watchlist.clone(),
            open_positions: profile.open_positions.clone(),
            risk_band: profile.risk_band,
        }
    }

    pub fn in_universe(&self, ticker: &str) -> bool {
        self.watchlist_universe.iter().any(|t| t == ticker)
    }

    pub fn is_open_position(&self, ticker: &str) -> bool {
        self.open_positions.contains(ticker)
    }
}

/// Held tickers with their entry prices, kept in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenPositions(Vec<(String, f64)>);

impl OpenPositions {
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.0.iter().find(|(t, _)| t == ticker).map(|(_, p)| *p)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.get(ticker).is_some()
    }

    /// Re-inserting a ticker updates its price in place.
    pub fn insert(&mut self, ticker: String, entry_price: f64) {
        match self.0.iter_mut().find(|(t, _)| *t == ticker) {
            Some(slot) => slot.1 = entry_price,
            None => self.0.push((ticker, entry_price)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(t, p)| (t.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for OpenPositions {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut out = Self::default();
        for (ticker, price) in iter {
            out.insert(ticker, price);
        }
        out
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%–{:.1}%", self.lower_pct, self.upper_pct)
    }
}

/// Validated model output. Only `SchemaContract::validate` produces one.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefingDocument {
    pub date: String,
    pub market_overview: MarketOverview,
    pub watchlist: Vec<WatchlistEntry>,
    pub open_positions: Vec<PositionSnapshot>,
    pub journal: Journal,
    pub opportunities: Vec<Opportunity>,
    pub reminders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketOverview {
    pub sentiment: String,
    /// Index name to reading, in the order the model listed them.
    pub indexes: Vec<(String, String)>,
    pub news: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub rsi: f64,
    pub macd: MacdSignal,
    pub rank: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub ticker: String,
    pub entry_price: f64,
    pub current_price: f64,
}

impl PositionSnapshot {
    /// Move from entry to current, in percent. Zero when there is no usable
    /// entry price.
    pub fn change_pct(&self) -> f64 {
        if self.entry_price > 0.0 {
            (self.current_price - self.entry_price) / self.entry_price * 100.0
        } else {
            0.0
        }
    }

    pub fn is_up(&self) -> bool {
        self.current_price >= self.entry_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Journal {
    pub did_right: Vec<String>,
    pub improve: Vec<String>,
    pub traps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub ticker: String,
    pub setup: Setup,
    pub entry_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl MacdSignal {
    pub const ALL: [MacdSignal; 3] = [Self::Bullish, Self::Bearish, Self::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl fmt::Display for MacdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    OversoldBounce,
    Breakout,
    TrendContinuation,
}

impl Setup {
    pub const ALL: [Setup; 3] = [
        Self::OversoldBounce,
        Self::Breakout,
        Self::TrendContinuation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OversoldBounce => "oversold bounce",
            Self::Breakout => "breakout",
            Self::TrendContinuation => "trend continuation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `a|b|c` form used when describing an enumerated field to the model.
pub(crate) fn alternatives(labels: impl IntoIterator<Item = &'static str>) -> String {
    labels.into_iter().collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_labels_round_trip_through_parse() {
        for m in MacdSignal::ALL {
            assert_eq!(MacdSignal::parse(m.as_str()), Some(m));
        }
        for s in Setup::ALL {
            assert_eq!(Setup::parse(s.as_str()), Some(s));
        }
        assert_eq!(MacdSignal::parse("Bullish"), None);
        assert_eq!(Setup::parse("breakdown"), None);
    }

    #[test]
    fn open_positions_keep_configured_order() {
        let positions: OpenPositions = [
            ("NVDA".to_string(), 182.72),
            ("MSFT".to_string(), 530.26),
            ("ANET".to_string(), 139.85),
            ("NVDA".to_string(), 180.0),
        ]
        .into_iter()
        .collect();
        let tickers: Vec<_> = positions.iter().map(|(t, _)| t).collect();
        assert_eq!(tickers, vec!["NVDA", "MSFT", "ANET"]);
        assert_eq!(positions.get("NVDA"), Some(180.0));
        assert!(!positions.contains("TSLA"));
    }

    #[test]
    fn risk_band_formats_with_one_decimal() {
        let band = RiskBand {
            lower_pct: 5.5,
            upper_pct: 7.0,
        };
        assert_eq!(band.to_string(), "5.5%–7.0%");
    }

    #[test]
    fn alternatives_joins_with_pipes() {
        let s = alternatives(Setup::ALL.map(Setup::as_str));
        assert_eq!(s, "oversold bounce|breakout|trend continuation");
    }
}
