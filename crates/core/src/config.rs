use std::time::Duration;

use crate::domain::briefing::{OpenPositions, RiskBand};
use crate::error::{BriefingError, Result};

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

const DEFAULT_WATCHLIST: [&str; 8] = ["MSFT", "NVDA", "ETN", "LLY", "NOC", "MA", "ANET", "CRWD"];
const DEFAULT_POSITIONS: [(&str, f64); 3] = [("NVDA", 182.72), ("MSFT", 530.26), ("ANET", 139.85)];
const DEFAULT_RISK_BAND: RiskBand = RiskBand {
    lower_pct: 5.5,
    upper_pct: 7.0,
};

/// Raw configuration captured once at startup. Nothing below this layer
/// reads the process environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_timeout_secs: Option<String>,
    pub email_user: Option<String>,
    pub email_password: Option<String>,
    pub email_to: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub smtp_timeout_secs: Option<String>,
    pub sentry_dsn: Option<String>,
    pub briefing_watchlist: Option<String>,
    pub briefing_positions: Option<String>,
    pub briefing_risk_band: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL"),
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_timeout_secs: get("OPENAI_TIMEOUT_SECS"),
            email_user: get("EMAIL_USER"),
            email_password: get("GMAIL_APP_PASSWORD"),
            email_to: get("EMAIL_TO"),
            smtp_host: get("SMTP_HOST"),
            smtp_port: get("SMTP_PORT"),
            smtp_timeout_secs: get("SMTP_TIMEOUT_SECS"),
            sentry_dsn: get("SENTRY_DSN"),
            briefing_watchlist: get("BRIEFING_WATCHLIST"),
            briefing_positions: get("BRIEFING_POSITIONS"),
            briefing_risk_band: get("BRIEFING_RISK_BAND"),
        }
    }

    pub fn require_openai_api_key(&self) -> Result<&str> {
        require(&self.openai_api_key, "OPENAI_API_KEY")
    }

    pub fn require_email_user(&self) -> Result<&str> {
        require(&self.email_user, "EMAIL_USER")
    }

    pub fn require_email_password(&self) -> Result<&str> {
        require(&self.email_password, "GMAIL_APP_PASSWORD")
    }

    /// Falls back to the sender when `EMAIL_TO` is unset.
    pub fn recipient(&self) -> Result<&str> {
        match self.email_to.as_deref() {
            Some(to) => Ok(to),
            None => self.require_email_user(),
        }
    }

    pub fn smtp_host(&self) -> &str {
        self.smtp_host.as_deref().unwrap_or(DEFAULT_SMTP_HOST)
    }

    pub fn smtp_port(&self) -> Result<u16> {
        parse_or(&self.smtp_port, "SMTP_PORT", DEFAULT_SMTP_PORT)
    }

    pub fn smtp_timeout(&self) -> Result<Duration> {
        parse_or(
            &self.smtp_timeout_secs,
            "SMTP_TIMEOUT_SECS",
            DEFAULT_SMTP_TIMEOUT_SECS,
        )
        .map(Duration::from_secs)
    }

    pub fn profile(&self) -> Result<BriefingProfile> {
        BriefingProfile::from_settings(self)
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| BriefingError::config(format!("{name} is required")))
}

pub(crate) fn parse_or<T: std::str::FromStr>(
    value: &Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match value.as_deref() {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| BriefingError::config(format!("{name} must be a number (got {raw:?})"))),
    }
}

/// What the briefing covers: the tickers to analyse, what is currently held
/// and the per-trade risk band.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefingProfile {
    pub watchlist: Vec<String>,
    pub open_positions: OpenPositions,
    pub risk_band: RiskBand,
}

impl Default for BriefingProfile {
    fn default() -> Self {
        Self {
            watchlist: DEFAULT_WATCHLIST.iter().map(|t| t.to_string()).collect(),
            open_positions: DEFAULT_POSITIONS
                .iter()
                .map(|(t, p)| (t.to_string(), *p))
                .collect(),
            risk_band: DEFAULT_RISK_BAND,
        }
    }
}

impl BriefingProfile {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut out = Self::default();

        if let Some(s) = settings.briefing_watchlist.as_deref() {
            out.watchlist = parse_watchlist(s)?;
        }
        if let Some(s) = settings.briefing_positions.as_deref() {
            out.open_positions = parse_positions(s)?;
        }
        if let Some(s) = settings.briefing_risk_band.as_deref() {
            out.risk_band = parse_risk_band(s)?;
        }

        Ok(out)
    }
}

fn normalize_ticker(raw: &str) -> Option<String> {
    let t = raw.trim().to_ascii_uppercase();
    (!t.is_empty()).then_some(t)
}

fn parse_watchlist(s: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for ticker in s.split(',').filter_map(normalize_ticker) {
        if !out.contains(&ticker) {
            out.push(ticker);
        }
    }
    if out.is_empty() {
        return Err(BriefingError::config(
            "BRIEFING_WATCHLIST must list at least one ticker",
        ));
    }
    Ok(out)
}

/// `NVDA:182.72,MSFT:530.26`
fn parse_positions(s: &str) -> Result<OpenPositions> {
    let mut out = OpenPositions::default();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (ticker, price) = part.split_once(':').ok_or_else(|| {
            BriefingError::config(format!(
                "BRIEFING_POSITIONS entry {part:?} must look like TICKER:PRICE"
            ))
        })?;
        let ticker = normalize_ticker(ticker).ok_or_else(|| {
            BriefingError::config(format!("BRIEFING_POSITIONS entry {part:?} has no ticker"))
        })?;
        let price = price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| {
                BriefingError::config(format!(
                    "BRIEFING_POSITIONS entry {part:?} needs a positive price"
                ))
            })?;
        out.insert(ticker, price);
    }
    Ok(out)
}

/// `5.5-7.0`
fn parse_risk_band(s: &str) -> Result<RiskBand> {
    let invalid = || {
        BriefingError::config(format!(
            "BRIEFING_RISK_BAND must look like LOWER-UPPER with LOWER <= UPPER (got {s:?})"
        ))
    };
    let (lower, upper) = s.split_once('-').ok_or_else(invalid)?;
    let lower_pct = lower.trim().parse::<f64>().map_err(|_| invalid())?;
    let upper_pct = upper.trim().parse::<f64>().map_err(|_| invalid())?;
    if !(0.0..=upper_pct).contains(&lower_pct) {
        return Err(invalid());
    }
    Ok(RiskBand {
        lower_pct,
        upper_pct,
    })
}
