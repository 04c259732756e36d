use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

// Asia/Manila has no DST, so a fixed offset is exact.
const PHT_OFFSET_SECS: i32 = 8 * 3600;

pub fn pht() -> anyhow::Result<FixedOffset> {
    FixedOffset::east_opt(PHT_OFFSET_SECS).context("invalid PHT offset")
}

/// The briefing date: the calendar day in Manila at `now_utc`.
pub fn reference_date(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    Ok(now_utc.with_timezone(&pht()?).date_naive())
}

/// `Sunday, August 10, 2025`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

/// `August 10, 2025`
pub fn subject_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}
