//! HTML report built from a validated briefing.
//!
//! The template lives in `templates/briefing.html` and is compiled in by
//! askama, so a field the document lacks is a build error rather than a
//! runtime surprise. Anything askama still reports at render time comes back
//! as `BriefingError::Render`.
//!
//! Escaping is off: validated model text is written into the body exactly as
//! returned.

pub mod currency;

use askama::Template;
use chrono::NaiveDate;

use crate::domain::briefing::BriefingDocument;
use crate::error::{BriefingError, Result};
use crate::time::subject_date;

pub use currency::{format_signed_pct, format_usd};

/// Subject plus HTML body, ready for the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub subject: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "briefing.html", escape = "none")]
struct BriefingTemplate<'a> {
    title: &'a str,
    doc: &'a BriefingDocument,
}

mod filters {
    use std::borrow::Borrow;

    pub fn usd<T: Borrow<f64>>(value: T) -> ::askama::Result<String> {
        Ok(super::format_usd(*value.borrow()))
    }

    pub fn pct<T: Borrow<f64>>(value: T) -> ::askama::Result<String> {
        Ok(super::format_signed_pct(*value.borrow()))
    }
}

pub fn subject_line(reference_date: NaiveDate) -> String {
    format!("📊 Daily Market Briefing – {}", subject_date(reference_date))
}

pub fn render_report(doc: &BriefingDocument, reference_date: NaiveDate) -> Result<RenderedReport> {
    let subject = subject_line(reference_date);
    let html = BriefingTemplate {
        title: &subject,
        doc,
    }
    .render()
    .map_err(|e| {
        tracing::error!(anomaly = true, error = %e, "briefing template failed on a validated document");
        BriefingError::Render(e.to_string())
    })?;

    Ok(RenderedReport { subject, html })
}
