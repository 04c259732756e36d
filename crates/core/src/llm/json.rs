use crate::domain::briefing::BriefingDocument;
use crate::domain::contract::SchemaContract;
use crate::error::{BriefingError, Result};

/// Strips a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
/// The JSON inside is returned untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let mut inner = trimmed;
    if let Some((_, after_first)) = inner.split_once('\n') {
        inner = after_first;
    }
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

pub fn parse_briefing(text: &str, contract: &SchemaContract<'_>) -> Result<BriefingDocument> {
    let json_str = strip_code_fence(text);
    let value = serde_json::from_str::<serde_json::Value>(json_str).map_err(|e| {
        BriefingError::MalformedResponse {
            detail: e.to_string(),
            raw_output: text.to_string(),
        }
    })?;
    contract.validate(&value)
}
