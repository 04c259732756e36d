use thiserror::Error;

/// Every way a briefing run can fail. Each variant belongs to exactly one
/// pipeline stage; none of them is recovered from inside the pipeline.
#[derive(Debug, Error)]
pub enum BriefingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model call failed (stage={stage}): {detail}")]
    ModelCall { stage: &'static str, detail: String },

    #[error("model response is not valid JSON: {detail}")]
    MalformedResponse { detail: String, raw_output: String },

    #[error("schema violation at `{path}`: {reason} (got {value})")]
    SchemaViolation {
        path: String,
        value: String,
        reason: String,
    },

    #[error("report rendering failed: {0}")]
    Render(String),

    #[error("delivery failed after {attempts} attempts: {source}")]
    DeliveryExhausted {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BriefingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn model_call(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::ModelCall {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn violation(
        path: impl Into<String>,
        value: &serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            value: truncate(&value.to_string(), 120),
            reason: reason.into(),
        }
    }

    /// Stable short name used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ModelCall { .. } => "model_call",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::Render(_) => "render",
            Self::DeliveryExhausted { .. } => "delivery_exhausted",
        }
    }
}

pub type Result<T> = std::result::Result<T, BriefingError>;

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn violation_keeps_path_and_truncates_value() {
        let long = json!("x".repeat(500));
        let err = BriefingError::violation("journal.traps[0]", &long, "expected a string");
        match &err {
            BriefingError::SchemaViolation { path, value, .. } => {
                assert_eq!(path, "journal.traps[0]");
                assert!(value.chars().count() <= 121);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn delivery_exhausted_exposes_source() {
        let err = BriefingError::DeliveryExhausted {
            attempts: 5,
            source: anyhow::anyhow!("connection refused").into(),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
        assert!(err.to_string().contains("5 attempts"));
    }
}
