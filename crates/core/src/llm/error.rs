use crate::error::BriefingError;
use crate::llm::Provider;

/// Everything known about a failed model call, kept for the log line before
/// being folded into `BriefingError::ModelCall`.
#[derive(Debug, Clone)]
pub struct LlmDiagnostics {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl LlmDiagnostics {
    pub fn into_error(self) -> BriefingError {
        tracing::error!(
            provider = ?self.provider,
            stage = self.stage,
            detail = %self.detail,
            raw_output = self.raw_output.as_deref().unwrap_or(""),
            "model call failed"
        );
        BriefingError::model_call(self.stage, self.detail)
    }
}
