pub mod error;
pub mod json;
pub mod openai;

use crate::domain::briefing::BriefingDocument;
use crate::domain::contract::SchemaContract;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
}

/// One outbound completion. Implementations return the raw text content and
/// never retry; failures surface as `BriefingError::ModelCall`.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Calls the model once and returns only output that passed the contract.
pub async fn fetch_briefing(
    client: &dyn ModelClient,
    contract: &SchemaContract<'_>,
    prompt: &str,
) -> Result<BriefingDocument> {
    tracing::info!(provider = ?client.provider(), "requesting market briefing JSON");
    let text = client.complete(prompt).await?;
    tracing::debug!(chars = text.len(), "model response received");
    json::parse_briefing(&text, contract)
}
