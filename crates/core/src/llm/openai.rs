use crate::config::{parse_or, Settings};
use crate::error::{BriefingError, Result};
use crate::llm::error::LlmDiagnostics;
use crate::llm::{ModelClient, Provider};
use crate::prompt::SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url = settings
            .openai_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .openai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = parse_or(
            &settings.openai_timeout_secs,
            "OPENAI_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BriefingError::config(format!("failed to build reqwest client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn diagnostics(stage: &'static str, detail: impl Into<String>) -> LlmDiagnostics {
        LlmDiagnostics {
            provider: Provider::OpenAI,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    async fn create_completion(&self, req: &ChatCompletionRequest<'_>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::diagnostics("http", format!("OpenAI request failed: {e}")).into_error())?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            Self::diagnostics("http", format!("failed to read OpenAI response body: {e}")).into_error()
        })?;

        if !status.is_success() {
            return Err(LlmDiagnostics {
                raw_output: Some(text),
                ..Self::diagnostics("http", format!("status={status}"))
            }
            .into_error());
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            LlmDiagnostics {
                raw_output: Some(text.clone()),
                ..Self::diagnostics("decode", format!("unexpected completion envelope: {e}"))
            }
            .into_error()
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Self::diagnostics("decode", "completion has no choices").into_error())?;

        if let Some(refusal) = choice.message.refusal {
            return Err(Self::diagnostics("refusal", refusal).into_error());
        }

        if matches!(choice.finish_reason.as_deref(), Some("length")) {
            tracing::warn!(model = %self.model, "completion hit the token limit; JSON is likely truncated");
        }

        choice
            .message
            .content
            .ok_or_else(|| Self::diagnostics("decode", "completion message has no content").into_error())
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        self.create_completion(&req).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: Some(server.uri()),
            ..Default::default()
        };
        OpenAiClient::from_settings(&settings).unwrap()
    }

    #[test]
    fn requires_api_key() {
        let err = OpenAiClient::from_settings(&Settings::default()).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[tokio::test]
    async fn sends_json_object_request_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": "the prompt"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "{\"date\":\"x\"}"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete("the prompt").await.unwrap();
        assert_eq!(text, "{\"date\":\"x\"}");
    }

    #[tokio::test]
    async fn http_errors_are_model_call_errors_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).complete("p").await.unwrap_err();
        match err {
            BriefingError::ModelCall { stage, detail } => {
                assert_eq!(stage, "http");
                assert!(detail.contains("429"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_model_call_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("p").await.unwrap_err();
        assert!(matches!(err, BriefingError::ModelCall { stage: "decode", .. }));
    }

    #[tokio::test]
    async fn refusals_are_model_call_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": null, "refusal": "cannot help"}}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("p").await.unwrap_err();
        assert!(matches!(err, BriefingError::ModelCall { stage: "refusal", .. }));
    }
}
