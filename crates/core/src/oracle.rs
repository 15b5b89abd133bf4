//! The vision-language inference service, seen as an untrusted black box.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::{payload::VideoPayload, provider::OracleSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Ask the service for a JSON object response.
    Json,
    /// Accept free text and locate structure afterwards.
    FreeText,
}

/// One turn: a text prompt plus the inline video.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: String,
    pub video: VideoPayload,
    pub mode: ResponseMode,
}

/// The call itself failed. A reply that arrived but does not validate is a
/// `Rejection`, not an `OracleError`.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service error: {message}")]
    Service { message: String },

    #[error("Response has no message content")]
    MissingContent,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one request and return the raw response text, which may be empty.
    async fn infer(&self, request: InferenceRequest) -> Result<String, OracleError>;
}

/// OpenAI-compatible chat completions client (OpenRouter, Gemini's compat endpoint).
pub struct ChatCompletionsOracle {
    client: Client,
    settings: OracleSettings,
}

impl ChatCompletionsOracle {
    pub fn new(settings: OracleSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn request_body(&self, request: &InferenceRequest) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.prompt },
                        { "type": "video_url", "video_url": { "url": request.video.data_url() } },
                    ],
                },
            ],
        });
        if request.mode == ResponseMode::Json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl Oracle for ChatCompletionsOracle {
    async fn infer(&self, request: InferenceRequest) -> Result<String, OracleError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<Value>().await?;
        let content = extract_content(&response)?;
        debug!(chars = content.len(), "oracle replied");
        Ok(content)
    }
}

/// Pull the message text out of a chat completions response body.
pub fn extract_content(response: &Value) -> Result<String, OracleError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let message = error["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(OracleError::Service { message });
    }

    let content = &response["choices"][0]["message"]["content"];
    match content {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Null => Err(OracleError::MissingContent),
        // Some providers return content as a list of typed parts
        Value::Array(parts) => Ok(parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()),
        other => Err(OracleError::Service {
            message: format!("unexpected content shape: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    fn oracle() -> ChatCompletionsOracle {
        let settings = OracleSettings::new(Provider::OpenRouter, "key".into(), None, None).unwrap();
        ChatCompletionsOracle::new(settings)
    }

    #[test]
    fn json_mode_sets_response_format() {
        let video = VideoPayload::encode(b"v", "video/mp4");
        let oracle = oracle();

        let body = oracle.request_body(&InferenceRequest {
            prompt: "where".into(),
            video: video.clone(),
            mode: ResponseMode::Json,
        });
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"][0]["text"], "where");
        assert_eq!(
            body["messages"][0]["content"][1]["video_url"]["url"],
            video.data_url()
        );

        let body = oracle.request_body(&InferenceRequest {
            prompt: "describe".into(),
            video,
            mode: ResponseMode::FreeText,
        });
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn extracts_trimmed_message_content() {
        let response = json!({ "choices": [{ "message": { "content": "  {\"a\": 1}\n" } }] });
        assert_eq!(extract_content(&response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn service_error_object_is_an_error() {
        let response = json!({ "error": { "message": "rate limited", "code": 429 } });
        let err = extract_content(&response).unwrap_err();
        assert!(matches!(err, OracleError::Service { ref message } if message == "rate limited"));
    }

    #[test]
    fn missing_choices_is_missing_content() {
        let err = extract_content(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, OracleError::MissingContent));
    }
}
