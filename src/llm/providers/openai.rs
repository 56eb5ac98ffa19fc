//! Chat-completions provider (`/v1/chat/completions`).
//!
//! Covers OpenAI and any compatible hosted or local endpoint. All wire types
//! are private to this module; callers see only text in, text out. History
//! shaping and fallback decisions belong to the engine layer, this adapter is
//! one stateless round-trip.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, GatewayError};

// ── Public provider ──────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiProvider {
    /// Build a provider from config values and the API key.
    ///
    /// The key is sent as `Authorization: Bearer <key>` on every request.
    /// The request timeout is fixed on the client here; there is no per-call
    /// override and no retry.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    /// Lightweight reachability probe.
    ///
    /// Sends a HEAD request to the configured endpoint. Any HTTP response
    /// (including 4xx) means the server is reachable. Only a transport-level
    /// failure (connection refused, timeout) is treated as unreachable.
    ///
    /// Uses a hard 5-second timeout regardless of the request timeout config.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build ping client: {e}")))?;
        client
            .head(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Network(format!("unreachable: {e}")))
    }

    /// Send `prompt` as the latest user message, preceded by the optional
    /// system prompt and prior `history` turns.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(sys) = system {
            messages.push(Message { role: "system".to_string(), content: sys.to_string() });
        }
        for turn in history {
            messages.push(Message {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(Message { role: "user".to_string(), content: prompt.to_string() });

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature: self.temperature,
        };

        debug!(
            model = %payload.model,
            max_tokens,
            history_len = history.len(),
            prompt_len = prompt.len(),
            "sending chat completion request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full request payload");
        }

        let response = self
            .client
            .post(&self.api_base_url)
            .json(&payload)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "HTTP request failed (transport)");
                GatewayError::Network(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize response");
            GatewayError::Decode(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received chat completion response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Format("empty or missing content in response".into()))
    }
}

// ── Private wire types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let detail = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("{}{code}", env.error.message)
    } else {
        body
    };

    error!(%status, %detail, "provider returned HTTP error");
    Err(GatewayError::HttpStatus { status: status.as_u16(), detail })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_payload_shape() {
        let payload = ChatCompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![
                Message { role: "system".into(), content: "be brief".into() },
                Message { role: "user".into(), content: "hi".into() },
            ],
            max_tokens: 300,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn response_content_extraction_shape() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello!  "}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap();
        assert_eq!(text, "Hello!");
    }

    #[test]
    fn missing_content_is_none() {
        let body = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices.into_iter().next().unwrap().message.content.is_none());
    }
}
