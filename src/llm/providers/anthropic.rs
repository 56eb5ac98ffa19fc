//! Messages-API provider (`/v1/messages`).
//!
//! Anthropic's wire shape differs from chat completions in three ways that
//! matter here: auth uses an `x-api-key` header plus a dated
//! `anthropic-version` header, the system prompt is a top-level field rather
//! than a message, and reply text arrives as a list of content blocks. Older
//! gateways expose a top-level `completion` string instead, so extraction
//! tries blocks first and falls back to that.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, GatewayError};

// ── Public provider ──────────────────────────────────────────────────────────

/// Adapter for the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_base_url: String,
    model: String,
    version: String,
    temperature: f32,
    api_key: String,
}

impl AnthropicProvider {
    /// Build a provider from config values and the API key.
    ///
    /// `version` is the `anthropic-version` header value; the request
    /// timeout is fixed on the client, with no per-call override and no retry.
    pub fn new(
        api_base_url: String,
        model: String,
        version: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, version, temperature, api_key })
    }

    /// Lightweight reachability probe. HEAD to the endpoint, 5-second timeout;
    /// any HTTP response counts as reachable.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build ping client: {e}")))?;
        client
            .head(&self.api_base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Network(format!("unreachable: {e}")))
    }

    /// Send `prompt` as the latest user message, with the optional system
    /// prompt as the top-level `system` field and prior `history` turns ahead
    /// of it in `messages`.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        for turn in history {
            messages.push(Message {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(Message { role: "user".to_string(), content: prompt.to_string() });

        let payload = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: self.temperature,
            system: system.map(str::to_string),
            messages,
        };

        debug!(
            model = %payload.model,
            max_tokens,
            history_len = history.len(),
            prompt_len = prompt.len(),
            "sending messages request"
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
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "HTTP request failed (transport)");
                GatewayError::Network(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<MessagesResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize response");
            GatewayError::Decode(format!("failed to parse response body: {e}"))
        })?;

        debug!(blocks = parsed.content.len(), "received messages response");

        extract_text(parsed)
            .ok_or_else(|| GatewayError::Format("no text content in response".into()))
    }
}

/// First text block, else the legacy top-level `completion` string.
fn extract_text(parsed: MessagesResponse) -> Option<String> {
    parsed
        .content
        .into_iter()
        .find_map(|block| block.text)
        .or(parsed.completion)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Private wire types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    completion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// Error envelope: `{"type":"error","error":{"type":...,"message":...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
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
        match env.error.kind {
            Some(kind) => format!("{} [{kind}]", env.error.message),
            None => env.error.message,
        }
    } else {
        body
    };

    error!(%status, %detail, "provider returned HTTP error");
    Err(GatewayError::HttpStatus { status: status.as_u16(), detail })
}
