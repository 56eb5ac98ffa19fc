//! LLM gateway abstraction.
//!
//! `LlmGateway` is an enum over concrete provider adapters. Add a new
//! variant + module in `providers/` for each additional backend.
//!
//! Gateway instances are shared immutable capabilities; clone them freely.
//! Async is delegated to the underlying adapter; `send` is an `async fn` on
//! the enum so callers need no trait-object machinery.
//!
//! One call = one attempt. There is no retry layer: consumers treat any
//! [`GatewayError`] as "use the fallback path", so retrying here would only
//! delay that decision.

pub mod providers;

use thiserror::Error;

pub use providers::build;

// ── Error ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure: DNS, connect, TLS, timeout.
    #[error("network error: {0}")]
    Network(String),
    /// The provider answered with a non-success status.
    #[error("http {status}: {detail}")]
    HttpStatus { status: u16, detail: String },
    /// The response body was not valid JSON for the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// The body decoded but carried no usable text.
    #[error("malformed reply: {0}")]
    Format(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

// ── Conversation turns ───────────────────────────────────────────────────────

/// Role tag for a prior turn handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One prior turn of conversation context.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

// ── Gateway enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new match arms.
#[derive(Debug, Clone)]
pub enum LlmGateway {
    OpenAi(providers::openai::OpenAiProvider),
    Anthropic(providers::anthropic::AnthropicProvider),
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmGateway {
    /// One round-trip to the provider: `prompt` as the latest user message,
    /// optionally a system prompt and prior `history` turns. Returns the
    /// reply text with surrounding whitespace trimmed.
    pub async fn send(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u32,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        match self {
            LlmGateway::OpenAi(p) => p.complete(prompt, system, max_tokens, history).await,
            LlmGateway::Anthropic(p) => p.complete(prompt, system, max_tokens, history).await,
            LlmGateway::Scripted(p) => p.complete(prompt, system, max_tokens, history).await,
        }
    }

    /// Reachability probe against the provider endpoint. Any HTTP response
    /// counts as reachable; only transport failures are errors.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        match self {
            LlmGateway::OpenAi(p) => p.ping().await,
            LlmGateway::Anthropic(p) => p.ping().await,
            LlmGateway::Scripted(_) => Ok(()),
        }
    }

    /// Short name for log fields.
    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmGateway::OpenAi(_) => "openai",
            LlmGateway::Anthropic(_) => "anthropic",
            LlmGateway::Scripted(_) => "scripted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_detail() {
        let e = GatewayError::HttpStatus { status: 429, detail: "rate limited".into() };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("rate limited"));

        let e = GatewayError::Format("empty content".into());
        assert!(e.to_string().contains("empty content"));
    }

    #[test]
    fn chat_message_constructors() {
        let m = ChatMessage::user("hi");
        assert_eq!(m.role, ChatRole::User);
        assert_eq!(m.role.as_str(), "user");
        let m = ChatMessage::assistant("hello");
        assert_eq!(m.role.as_str(), "assistant");
    }

    #[tokio::test]
    async fn scripted_gateway_round_trip() {
        let gw = LlmGateway::Scripted(providers::scripted::ScriptedProvider::echo());
        let reply = gw.send("hello", None, 100, &[]).await.unwrap();
        assert_eq!(reply, "[echo] hello");
        assert!(gw.ping().await.is_ok());
        assert_eq!(gw.provider_name(), "scripted");
    }
}
