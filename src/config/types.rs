//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the engine consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;
use std::time::Duration;

// ── LLM ──────────────────────────────────────────────────────────────────────

/// OpenAI-style chat-completions provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Anthropic-style messages provider configuration.
/// Populated from `[llm.anthropic]` in the TOML.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Full messages endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Value of the `anthropic-version` request header.
    pub version: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM gateway configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"openai"`, `"anthropic"`, `"scripted"`).
    pub provider: String,
    /// Config for the chat-completions provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
    /// Config for the messages provider (`[llm.anthropic]`).
    pub anthropic: AnthropicConfig,
}

// ── Chat ─────────────────────────────────────────────────────────────────────

/// Conversational engine configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// How many prior messages are replayed to the model per turn.
    pub history_window: usize,
    /// A conversation stays "active" for this many hours after its last message.
    pub conversation_window_hours: i64,
    /// A pending recommendation suppresses duplicates for the same topic
    /// for this many days.
    pub recommendation_dedup_days: i64,
    /// Token budget for a single chat reply.
    pub reply_max_tokens: u32,
}

// ── Quiz ─────────────────────────────────────────────────────────────────────

/// Quiz session configuration.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Idle lifetime of a cached quiz session, in minutes.
    pub session_ttl_minutes: u64,
    /// Question source used when the caller does not pick one
    /// (`"ai"`, `"stored"`, `"demo"`).
    pub default_source: String,
    /// Token budget for a question-generation call.
    pub generation_max_tokens: u32,
    /// Token budget for a post-quiz feedback call.
    pub feedback_max_tokens: u32,
}

impl QuizConfig {
    /// Session TTL as a [`Duration`].
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes * 60)
    }
}

// ── Config (root) ────────────────────────────────────────────────────────────

/// Fully-resolved engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Build system prompts from the student profile and performance history.
    /// When off, every student gets the plain persona prompt.
    pub personalization: bool,
    /// Persist conversation side effects (messages, counters, recommendations,
    /// analytics). When off, `converse` still replies but writes nothing.
    pub memory_writes: bool,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub quiz: QuizConfig,
    /// API key from the `LLM_API_KEY` env var, never sourced from TOML.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Config wired to the scripted provider: no API key, no network I/O.
    /// Used by tests and anywhere a deterministic gateway is wanted.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            personalization: true,
            memory_writes: true,
            llm: LlmConfig {
                provider: "scripted".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
                anthropic: AnthropicConfig {
                    api_base_url: "http://localhost:0/v1/messages".into(),
                    model: "test-model".into(),
                    version: "2023-06-01".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            chat: ChatConfig {
                history_window: 10,
                conversation_window_hours: 24,
                recommendation_dedup_days: 7,
                reply_max_tokens: 500,
            },
            quiz: QuizConfig {
                session_ttl_minutes: 120,
                default_source: "stored".into(),
                generation_max_tokens: 2000,
                feedback_max_tokens: 500,
            },
            llm_api_key: None,
        }
    }
}
