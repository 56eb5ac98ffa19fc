//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape, the serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub engine: RawEngine,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub chat: RawChat,
    #[serde(default)]
    pub quiz: RawQuiz,
}

#[derive(Deserialize)]
pub(super) struct RawEngine {
    pub bot_name: String,
    pub work_dir: String,
    pub log_level: String,
    #[serde(default = "default_true")]
    pub personalization: bool,
    #[serde(default = "default_true")]
    pub memory_writes: bool,
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
    #[serde(default)]
    pub anthropic: RawAnthropicConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
            anthropic: RawAnthropicConfig::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_llm_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawAnthropicConfig {
    #[serde(default = "default_anthropic_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_anthropic_version")]
    pub version: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawAnthropicConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_anthropic_api_base_url(),
            model: default_anthropic_model(),
            version: default_anthropic_version(),
            temperature: default_llm_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawChat {
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_conversation_window_hours")]
    pub conversation_window_hours: i64,
    #[serde(default = "default_recommendation_dedup_days")]
    pub recommendation_dedup_days: i64,
    #[serde(default = "default_reply_max_tokens")]
    pub reply_max_tokens: u32,
}

impl Default for RawChat {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            conversation_window_hours: default_conversation_window_hours(),
            recommendation_dedup_days: default_recommendation_dedup_days(),
            reply_max_tokens: default_reply_max_tokens(),
        }
    }
}

// ── Quiz ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawQuiz {
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,
    #[serde(default = "default_question_source")]
    pub default_source: String,
    #[serde(default = "default_generation_max_tokens")]
    pub generation_max_tokens: u32,
    #[serde(default = "default_feedback_max_tokens")]
    pub feedback_max_tokens: u32,
}

impl Default for RawQuiz {
    fn default() -> Self {
        Self {
            session_ttl_minutes: default_session_ttl_minutes(),
            default_source: default_question_source(),
            generation_max_tokens: default_generation_max_tokens(),
            feedback_max_tokens: default_feedback_max_tokens(),
        }
    }
}

// ── Default functions (used by serde) ────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
pub(super) fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
pub(super) fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}
pub(super) fn default_anthropic_api_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
pub(super) fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}
pub(super) fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}
pub(super) fn default_llm_temperature() -> f32 {
    0.7
}
pub(super) fn default_llm_timeout_seconds() -> u64 {
    60
}

pub(super) fn default_history_window() -> usize {
    10
}
pub(super) fn default_conversation_window_hours() -> i64 {
    24
}
pub(super) fn default_recommendation_dedup_days() -> i64 {
    7
}
pub(super) fn default_reply_max_tokens() -> u32 {
    500
}

pub(super) fn default_session_ttl_minutes() -> u64 {
    120
}
fn default_question_source() -> String {
    "stored".to_string()
}
pub(super) fn default_generation_max_tokens() -> u32 {
    2000
}
pub(super) fn default_feedback_max_tokens() -> u32 {
    500
}
