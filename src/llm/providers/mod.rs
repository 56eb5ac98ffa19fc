//! LLM provider adapters.
//!
//! `build(config, api_key)` is the factory, called at startup. Hosted
//! providers need a credential; when none is present the factory returns
//! `Ok(None)` and the engine runs unconfigured, which means every consumer
//! takes its fallback path instead of calling out.

pub mod anthropic;
pub mod openai;
pub mod scripted;

use crate::config::LlmConfig;
use crate::llm::{GatewayError, LlmGateway};

/// Construct a gateway from config and an optional API key.
///
/// `api_key` is sourced from the `LLM_API_KEY` env var (never TOML).
/// `"openai"` and `"anthropic"` without a key yield `Ok(None)`; an
/// unrecognised provider name is a hard error.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<Option<LlmGateway>, GatewayError> {
    match config.provider.as_str() {
        "scripted" => Ok(Some(LlmGateway::Scripted(scripted::ScriptedProvider::echo()))),
        "openai" | "openai-compatible" => {
            let Some(key) = api_key else {
                return Ok(None);
            };
            let o = &config.openai;
            let p = openai::OpenAiProvider::new(
                o.api_base_url.clone(),
                o.model.clone(),
                o.temperature,
                o.timeout_seconds,
                key,
            )?;
            Ok(Some(LlmGateway::OpenAi(p)))
        }
        "anthropic" => {
            let Some(key) = api_key else {
                return Ok(None);
            };
            let a = &config.anthropic;
            let p = anthropic::AnthropicProvider::new(
                a.api_base_url.clone(),
                a.model.clone(),
                a.version.clone(),
                a.temperature,
                a.timeout_seconds,
                key,
            )?;
            Ok(Some(LlmGateway::Anthropic(p)))
        }
        _ => Err(GatewayError::UnknownProvider(config.provider.clone())),
    }
}
