//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `RITA_WORK_DIR` and `RITA_LOG_LEVEL` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

use super::raw::{self, RawConfig};
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively so the overlay only needs to specify keys
/// that differ from the base. For every other type (string, integer, array)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, EngineError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(EngineError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. If no path is given and `config/default.toml` does not
/// exist, returns the built-in defaults (demo mode).
pub fn load(config_path: Option<&str>) -> Result<Config, EngineError> {
    let work_dir_override = env::var("RITA_WORK_DIR").ok();
    let log_level_override = env::var("RITA_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(
            Path::new(path),
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        );
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(
            default_path,
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        )
    } else {
        let work_dir_str = work_dir_override.unwrap_or_else(|| "~/.rita-tutor".to_string());
        let work_dir = expand_home(&work_dir_str);
        let log_level = log_level_override.unwrap_or_else(|| "info".to_string());

        Ok(Config {
            bot_name: "rita".to_string(),
            work_dir,
            log_level,
            personalization: true,
            memory_writes: true,
            llm: builtin_llm(),
            chat: builtin_chat(),
            quiz: builtin_quiz(),
            llm_api_key: env::var("LLM_API_KEY").ok(),
        })
    }
}

/// Internal loader accepting an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, EngineError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        EngineError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    let e = parsed.engine;

    let work_dir_str = work_dir_override.unwrap_or(&e.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&e.log_level).to_string();

    Ok(Config {
        bot_name: e.bot_name,
        work_dir,
        log_level,
        personalization: e.personalization,
        memory_writes: e.memory_writes,
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
            anthropic: AnthropicConfig {
                api_base_url: parsed.llm.anthropic.api_base_url,
                model: parsed.llm.anthropic.model,
                version: parsed.llm.anthropic.version,
                temperature: parsed.llm.anthropic.temperature,
                timeout_seconds: parsed.llm.anthropic.timeout_seconds,
            },
        },
        chat: ChatConfig {
            history_window: parsed.chat.history_window.max(1),
            conversation_window_hours: parsed.chat.conversation_window_hours.max(1),
            recommendation_dedup_days: parsed.chat.recommendation_dedup_days.max(0),
            reply_max_tokens: parsed.chat.reply_max_tokens.max(1),
        },
        quiz: QuizConfig {
            session_ttl_minutes: parsed.quiz.session_ttl_minutes.max(1),
            default_source: parsed.quiz.default_source,
            generation_max_tokens: parsed.quiz.generation_max_tokens.max(1),
            feedback_max_tokens: parsed.quiz.feedback_max_tokens.max(1),
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
    })
}

fn builtin_llm() -> LlmConfig {
    LlmConfig {
        provider: "openai".to_string(),
        openai: OpenAiConfig {
            api_base_url: raw::default_openai_api_base_url(),
            model: raw::default_openai_model(),
            temperature: raw::default_llm_temperature(),
            timeout_seconds: raw::default_llm_timeout_seconds(),
        },
        anthropic: AnthropicConfig {
            api_base_url: raw::default_anthropic_api_base_url(),
            model: raw::default_anthropic_model(),
            version: raw::default_anthropic_version(),
            temperature: raw::default_llm_temperature(),
            timeout_seconds: raw::default_llm_timeout_seconds(),
        },
    }
}

fn builtin_chat() -> ChatConfig {
    ChatConfig {
        history_window: raw::default_history_window(),
        conversation_window_hours: raw::default_conversation_window_hours(),
        recommendation_dedup_days: raw::default_recommendation_dedup_days(),
        reply_max_tokens: raw::default_reply_max_tokens(),
    }
}

fn builtin_quiz() -> QuizConfig {
    QuizConfig {
        session_ttl_minutes: raw::default_session_ttl_minutes(),
        default_source: "stored".to_string(),
        generation_max_tokens: raw::default_generation_max_tokens(),
        feedback_max_tokens: raw::default_feedback_max_tokens(),
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
