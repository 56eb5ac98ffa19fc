//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `RITA_WORK_DIR` and `RITA_LOG_LEVEL` env overrides. The LLM
//! credential is read from the `LLM_API_KEY` env var only, never from TOML.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs consumed by the engine
//!   (`Config`, `LlmConfig`, `ChatConfig`, `QuizConfig`).
//! - **raw** — Raw TOML deserialization types (`RawConfig`, `RawLlm`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load** — Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[engine]
bot_name = "test-bot"
work_dir = "~/.rita-tutor"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.personalization);
        assert!(cfg.memory_writes);
    }

    #[test]
    fn section_defaults_apply() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.openai.model, "gpt-3.5-turbo");
        assert_eq!(cfg.llm.anthropic.version, "2023-06-01");
        assert_eq!(cfg.chat.history_window, 10);
        assert_eq!(cfg.chat.conversation_window_hours, 24);
        assert_eq!(cfg.quiz.session_ttl_minutes, 120);
        assert_eq!(cfg.quiz.default_source, "stored");
    }

    #[test]
    fn provider_and_quiz_overrides_parse() {
        let toml = r#"
[engine]
bot_name = "rita"
work_dir = "/tmp"
log_level = "debug"
personalization = false

[llm]
default = "anthropic"

[llm.anthropic]
model = "claude-3-sonnet-20240229"

[quiz]
session_ttl_minutes = 30
default_source = "ai"
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(!cfg.personalization);
        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.llm.anthropic.model, "claude-3-sonnet-20240229");
        assert_eq!(cfg.quiz.session_ttl_minutes, 30);
        assert_eq!(cfg.quiz.default_source, "ai");
        assert_eq!(cfg.quiz.session_ttl(), std::time::Duration::from_secs(1800));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.rita-tutor");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".rita-tutor"));
    }

    #[test]
    fn absolute_path_unchanged() {
        let p = expand_home("/absolute/path");
        assert_eq!(p, std::path::PathBuf::from("/absolute/path"));
    }

    #[test]
    fn relative_path_unchanged() {
        let p = expand_home("relative/path");
        assert_eq!(p, std::path::PathBuf::from("relative/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(std::path::Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_work_dir_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), None).unwrap();
        assert_eq!(cfg.work_dir, std::path::PathBuf::from("/tmp/test-override"));
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, Some("debug")).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    const BASE_TOML: &str = r#"
[engine]
bot_name = "base-bot"
work_dir = "~/.rita-tutor"
log_level = "info"

[llm]
default = "openai"

[llm.openai]
model = "gpt-base"
temperature = 0.5
timeout_seconds = 30
api_base_url = "https://api.openai.com/v1/chat/completions"
"#;

    fn write_named(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn overlay_keeps_base_fields() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[engine]
log_level = "debug"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, None, None).unwrap();
        assert_eq!(cfg.bot_name, "base-bot");
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn overlay_wins_scalar() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[llm.openai]
model = "gpt-overlay"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, None, None).unwrap();
        assert_eq!(cfg.llm.openai.model, "gpt-overlay");
        assert_eq!(cfg.llm.openai.temperature, 0.5);
    }

    #[test]
    fn chained_bases() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "grandbase.toml", BASE_TOML);
        let middle = r#"
[meta]
base = "grandbase.toml"

[engine]
bot_name = "middle-bot"
"#;
        write_named(&dir, "middle.toml", middle);
        let top = r#"
[meta]
base = "middle.toml"

[engine]
log_level = "warn"
"#;
        let top_path = write_named(&dir, "top.toml", top);
        let cfg = load_from(&top_path, None, None).unwrap();
        assert_eq!(cfg.bot_name, "middle-bot");
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn missing_base_errors() {
        let dir = TempDir::new().unwrap();
        let overlay = r#"
[meta]
base = "nonexistent.toml"

[engine]
bot_name = "x"
work_dir = "~/.rita-tutor"
log_level = "info"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let result = load_from(&overlay_path, None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("cannot read") || msg.contains("config error"));
    }

    #[test]
    fn cycle_detection() {
        let dir = TempDir::new().unwrap();
        let self_path = dir.path().join("self.toml");
        let content = format!("[meta]\nbase = \"{}\"\n\n{BASE_TOML}", self_path.display());
        std::fs::write(&self_path, content).unwrap();
        let result = load_from(&self_path, None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("circular"));
    }
}
