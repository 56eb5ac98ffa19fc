//! Engine-wide error types.
//!
//! `EngineError` is the failure surface of the public API. Gateway failures
//! are a separate type ([`crate::llm::GatewayError`]) because the pipeline
//! and the chat engine convert them into fallback behavior instead of
//! returning them; only the explicit connectivity probe reports one.

use thiserror::Error;

use crate::llm::GatewayError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("quiz session not found or expired: {0}")]
    SessionNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no questions available for the requested subjects")]
    NoQuestionsAvailable,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Surfaced only by the explicit LLM connectivity probe.
    #[error("llm gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
