//! Scripted provider: returns a canned reply (or failure) without I/O.
//! Used by tests and demo setups that need gateway behavior without a key.

use crate::llm::{ChatMessage, GatewayError};

#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    script: Script,
}

#[derive(Debug, Clone)]
enum Script {
    /// Echo the prompt back prefixed with `[echo]`.
    Echo,
    /// Always return this exact text.
    Reply(String),
    /// Always fail with a network error carrying this reason.
    Fail(String),
}

impl ScriptedProvider {
    pub fn echo() -> Self {
        Self { script: Script::Echo }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self { script: Script::Reply(text.into()) }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self { script: Script::Fail(reason.into()) }
    }

    pub async fn complete(
        &self,
        prompt: &str,
        _system: Option<&str>,
        _max_tokens: u32,
        _history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        match &self.script {
            Script::Echo => Ok(format!("[echo] {prompt}")),
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail(reason) => Err(GatewayError::Network(reason.clone())),
        }
    }
}
