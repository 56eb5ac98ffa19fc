//! Engine facade.
//!
//! `TutorEngine` wires the gateway, chat engine and quiz service from one
//! `Config` and a pair of storage handles, and is the only type embedders
//! need to hold. Construction is cheap; all state lives behind the store
//! and cache handles passed in.

use std::sync::Arc;

use tracing::info;

use crate::chat::{self, ChatEngine, ChatReply};
use crate::config::Config;
use crate::error::EngineError;
use crate::llm::{self, LlmGateway};
use crate::model::{ConversationMessage, QuestionSource, StudentProfile};
use crate::quiz::{AnswerOutcome, QuizResults, QuizService, QuizStart};
use crate::store::cache::SessionCache;
use crate::store::MemoryStore;

pub struct TutorEngine {
    store: Arc<dyn MemoryStore>,
    gateway: Option<LlmGateway>,
    chat: ChatEngine,
    quiz: QuizService,
    config: Config,
}

impl std::fmt::Debug for TutorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorEngine")
            .field("store", &self.store.store_type())
            .field("provider", &self.config.llm.provider)
            .finish_non_exhaustive()
    }
}

impl TutorEngine {
    /// Build the engine. The LLM API key comes from config, which sources it
    /// from the `LLM_API_KEY` env var; a key-less provider leaves the
    /// gateway unset and every reply path falls back to static behavior.
    pub fn new(
        config: Config,
        store: Arc<dyn MemoryStore>,
        cache: Arc<dyn SessionCache>,
    ) -> Result<Self, EngineError> {
        let gateway = llm::build(&config.llm, config.llm_api_key.clone())
            .map_err(|e| EngineError::Config(e.to_string()))?;
        match &gateway {
            Some(gw) => info!(provider = gw.provider_name(), "llm gateway ready"),
            None => info!(
                provider = %config.llm.provider,
                "no LLM API key, running on static fallbacks"
            ),
        }
        let chat = ChatEngine::new(store.clone(), gateway.clone(), config.clone());
        let quiz = QuizService::new(store.clone(), cache, gateway.clone(), config.quiz.clone());
        Ok(Self { store, gateway, chat, quiz, config })
    }

    // ── Chat ─────────────────────────────────────────────────────────────────

    pub async fn converse(
        &self,
        message: &str,
        user_id: Option<i64>,
        session_id: Option<&str>,
    ) -> ChatReply {
        self.chat.converse(message, user_id, session_id).await
    }

    pub fn history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, EngineError> {
        self.chat.history(conversation_id, limit)
    }

    /// Time-of-day greeting, addressed by name when the student has one.
    pub fn greeting(&self, user_id: Option<i64>, hour: u32) -> String {
        let profile: Option<StudentProfile> =
            user_id.and_then(|id| self.store.profile(id).ok().flatten());
        chat::greeting(&self.config.bot_name, profile.as_ref(), hour)
    }

    // ── Quiz ─────────────────────────────────────────────────────────────────

    pub async fn start_quiz(
        &self,
        user_id: Option<i64>,
        exam_id: i64,
        subject_ids: &[i64],
        source: Option<QuestionSource>,
    ) -> Result<QuizStart, EngineError> {
        self.quiz.start(user_id, exam_id, subject_ids, source).await
    }

    pub fn submit_answer(
        &self,
        session_id: &str,
        question_id: &str,
        answer: &str,
        time_spent_secs: u32,
    ) -> Result<AnswerOutcome, EngineError> {
        self.quiz.submit_answer(session_id, question_id, answer, time_spent_secs)
    }

    pub fn finish_quiz(&self, session_id: &str) -> Result<QuizResults, EngineError> {
        self.quiz.finish(session_id)
    }

    pub async fn feedback(&self, results: &QuizResults) -> String {
        self.quiz.feedback(results).await
    }

    // ── Health ───────────────────────────────────────────────────────────────

    /// Probe LLM connectivity and report the provider name.
    pub async fn ping(&self) -> Result<&'static str, EngineError> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| EngineError::Config("no llm gateway configured".into()))?;
        gateway.ping().await?;
        Ok(gateway.provider_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cache::MemoryCache;
    use crate::store::memory::InMemoryStore;
    use crate::store::seed::{seed_demo_catalog, UTME_EXAM_ID};
    use chrono::Utc;
    use std::path::Path;

    fn engine_for(config: Config) -> (TutorEngine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        seed_demo_catalog(store.as_ref()).unwrap();
        let cache = Arc::new(MemoryCache::new());
        let engine = TutorEngine::new(config, store.clone(), cache).unwrap();
        (engine, store)
    }

    #[tokio::test]
    async fn scripted_config_wires_a_gateway() {
        let (engine, _) = engine_for(Config::test_default(Path::new("/tmp")));
        assert_eq!(engine.ping().await.unwrap(), "scripted");

        let reply = engine.converse("hello", Some(1), None).await;
        assert!(!reply.fallback);
    }

    #[tokio::test]
    async fn missing_key_runs_on_fallbacks() {
        let mut config = Config::test_default(Path::new("/tmp"));
        config.llm.provider = "openai".into();
        config.llm_api_key = None;
        let (engine, _) = engine_for(config);

        assert!(matches!(engine.ping().await, Err(EngineError::Config(_))));
        let reply = engine.converse("hello", Some(1), None).await;
        assert!(reply.fallback);
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let mut config = Config::test_default(Path::new("/tmp"));
        config.llm.provider = "carrier-pigeon".into();
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let err = TutorEngine::new(config, store, cache).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn quiz_round_trip_through_the_facade() {
        let (engine, _) = engine_for(Config::test_default(Path::new("/tmp")));
        let start = engine.start_quiz(Some(1), UTME_EXAM_ID, &[2], None).await.unwrap();
        assert!(start.total_questions > 0);

        let outcome = engine
            .submit_answer(&start.session_id, &start.first_question.id, "A", 5)
            .unwrap();
        assert_eq!(outcome.total, start.total_questions);

        let mut next = outcome;
        while let Some(q) = next.next_question.clone() {
            next = engine.submit_answer(&start.session_id, &q.id, "A", 5).unwrap();
        }
        let results = engine.finish_quiz(&start.session_id).unwrap();
        assert_eq!(results.total_questions as usize, start.total_questions);
        let text = engine.feedback(&results).await;
        assert!(!text.is_empty());
    }

    #[test]
    fn greeting_uses_the_profile_name() {
        let (engine, store) = engine_for(Config::test_default(Path::new("/tmp")));
        let mut profile = StudentProfile::with_defaults(6, Utc::now());
        profile.name = Some("Ngozi".into());
        store.upsert_profile(&profile).unwrap();

        assert!(engine.greeting(Some(6), 9).contains("Ngozi"));
        assert!(engine.greeting(None, 9).starts_with("Good morning!"));
    }
}
