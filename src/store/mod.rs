//! Store trait — the persistence operations the engine depends on.
//!
//! Backends are pluggable and synchronous; every call is a fast local
//! operation (map lookup or embedded-database query), so the async engine
//! calls them inline. Default trait methods return an "unsupported" error,
//! letting partial backends implement only what they need.
//!
//! The TTL'd quiz-session cache is a separate, narrower interface in
//! [`cache`]: sessions are disposable snapshots, not records.

pub mod cache;
pub mod memory;
pub mod seed;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::EngineError;
use crate::model::{
    AnswerRecord, Conversation, ConversationMessage, ConversationOwner, Difficulty, Exam,
    LearningAnalytics, PerformanceRecord, Question, QuizAttempt, StudentProfile,
    StudyRecommendation, Subject,
};

fn unsupported(store: &str, op: &str) -> EngineError {
    EngineError::Store(format!("store '{store}' does not support {op}"))
}

/// Pluggable persistence backend.
///
/// Implementations are `Send + Sync` and shared behind an `Arc`. Writes that
/// happen as conversation side effects are wrapped by the caller and never
/// fail the user-facing operation; reads on the critical path degrade to
/// defaults instead.
pub trait MemoryStore: Send + Sync {
    /// Unique backend name (e.g. `"in-memory"`, `"sqlite"`).
    fn store_type(&self) -> &str;

    // ── Student profiles ─────────────────────────────────────────────────────

    fn profile(&self, _user_id: i64) -> Result<Option<StudentProfile>, EngineError> {
        Err(unsupported(self.store_type(), "profile"))
    }

    /// Insert or fully replace a profile row keyed by `user_id`.
    fn upsert_profile(&self, _profile: &StudentProfile) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "upsert_profile"))
    }

    // ── Conversations ────────────────────────────────────────────────────────

    /// Newest active conversation for `owner` whose `last_message_at` is at
    /// or after `since`.
    fn active_conversation(
        &self,
        _owner: &ConversationOwner,
        _since: DateTime<Utc>,
    ) -> Result<Option<Conversation>, EngineError> {
        Err(unsupported(self.store_type(), "active_conversation"))
    }

    fn conversation(&self, _id: &str) -> Result<Option<Conversation>, EngineError> {
        Err(unsupported(self.store_type(), "conversation"))
    }

    fn insert_conversation(&self, _conversation: &Conversation) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "insert_conversation"))
    }

    /// Replace the stored row for `conversation.id`.
    fn update_conversation(&self, _conversation: &Conversation) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "update_conversation"))
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    fn append_message(&self, _message: &ConversationMessage) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "append_message"))
    }

    /// Last `limit` messages of a conversation in chronological order.
    fn recent_messages(
        &self,
        _conversation_id: &str,
        _limit: usize,
    ) -> Result<Vec<ConversationMessage>, EngineError> {
        Err(unsupported(self.store_type(), "recent_messages"))
    }

    // ── Performance ──────────────────────────────────────────────────────────

    fn performance(&self, _user_id: i64) -> Result<Vec<PerformanceRecord>, EngineError> {
        Err(unsupported(self.store_type(), "performance"))
    }

    fn performance_for(
        &self,
        _user_id: i64,
        _exam_id: i64,
        _subject_id: i64,
    ) -> Result<Option<PerformanceRecord>, EngineError> {
        Err(unsupported(self.store_type(), "performance_for"))
    }

    /// Insert or fully replace the row keyed by (user, exam, subject).
    fn upsert_performance(&self, _record: &PerformanceRecord) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "upsert_performance"))
    }

    // ── Recommendations ──────────────────────────────────────────────────────

    /// Whether a pending recommendation for (user, topic) was created at or
    /// after `since`. Drives the dedup window.
    fn has_recent_recommendation(
        &self,
        _user_id: i64,
        _topic: &str,
        _since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        Err(unsupported(self.store_type(), "has_recent_recommendation"))
    }

    /// Insert a recommendation, ignoring `rec.id`; returns the assigned id.
    fn insert_recommendation(&self, _rec: &StudyRecommendation) -> Result<i64, EngineError> {
        Err(unsupported(self.store_type(), "insert_recommendation"))
    }

    /// Unexpired pending recommendations, highest priority first, then newest.
    fn pending_recommendations(
        &self,
        _user_id: i64,
        _limit: usize,
    ) -> Result<Vec<StudyRecommendation>, EngineError> {
        Err(unsupported(self.store_type(), "pending_recommendations"))
    }

    /// Mark a recommendation completed. Returns false when the id is unknown.
    fn complete_recommendation(&self, _id: i64) -> Result<bool, EngineError> {
        Err(unsupported(self.store_type(), "complete_recommendation"))
    }

    // ── Learning analytics ───────────────────────────────────────────────────

    /// Merge a row into (user, date, activity): counters add up and
    /// `quality_score` becomes the average weighted by conversation counts.
    /// No existing row means a plain insert.
    fn merge_daily_analytics(&self, _row: &LearningAnalytics) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "merge_daily_analytics"))
    }

    fn analytics_for_day(
        &self,
        _user_id: i64,
        _date: NaiveDate,
        _activity_type: &str,
    ) -> Result<Option<LearningAnalytics>, EngineError> {
        Err(unsupported(self.store_type(), "analytics_for_day"))
    }

    // ── Quiz catalog ─────────────────────────────────────────────────────────

    fn exam(&self, _exam_id: i64) -> Result<Option<Exam>, EngineError> {
        Err(unsupported(self.store_type(), "exam"))
    }

    fn insert_exam(&self, _exam: &Exam) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "insert_exam"))
    }

    fn subject(&self, _subject_id: i64) -> Result<Option<Subject>, EngineError> {
        Err(unsupported(self.store_type(), "subject"))
    }

    fn subjects_of(&self, _exam_id: i64) -> Result<Vec<Subject>, EngineError> {
        Err(unsupported(self.store_type(), "subjects_of"))
    }

    fn insert_subject(&self, _subject: &Subject) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "insert_subject"))
    }

    /// Insert or replace a question keyed by its string id.
    fn insert_question(&self, _question: &Question) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "insert_question"))
    }

    /// Up to `limit` stored questions for a subject in random order,
    /// optionally filtered to one difficulty.
    fn stored_questions(
        &self,
        _subject_id: i64,
        _difficulty: Option<Difficulty>,
        _limit: usize,
    ) -> Result<Vec<Question>, EngineError> {
        Err(unsupported(self.store_type(), "stored_questions"))
    }

    // ── Quiz attempts ────────────────────────────────────────────────────────

    /// Insert an attempt, ignoring `attempt.id`; returns the assigned id.
    fn insert_attempt(&self, _attempt: &QuizAttempt) -> Result<i64, EngineError> {
        Err(unsupported(self.store_type(), "insert_attempt"))
    }

    fn attempt(&self, _attempt_id: i64) -> Result<Option<QuizAttempt>, EngineError> {
        Err(unsupported(self.store_type(), "attempt"))
    }

    /// Finalize an attempt with its score and mark it completed.
    fn complete_attempt(
        &self,
        _attempt_id: i64,
        _score: f64,
        _correct_answers: u32,
        _total_questions: u32,
        _time_taken_secs: u32,
    ) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "complete_attempt"))
    }

    /// Record an answer for (attempt, question). A second record for the same
    /// question replaces the first; duplicates never accumulate.
    fn record_answer(&self, _attempt_id: i64, _answer: &AnswerRecord) -> Result<(), EngineError> {
        Err(unsupported(self.store_type(), "record_answer"))
    }

    fn attempt_answers(&self, _attempt_id: i64) -> Result<Vec<AnswerRecord>, EngineError> {
        Err(unsupported(self.store_type(), "attempt_answers"))
    }
}
