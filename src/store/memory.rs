//! In-memory store — the default backend for tests and the console demo.
//!
//! All data lives in process memory behind one mutex and is discarded when
//! the process exits. Integer ids are assigned from per-table counters so
//! rows behave like their database counterparts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;

use crate::error::EngineError;
use crate::model::{
    AnswerRecord, Conversation, ConversationMessage, ConversationOwner, Difficulty, Exam,
    LearningAnalytics, PerformanceRecord, Question, QuizAttempt, RecommendationStatus,
    SessionStatus, StudentProfile, StudyRecommendation, Subject,
};
use crate::model::ConversationStatus;

use super::MemoryStore;

#[derive(Default)]
struct Inner {
    profiles: HashMap<i64, StudentProfile>,
    conversations: HashMap<String, Conversation>,
    messages: Vec<ConversationMessage>,
    performance: HashMap<(i64, i64, i64), PerformanceRecord>,
    recommendations: Vec<StudyRecommendation>,
    next_recommendation_id: i64,
    analytics: HashMap<(i64, NaiveDate, String), LearningAnalytics>,
    exams: HashMap<i64, Exam>,
    subjects: HashMap<i64, Subject>,
    questions: Vec<Question>,
    attempts: HashMap<i64, QuizAttempt>,
    next_attempt_id: i64,
    attempt_answers: HashMap<i64, Vec<AnswerRecord>>,
}

pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Store("in-memory store lock poisoned".into()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore for InMemoryStore {
    fn store_type(&self) -> &str {
        "in-memory"
    }

    // ── Student profiles ─────────────────────────────────────────────────────

    fn profile(&self, user_id: i64) -> Result<Option<StudentProfile>, EngineError> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }

    fn upsert_profile(&self, profile: &StudentProfile) -> Result<(), EngineError> {
        self.lock()?.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    // ── Conversations ────────────────────────────────────────────────────────

    fn active_conversation(
        &self,
        owner: &ConversationOwner,
        since: DateTime<Utc>,
    ) -> Result<Option<Conversation>, EngineError> {
        let inner = self.lock()?;
        Ok(inner
            .conversations
            .values()
            .filter(|c| {
                c.owner == *owner
                    && c.status == ConversationStatus::Active
                    && c.last_message_at >= since
            })
            .max_by_key(|c| c.last_message_at)
            .cloned())
    }

    fn conversation(&self, id: &str) -> Result<Option<Conversation>, EngineError> {
        Ok(self.lock()?.conversations.get(id).cloned())
    }

    fn insert_conversation(&self, conversation: &Conversation) -> Result<(), EngineError> {
        self.lock()?
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    fn update_conversation(&self, conversation: &Conversation) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        if !inner.conversations.contains_key(&conversation.id) {
            return Err(EngineError::NotFound(format!(
                "conversation {}",
                conversation.id
            )));
        }
        inner
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    fn append_message(&self, message: &ConversationMessage) -> Result<(), EngineError> {
        self.lock()?.messages.push(message.clone());
        Ok(())
    }

    fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, EngineError> {
        let inner = self.lock()?;
        let matching: Vec<&ConversationMessage> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect();
        let start = matching.len().saturating_sub(limit);
        Ok(matching[start..].iter().map(|m| (*m).clone()).collect())
    }

    // ── Performance ──────────────────────────────────────────────────────────

    fn performance(&self, user_id: i64) -> Result<Vec<PerformanceRecord>, EngineError> {
        let inner = self.lock()?;
        let mut rows: Vec<PerformanceRecord> = inner
            .performance
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.exam_id, r.subject_id));
        Ok(rows)
    }

    fn performance_for(
        &self,
        user_id: i64,
        exam_id: i64,
        subject_id: i64,
    ) -> Result<Option<PerformanceRecord>, EngineError> {
        Ok(self
            .lock()?
            .performance
            .get(&(user_id, exam_id, subject_id))
            .cloned())
    }

    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), EngineError> {
        self.lock()?.performance.insert(
            (record.user_id, record.exam_id, record.subject_id),
            record.clone(),
        );
        Ok(())
    }

    // ── Recommendations ──────────────────────────────────────────────────────

    fn has_recent_recommendation(
        &self,
        user_id: i64,
        topic: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let inner = self.lock()?;
        Ok(inner.recommendations.iter().any(|r| {
            r.user_id == user_id
                && r.topic == topic
                && r.status == RecommendationStatus::Pending
                && r.created_at >= since
        }))
    }

    fn insert_recommendation(&self, rec: &StudyRecommendation) -> Result<i64, EngineError> {
        let mut inner = self.lock()?;
        inner.next_recommendation_id += 1;
        let id = inner.next_recommendation_id;
        let mut row = rec.clone();
        row.id = id;
        inner.recommendations.push(row);
        Ok(id)
    }

    fn pending_recommendations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<StudyRecommendation>, EngineError> {
        let now = Utc::now();
        let inner = self.lock()?;
        let mut rows: Vec<StudyRecommendation> = inner
            .recommendations
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.status == RecommendationStatus::Pending
                    && r.expires_at > now
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    fn complete_recommendation(&self, id: i64) -> Result<bool, EngineError> {
        let mut inner = self.lock()?;
        match inner.recommendations.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.status = RecommendationStatus::Completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── Learning analytics ───────────────────────────────────────────────────

    fn merge_daily_analytics(&self, row: &LearningAnalytics) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        let key = (row.user_id, row.date, row.activity_type.clone());
        match inner.analytics.get_mut(&key) {
            Some(cur) => {
                let total_conv = cur.conversations + row.conversations;
                if total_conv > 0 {
                    cur.quality_score = (cur.quality_score * cur.conversations as f64
                        + row.quality_score * row.conversations as f64)
                        / total_conv as f64;
                }
                cur.conversations = total_conv;
                cur.questions_answered += row.questions_answered;
                cur.recommendations_generated += row.recommendations_generated;
            }
            None => {
                inner.analytics.insert(key, row.clone());
            }
        }
        Ok(())
    }

    fn analytics_for_day(
        &self,
        user_id: i64,
        date: NaiveDate,
        activity_type: &str,
    ) -> Result<Option<LearningAnalytics>, EngineError> {
        Ok(self
            .lock()?
            .analytics
            .get(&(user_id, date, activity_type.to_string()))
            .cloned())
    }

    // ── Quiz catalog ─────────────────────────────────────────────────────────

    fn exam(&self, exam_id: i64) -> Result<Option<Exam>, EngineError> {
        Ok(self.lock()?.exams.get(&exam_id).cloned())
    }

    fn insert_exam(&self, exam: &Exam) -> Result<(), EngineError> {
        self.lock()?.exams.insert(exam.id, exam.clone());
        Ok(())
    }

    fn subject(&self, subject_id: i64) -> Result<Option<Subject>, EngineError> {
        Ok(self.lock()?.subjects.get(&subject_id).cloned())
    }

    fn subjects_of(&self, exam_id: i64) -> Result<Vec<Subject>, EngineError> {
        let inner = self.lock()?;
        let mut rows: Vec<Subject> = inner
            .subjects
            .values()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }

    fn insert_subject(&self, subject: &Subject) -> Result<(), EngineError> {
        self.lock()?.subjects.insert(subject.id, subject.clone());
        Ok(())
    }

    fn insert_question(&self, question: &Question) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        match inner.questions.iter_mut().find(|q| q.id == question.id) {
            Some(existing) => *existing = question.clone(),
            None => inner.questions.push(question.clone()),
        }
        Ok(())
    }

    fn stored_questions(
        &self,
        subject_id: i64,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Result<Vec<Question>, EngineError> {
        let inner = self.lock()?;
        let mut rows: Vec<Question> = inner
            .questions
            .iter()
            .filter(|q| q.subject_id == Some(subject_id))
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
            .cloned()
            .collect();
        rows.shuffle(&mut rand::thread_rng());
        rows.truncate(limit);
        Ok(rows)
    }

    // ── Quiz attempts ────────────────────────────────────────────────────────

    fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<i64, EngineError> {
        let mut inner = self.lock()?;
        inner.next_attempt_id += 1;
        let id = inner.next_attempt_id;
        let mut row = attempt.clone();
        row.id = id;
        inner.attempts.insert(id, row);
        Ok(id)
    }

    fn attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, EngineError> {
        Ok(self.lock()?.attempts.get(&attempt_id).cloned())
    }

    fn complete_attempt(
        &self,
        attempt_id: i64,
        score: f64,
        correct_answers: u32,
        total_questions: u32,
        time_taken_secs: u32,
    ) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        let attempt = inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| EngineError::NotFound(format!("attempt {attempt_id}")))?;
        attempt.score = score;
        attempt.correct_answers = correct_answers;
        attempt.total_questions = total_questions;
        attempt.time_taken_secs = time_taken_secs;
        attempt.status = SessionStatus::Completed;
        attempt.completed_at = Some(Utc::now());
        Ok(())
    }

    fn record_answer(&self, attempt_id: i64, answer: &AnswerRecord) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        let answers = inner.attempt_answers.entry(attempt_id).or_default();
        match answers.iter_mut().find(|a| a.question_id == answer.question_id) {
            Some(existing) => *existing = answer.clone(),
            None => answers.push(answer.clone()),
        }
        Ok(())
    }

    fn attempt_answers(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, EngineError> {
        Ok(self
            .lock()?
            .attempt_answers
            .get(&attempt_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Priority, QuestionSource, Trend};
    use chrono::Duration;

    fn profile(user_id: i64) -> StudentProfile {
        StudentProfile::with_defaults(user_id, Utc::now())
    }

    fn conversation(id: &str, owner: ConversationOwner, last_message_at: DateTime<Utc>) -> Conversation {
        Conversation {
            id: id.to_string(),
            owner,
            title: "test".into(),
            started_at: last_message_at,
            last_message_at,
            message_count: 0,
            mood_detected: None,
            topics_covered: Vec::new(),
            status: ConversationStatus::Active,
        }
    }

    fn message(conversation_id: &str, n: usize) -> ConversationMessage {
        ConversationMessage {
            id: format!("m{n}"),
            conversation_id: conversation_id.to_string(),
            user_message: format!("user {n}"),
            ai_response: format!("reply {n}"),
            emotion: crate::model::Emotion::Neutral,
            topics: Vec::new(),
            fallback: false,
            created_at: Utc::now(),
        }
    }

    fn recommendation(user_id: i64, topic: &str, priority: Priority) -> StudyRecommendation {
        let now = Utc::now();
        StudyRecommendation {
            id: 0,
            user_id,
            topic: topic.to_string(),
            subject_id: None,
            text: format!("focus on {topic}"),
            priority,
            status: RecommendationStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(14),
        }
    }

    fn question(subject_id: i64, difficulty: Difficulty) -> Question {
        Question {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: Some(subject_id),
            stem: "stem".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: Answer::A,
            explanation: "because".into(),
            difficulty,
            source: QuestionSource::Manual,
            image: None,
        }
    }

    fn attempt(user_id: i64) -> QuizAttempt {
        QuizAttempt {
            id: 0,
            user_id: Some(user_id),
            exam_id: 1,
            subject_ids: vec![1],
            score: 0.0,
            total_questions: 0,
            correct_answers: 0,
            time_taken_secs: 0,
            status: SessionStatus::Ongoing,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn profile_upsert_and_get() {
        let store = InMemoryStore::new();
        assert!(store.profile(1).unwrap().is_none());

        store.upsert_profile(&profile(1)).unwrap();
        let mut p = store.profile(1).unwrap().unwrap();
        assert_eq!(p.total_conversations, 0);

        p.total_conversations = 3;
        store.upsert_profile(&p).unwrap();
        assert_eq!(store.profile(1).unwrap().unwrap().total_conversations, 3);
    }

    #[test]
    fn active_conversation_respects_window_and_recency() {
        let store = InMemoryStore::new();
        let owner = ConversationOwner::User(1);
        let now = Utc::now();

        store
            .insert_conversation(&conversation("old", owner.clone(), now - Duration::hours(30)))
            .unwrap();
        store
            .insert_conversation(&conversation("recent", owner.clone(), now - Duration::hours(2)))
            .unwrap();
        store
            .insert_conversation(&conversation("newest", owner.clone(), now - Duration::hours(1)))
            .unwrap();

        let since = now - Duration::hours(24);
        let found = store.active_conversation(&owner, since).unwrap().unwrap();
        assert_eq!(found.id, "newest");

        let other = ConversationOwner::Session("s1".into());
        assert!(store.active_conversation(&other, since).unwrap().is_none());
    }

    #[test]
    fn update_conversation_requires_existing_row() {
        let store = InMemoryStore::new();
        let c = conversation("c1", ConversationOwner::User(1), Utc::now());
        assert!(store.update_conversation(&c).is_err());
        store.insert_conversation(&c).unwrap();
        assert!(store.update_conversation(&c).is_ok());
    }

    #[test]
    fn recent_messages_returns_tail_in_order() {
        let store = InMemoryStore::new();
        for n in 0..5 {
            store.append_message(&message("c1", n)).unwrap();
        }
        store.append_message(&message("c2", 99)).unwrap();

        let tail = store.recent_messages("c1", 3).unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].user_message, "user 2");
        assert_eq!(tail[2].user_message, "user 4");

        let all = store.recent_messages("c1", 100).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn recommendation_dedup_window() {
        let store = InMemoryStore::new();
        store
            .insert_recommendation(&recommendation(1, "mathematics", Priority::High))
            .unwrap();

        let since = Utc::now() - Duration::days(7);
        assert!(store.has_recent_recommendation(1, "mathematics", since).unwrap());
        assert!(!store.has_recent_recommendation(1, "english", since).unwrap());
        assert!(!store.has_recent_recommendation(2, "mathematics", since).unwrap());
    }

    #[test]
    fn pending_recommendations_order_and_complete() {
        let store = InMemoryStore::new();
        store
            .insert_recommendation(&recommendation(1, "english", Priority::Medium))
            .unwrap();
        let high_id = store
            .insert_recommendation(&recommendation(1, "mathematics", Priority::High))
            .unwrap();
        let mut expired = recommendation(1, "physics", Priority::High);
        expired.expires_at = Utc::now() - Duration::days(1);
        store.insert_recommendation(&expired).unwrap();

        let pending = store.pending_recommendations(1, 10).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].topic, "mathematics");
        assert_eq!(pending[1].topic, "english");

        assert!(store.complete_recommendation(high_id).unwrap());
        assert!(!store.complete_recommendation(9999).unwrap());
        let pending = store.pending_recommendations(1, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].topic, "english");
    }

    #[test]
    fn analytics_merge_adds_counters_and_averages_quality() {
        let store = InMemoryStore::new();
        let date = Utc::now().date_naive();
        let row = LearningAnalytics {
            user_id: 1,
            date,
            activity_type: "conversation".into(),
            conversations: 1,
            questions_answered: 0,
            quality_score: 0.8,
            recommendations_generated: 1,
        };
        store.merge_daily_analytics(&row).unwrap();
        store
            .merge_daily_analytics(&LearningAnalytics { quality_score: 0.4, recommendations_generated: 0, ..row.clone() })
            .unwrap();

        let merged = store.analytics_for_day(1, date, "conversation").unwrap().unwrap();
        assert_eq!(merged.conversations, 2);
        assert_eq!(merged.recommendations_generated, 1);
        assert!((merged.quality_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn stored_questions_filter_and_limit() {
        let store = InMemoryStore::new();
        for _ in 0..4 {
            store.insert_question(&question(1, Difficulty::Easy)).unwrap();
        }
        store.insert_question(&question(1, Difficulty::Hard)).unwrap();
        store.insert_question(&question(2, Difficulty::Easy)).unwrap();

        let rows = store.stored_questions(1, Some(Difficulty::Easy), 10).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|q| q.difficulty == Difficulty::Easy));

        let rows = store.stored_questions(1, None, 3).unwrap();
        assert_eq!(rows.len(), 3);

        let rows = store.stored_questions(3, None, 10).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn attempt_lifecycle_and_answer_overwrite() {
        let store = InMemoryStore::new();
        let id = store.insert_attempt(&attempt(1)).unwrap();
        assert!(store.attempt(id).unwrap().is_some());

        let first = AnswerRecord {
            question_id: "q1".into(),
            answer: "a".into(),
            correct_answer: Answer::B,
            is_correct: false,
            time_spent_secs: 10,
            answered_at: Utc::now(),
        };
        store.record_answer(id, &first).unwrap();
        let second = AnswerRecord { answer: "b".into(), is_correct: true, ..first.clone() };
        store.record_answer(id, &second).unwrap();

        let answers = store.attempt_answers(id).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "b");
        assert!(answers[0].is_correct);

        store.complete_attempt(id, 100.0, 1, 1, 42).unwrap();
        let done = store.attempt(id).unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.score, 100.0);
        assert!(done.completed_at.is_some());

        assert!(store.complete_attempt(9999, 0.0, 0, 0, 0).is_err());
    }

    #[test]
    fn performance_rows_sorted_by_exam_then_subject() {
        let store = InMemoryStore::new();
        let base = PerformanceRecord {
            user_id: 1,
            exam_id: 2,
            subject_id: 5,
            total_attempts: 1,
            total_questions: 10,
            correct_answers: 7,
            average_score: 70.0,
            best_score: 70.0,
            latest_score: 70.0,
            trend: Trend::Stable,
            updated_at: Utc::now(),
        };
        store.upsert_performance(&base).unwrap();
        store
            .upsert_performance(&PerformanceRecord { exam_id: 1, subject_id: 9, ..base.clone() })
            .unwrap();
        store
            .upsert_performance(&PerformanceRecord { exam_id: 2, subject_id: 1, ..base.clone() })
            .unwrap();

        let rows = store.performance(1).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].exam_id, rows[0].subject_id), (1, 9));
        assert_eq!((rows[1].exam_id, rows[1].subject_id), (2, 1));
        assert_eq!((rows[2].exam_id, rows[2].subject_id), (2, 5));
    }
}
