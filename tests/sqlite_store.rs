//! Integration tests for the SQLite store.
//!
//! Run with:
//!   cargo test --features sqlite-store --test sqlite_store

use chrono::{Duration, Utc};
use tempfile::TempDir;

use rita_tutor::model::{
    Answer, AnswerRecord, Conversation, ConversationMessage, ConversationOwner,
    ConversationStatus, Difficulty, Emotion, LearningAnalytics, PerformanceRecord, Priority,
    Question, QuestionSource, QuizAttempt, RecommendationStatus, SessionStatus, StudentProfile,
    StudyRecommendation, Trend,
};
use rita_tutor::store::MemoryStore;
use rita_tutor::store::seed::{self, UTME_EXAM_ID};
use rita_tutor::store::sqlite::SqliteStore;

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_store() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteStore::open(&tmp.path().join("rita.db")).expect("open store");
    (tmp, store)
}

fn conversation(id: &str, owner: ConversationOwner) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: id.to_string(),
        owner,
        title: "How do I prepare for UTME?".into(),
        started_at: now,
        last_message_at: now,
        message_count: 1,
        mood_detected: Some(Emotion::Worried),
        topics_covered: vec!["exam_prep".into()],
        status: ConversationStatus::Active,
    }
}

fn message(conversation_id: &str, n: usize) -> ConversationMessage {
    ConversationMessage {
        id: format!("m{n}"),
        conversation_id: conversation_id.to_string(),
        user_message: format!("question {n}"),
        ai_response: format!("answer {n}"),
        emotion: Emotion::Curious,
        topics: vec!["mathematics".into()],
        fallback: false,
        created_at: Utc::now() + Duration::milliseconds(n as i64),
    }
}

fn recommendation(user_id: i64, topic: &str, priority: Priority) -> StudyRecommendation {
    let now = Utc::now();
    StudyRecommendation {
        id: 0,
        user_id,
        topic: topic.to_string(),
        subject_id: None,
        text: format!("Spend extra time on {topic} this week."),
        priority,
        status: RecommendationStatus::Pending,
        created_at: now,
        expires_at: now + Duration::days(14),
    }
}

// ── schema and durability ────────────────────────────────────────────────────

#[test]
fn open_creates_database_file() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("nested").join("rita.db");
    let _store = SqliteStore::open(&db_path).expect("open should succeed");
    assert!(db_path.exists());
}

#[test]
fn data_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("rita.db");

    let store = SqliteStore::open(&db_path).unwrap();
    seed::seed_demo_catalog(&store).unwrap();
    drop(store);

    let store = SqliteStore::open(&db_path).unwrap();
    let utme = store.exam(UTME_EXAM_ID).unwrap().expect("seeded exam");
    assert_eq!(utme.name, "UTME");
    assert_eq!(store.subjects_of(UTME_EXAM_ID).unwrap().len(), 5);
}

// ── profiles ─────────────────────────────────────────────────────────────────

#[test]
fn profile_round_trip() {
    let (_tmp, store) = open_store();
    assert!(store.profile(1).unwrap().is_none());

    let mut profile = StudentProfile::with_defaults(1, Utc::now());
    profile.name = Some("Ada".into());
    profile.strong_subjects = vec!["english".into()];
    profile.weak_subjects = vec!["physics".into(), "chemistry".into()];
    profile.personality_traits = vec!["persistent".into()];
    store.upsert_profile(&profile).unwrap();

    let got = store.profile(1).unwrap().expect("stored profile");
    assert_eq!(got.name.as_deref(), Some("Ada"));
    assert_eq!(got.learning_style, "mixed");
    assert_eq!(got.preferred_difficulty, Difficulty::Medium);
    assert_eq!(got.weak_subjects, vec!["physics", "chemistry"]);

    // Second upsert replaces the row.
    profile.total_conversations = 9;
    store.upsert_profile(&profile).unwrap();
    assert_eq!(store.profile(1).unwrap().unwrap().total_conversations, 9);
}

// ── conversations and messages ───────────────────────────────────────────────

#[test]
fn conversation_round_trip_both_owner_kinds() {
    let (_tmp, store) = open_store();

    let by_user = conversation("c-user", ConversationOwner::User(42));
    let by_session = conversation("c-session", ConversationOwner::Session("anon-7".into()));
    store.insert_conversation(&by_user).unwrap();
    store.insert_conversation(&by_session).unwrap();

    let got = store.conversation("c-user").unwrap().unwrap();
    assert_eq!(got.owner, ConversationOwner::User(42));
    assert_eq!(got.mood_detected, Some(Emotion::Worried));
    assert_eq!(got.topics_covered, vec!["exam_prep"]);

    let got = store.conversation("c-session").unwrap().unwrap();
    assert_eq!(got.owner, ConversationOwner::Session("anon-7".into()));
}

#[test]
fn active_conversation_obeys_window_and_status() {
    let (_tmp, store) = open_store();
    let owner = ConversationOwner::User(1);
    let now = Utc::now();

    let mut stale = conversation("stale", owner.clone());
    stale.last_message_at = now - Duration::hours(30);
    store.insert_conversation(&stale).unwrap();

    let mut archived = conversation("archived", owner.clone());
    archived.status = ConversationStatus::Archived;
    store.insert_conversation(&archived).unwrap();

    let mut live = conversation("live", owner.clone());
    live.last_message_at = now - Duration::hours(1);
    store.insert_conversation(&live).unwrap();

    let since = now - Duration::hours(24);
    let found = store.active_conversation(&owner, since).unwrap();
    // The archived row carries `now`, the live row is one hour old; only the
    // live one is both active and inside the window.
    assert_eq!(found.unwrap().id, "live");
}

#[test]
fn update_conversation_requires_existing_row() {
    let (_tmp, store) = open_store();
    let c = conversation("c1", ConversationOwner::User(1));
    assert!(store.update_conversation(&c).is_err());

    store.insert_conversation(&c).unwrap();
    let mut updated = c.clone();
    updated.message_count = 5;
    store.update_conversation(&updated).unwrap();
    assert_eq!(store.conversation("c1").unwrap().unwrap().message_count, 5);
}

#[test]
fn recent_messages_returns_tail_in_order() {
    let (_tmp, store) = open_store();
    for n in 0..5 {
        store.append_message(&message("c1", n)).unwrap();
    }
    store.append_message(&message("c2", 99)).unwrap();

    let tail = store.recent_messages("c1", 3).unwrap();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].user_message, "question 2");
    assert_eq!(tail[2].user_message, "question 4");
    assert_eq!(tail[2].topics, vec!["mathematics"]);
}

// ── performance ──────────────────────────────────────────────────────────────

#[test]
fn performance_upsert_and_lookup() {
    let (_tmp, store) = open_store();
    let mut record = PerformanceRecord {
        user_id: 1,
        exam_id: UTME_EXAM_ID,
        subject_id: 2,
        total_attempts: 1,
        total_questions: 20,
        correct_answers: 13,
        average_score: 65.0,
        best_score: 65.0,
        latest_score: 65.0,
        trend: Trend::Stable,
        updated_at: Utc::now(),
    };
    store.upsert_performance(&record).unwrap();

    record.total_attempts = 2;
    record.latest_score = 80.0;
    record.trend = Trend::Improving;
    store.upsert_performance(&record).unwrap();

    let got = store.performance_for(1, UTME_EXAM_ID, 2).unwrap().unwrap();
    assert_eq!(got.total_attempts, 2);
    assert_eq!(got.trend, Trend::Improving);
    assert_eq!(store.performance(1).unwrap().len(), 1);
    assert!(store.performance_for(1, UTME_EXAM_ID, 3).unwrap().is_none());
}

// ── recommendations ──────────────────────────────────────────────────────────

#[test]
fn recommendation_lifecycle() {
    let (_tmp, store) = open_store();
    store
        .insert_recommendation(&recommendation(1, "english", Priority::Medium))
        .unwrap();
    let high_id = store
        .insert_recommendation(&recommendation(1, "mathematics", Priority::High))
        .unwrap();
    let mut expired = recommendation(1, "physics", Priority::High);
    expired.expires_at = Utc::now() - Duration::days(1);
    store.insert_recommendation(&expired).unwrap();

    let since = Utc::now() - Duration::days(7);
    assert!(store.has_recent_recommendation(1, "mathematics", since).unwrap());
    assert!(!store.has_recent_recommendation(1, "biology", since).unwrap());

    let pending = store.pending_recommendations(1, 10).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].topic, "mathematics");
    assert_eq!(pending[0].priority, Priority::High);
    assert_eq!(pending[1].topic, "english");

    assert!(store.complete_recommendation(high_id).unwrap());
    assert!(!store.complete_recommendation(9999).unwrap());
    assert_eq!(store.pending_recommendations(1, 10).unwrap().len(), 1);
}

// ── analytics ────────────────────────────────────────────────────────────────

#[test]
fn analytics_merge_weights_quality_by_conversations() {
    let (_tmp, store) = open_store();
    let date = Utc::now().date_naive();
    let row = LearningAnalytics {
        user_id: 1,
        date,
        activity_type: "conversation".into(),
        conversations: 1,
        questions_answered: 2,
        quality_score: 0.8,
        recommendations_generated: 1,
    };
    store.merge_daily_analytics(&row).unwrap();
    store
        .merge_daily_analytics(&LearningAnalytics {
            conversations: 3,
            quality_score: 0.4,
            recommendations_generated: 0,
            ..row.clone()
        })
        .unwrap();

    let merged = store.analytics_for_day(1, date, "conversation").unwrap().unwrap();
    assert_eq!(merged.conversations, 4);
    assert_eq!(merged.questions_answered, 4);
    assert_eq!(merged.recommendations_generated, 1);
    // (0.8 * 1 + 0.4 * 3) / 4
    assert!((merged.quality_score - 0.5).abs() < 1e-9);

    assert!(store.analytics_for_day(1, date, "quiz").unwrap().is_none());
}

// ── quiz catalog ─────────────────────────────────────────────────────────────

#[test]
fn question_round_trip_and_filters() {
    let (_tmp, store) = open_store();
    seed::seed_demo_catalog(&store).unwrap();

    let q = Question {
        id: "custom-1".into(),
        subject_id: Some(2),
        stem: "What is 7 x 8?".into(),
        options: ["54".into(), "56".into(), "58".into(), "64".into()],
        correct: Answer::B,
        explanation: "7 x 8 = 56.".into(),
        difficulty: Difficulty::Hard,
        source: QuestionSource::Ai,
        image: None,
    };
    store.insert_question(&q).unwrap();

    let hard = store.stored_questions(2, Some(Difficulty::Hard), 10).unwrap();
    assert_eq!(hard.len(), 1);
    assert_eq!(hard[0].id, "custom-1");
    assert_eq!(hard[0].options[1], "56");
    assert_eq!(hard[0].correct, Answer::B);
    assert_eq!(hard[0].source, QuestionSource::Ai);

    let all = store.stored_questions(2, None, 2).unwrap();
    assert_eq!(all.len(), 2);
    assert!(store.stored_questions(999, None, 10).unwrap().is_empty());
}

// ── attempts ─────────────────────────────────────────────────────────────────

#[test]
fn attempt_lifecycle_and_answer_upsert() {
    let (_tmp, store) = open_store();
    let id = store
        .insert_attempt(&QuizAttempt {
            id: 0,
            user_id: Some(1),
            exam_id: UTME_EXAM_ID,
            subject_ids: vec![1, 2],
            score: 0.0,
            total_questions: 0,
            correct_answers: 0,
            time_taken_secs: 0,
            status: SessionStatus::Ongoing,
            started_at: Utc::now(),
            completed_at: None,
        })
        .unwrap();
    assert!(id > 0);

    let got = store.attempt(id).unwrap().unwrap();
    assert_eq!(got.subject_ids, vec![1, 2]);
    assert_eq!(got.status, SessionStatus::Ongoing);

    let first = AnswerRecord {
        question_id: "q1".into(),
        answer: "a".into(),
        correct_answer: Answer::B,
        is_correct: false,
        time_spent_secs: 12,
        answered_at: Utc::now(),
    };
    store.record_answer(id, &first).unwrap();
    store
        .record_answer(id, &AnswerRecord { answer: "b".into(), is_correct: true, ..first.clone() })
        .unwrap();

    let answers = store.attempt_answers(id).unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer, "b");
    assert!(answers[0].is_correct);

    store.complete_attempt(id, 50.0, 1, 2, 90).unwrap();
    let done = store.attempt(id).unwrap().unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.score, 50.0);
    assert_eq!(done.time_taken_secs, 90);
    assert!(done.completed_at.is_some());

    assert!(store.complete_attempt(9999, 0.0, 0, 0, 0).is_err());
}
