//! End-to-end conversation flows through the engine facade.
//!
//! Run with:
//!   cargo test --test conversation

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use rita_tutor::config::Config;
use rita_tutor::engine::TutorEngine;
use rita_tutor::model::{ConversationOwner, PerformanceRecord, Priority, Trend};
use rita_tutor::store::cache::MemoryCache;
use rita_tutor::store::memory::InMemoryStore;
use rita_tutor::store::seed::{self, UTME_EXAM_ID};
use rita_tutor::store::MemoryStore;

// ── helpers ──────────────────────────────────────────────────────────────────

fn engine_with(config: Config) -> (TutorEngine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    seed::seed_demo_catalog(store.as_ref()).expect("seed catalog");
    let cache = Arc::new(MemoryCache::new());
    let engine = TutorEngine::new(config, store.clone(), cache).expect("engine");
    (engine, store)
}

fn offline_config() -> Config {
    let mut config = Config::test_default(Path::new("/tmp"));
    config.llm.provider = "openai".into();
    config.llm_api_key = None;
    config
}

fn weak_math(user_id: i64) -> PerformanceRecord {
    PerformanceRecord {
        user_id,
        exam_id: UTME_EXAM_ID,
        subject_id: 2,
        total_attempts: 3,
        total_questions: 30,
        correct_answers: 9,
        average_score: 30.0,
        best_score: 40.0,
        latest_score: 25.0,
        trend: Trend::Declining,
        updated_at: Utc::now(),
    }
}

// ── flows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replies_survive_a_missing_gateway() {
    let (engine, store) = engine_with(offline_config());

    let reply = engine.converse("hello", Some(1), None).await;
    assert!(reply.fallback);
    assert!(!reply.response_text.is_empty());

    let messages = store.recent_messages(&reply.conversation_id, 10).expect("messages");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].fallback);
}

#[tokio::test]
async fn conversation_continues_within_the_window() {
    let (engine, store) = engine_with(offline_config());

    let first = engine.converse("hello", Some(1), None).await;
    let second = engine.converse("I need help with algebra", Some(1), None).await;
    assert_eq!(first.conversation_id, second.conversation_id);

    let conversation =
        store.conversation(&first.conversation_id).expect("lookup").expect("present");
    assert_eq!(conversation.message_count, 2);
    assert!(conversation.topics_covered.contains(&"mathematics".to_string()));

    let transcript = engine.history(&first.conversation_id, 10).expect("history");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].user_message, "hello");
}

#[tokio::test]
async fn weak_subject_mention_recommends_practice_once() {
    let (engine, store) = engine_with(offline_config());
    store.upsert_performance(&weak_math(3)).expect("seed performance");

    let first = engine.converse("I keep failing math", Some(3), None).await;
    assert_eq!(first.insights.weak_subjects, vec!["Mathematics".to_string()]);
    assert_eq!(first.recommendations.len(), 1);
    assert_eq!(first.recommendations[0].priority, Priority::High);
    assert_eq!(first.recommendations[0].subject_id, Some(2));

    engine.converse("math is still hard for me", Some(3), None).await;
    let pending = store.pending_recommendations(3, 10).expect("pending");
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn anonymous_chat_leaves_no_profile() {
    let (engine, store) = engine_with(offline_config());

    let reply = engine.converse("hello", None, Some("kiosk-7")).await;
    assert!(!reply.response_text.is_empty());

    let conversation =
        store.conversation(&reply.conversation_id).expect("lookup").expect("present");
    assert_eq!(conversation.owner, ConversationOwner::Session("kiosk-7".into()));
    assert!(store.profile(0).expect("profile lookup").is_none());
}

#[tokio::test]
async fn scripted_gateway_is_used_when_configured() {
    let (engine, _) = engine_with(Config::test_default(Path::new("/tmp")));

    let reply = engine.converse("hello", Some(1), None).await;
    assert!(!reply.fallback);
    assert!(reply.response_text.starts_with("[echo]"));
}
