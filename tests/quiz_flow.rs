//! End-to-end quiz flows through the engine facade.
//!
//! Run with:
//!   cargo test --test quiz_flow

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rita_tutor::config::Config;
use rita_tutor::engine::TutorEngine;
use rita_tutor::error::EngineError;
use rita_tutor::model::{QuestionSource, SessionStatus};
use rita_tutor::store::cache::MemoryCache;
use rita_tutor::store::memory::InMemoryStore;
use rita_tutor::store::seed::{self, NECO_EXAM_ID, UTME_EXAM_ID};
use rita_tutor::store::MemoryStore;

// ── helpers ──────────────────────────────────────────────────────────────────

fn engine_with(config: Config) -> (TutorEngine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    seed::seed_demo_catalog(store.as_ref()).expect("seed catalog");
    let cache = Arc::new(MemoryCache::new());
    let engine = TutorEngine::new(config, store.clone(), cache).expect("engine");
    (engine, store)
}

/// Correct letter per stored question id, read back from the store so the
/// test does not hardcode the seed data.
fn answer_key(store: &dyn MemoryStore, subject_id: i64) -> HashMap<String, &'static str> {
    store
        .stored_questions(subject_id, None, 100)
        .expect("stored questions")
        .into_iter()
        .map(|q| (q.id, q.correct.as_str()))
        .collect()
}

// ── stored questions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn perfect_run_scores_one_hundred_and_updates_performance() {
    let (engine, store) = engine_with(Config::test_default(Path::new("/tmp")));
    let key = answer_key(store.as_ref(), 2);

    let start = engine.start_quiz(Some(1), UTME_EXAM_ID, &[2], None).await.expect("start");
    assert_eq!(start.exam_name, "UTME");
    assert_eq!(start.total_questions, 3);

    let mut question = Some(start.first_question.clone());
    while let Some(q) = question {
        let letter = key.get(&q.id).expect("seeded question");
        let outcome =
            engine.submit_answer(&start.session_id, &q.id, letter, 10).expect("submit");
        assert!(outcome.is_correct);
        question = outcome.next_question;
    }

    let results = engine.finish_quiz(&start.session_id).expect("finish");
    assert_eq!(results.correct_answers, 3);
    assert_eq!(results.score, 100.0);
    assert!(results.passed);
    assert!(results.review.iter().all(|r| r.is_correct));
    assert_eq!(results.subject_breakdown.len(), 1);
    assert_eq!(results.subject_breakdown[0].subject_name, "Mathematics");

    let attempt = store.attempt(results.attempt_id).expect("attempt").expect("present");
    assert_eq!(attempt.status, SessionStatus::Completed);
    assert_eq!(attempt.score, 100.0);

    let perf = store.performance(1).expect("performance");
    assert_eq!(perf.len(), 1);
    assert_eq!(perf[0].subject_id, 2);
    assert_eq!(perf[0].total_attempts, 1);
    assert_eq!(perf[0].average_score, 100.0);
}

#[tokio::test]
async fn partial_run_counts_unanswered_as_wrong() {
    let (engine, store) = engine_with(Config::test_default(Path::new("/tmp")));
    let key = answer_key(store.as_ref(), 2);

    let start = engine.start_quiz(Some(1), UTME_EXAM_ID, &[2], None).await.expect("start");
    let first = &start.first_question;
    let letter = key.get(&first.id).expect("seeded question");
    engine.submit_answer(&start.session_id, &first.id, letter, 5).expect("submit");

    let results = engine.finish_quiz(&start.session_id).expect("finish");
    assert_eq!(results.total_questions, 3);
    assert_eq!(results.correct_answers, 1);
    assert_eq!(results.review.len(), 3);
    let unanswered: Vec<_> = results.review.iter().filter(|r| r.given.is_empty()).collect();
    assert_eq!(unanswered.len(), 2);
    assert!(unanswered.iter().all(|r| !r.is_correct));
}

#[tokio::test]
async fn finished_session_is_gone() {
    let (engine, _) = engine_with(Config::test_default(Path::new("/tmp")));
    let start = engine.start_quiz(Some(1), UTME_EXAM_ID, &[2], None).await.expect("start");
    engine.finish_quiz(&start.session_id).expect("finish");

    let again = engine.finish_quiz(&start.session_id);
    assert!(matches!(again, Err(EngineError::SessionNotFound(_))));
}

// ── ai fallthrough ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ai_source_without_key_serves_demo_questions() {
    let mut config = Config::test_default(Path::new("/tmp"));
    config.llm.provider = "openai".into();
    config.llm_api_key = None;
    let (engine, store) = engine_with(config);

    // NECO Economics has no stored questions, so the chain lands on demo.
    let start = engine
        .start_quiz(Some(7), NECO_EXAM_ID, &[14], Some(QuestionSource::Ai))
        .await
        .expect("start");
    assert_eq!(start.total_questions, 25);
    assert!(start.first_question.id.starts_with("demo_"));

    let mut question = Some(start.first_question.clone());
    while let Some(q) = question {
        let outcome = engine.submit_answer(&start.session_id, &q.id, "A", 3).expect("submit");
        question = outcome.next_question;
    }

    let results = engine.finish_quiz(&start.session_id).expect("finish");
    assert_eq!(results.total_questions, 25);
    assert!(results.correct_answers <= 25);
    assert_eq!(results.subject_breakdown[0].subject_name, "Economics");

    let perf = store.performance(7).expect("performance");
    assert_eq!(perf.len(), 1);
    assert_eq!(perf[0].subject_id, 14);
    assert!(perf[0].correct_answers <= perf[0].total_questions);
}

// ── feedback ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feedback_without_gateway_matches_the_score_band() {
    let mut config = Config::test_default(Path::new("/tmp"));
    config.llm.provider = "openai".into();
    config.llm_api_key = None;
    let (engine, store) = engine_with(config);
    let key = answer_key(store.as_ref(), 2);

    let start = engine.start_quiz(Some(1), UTME_EXAM_ID, &[2], None).await.expect("start");
    let mut question = Some(start.first_question.clone());
    while let Some(q) = question {
        let letter = key.get(&q.id).expect("seeded question");
        let outcome =
            engine.submit_answer(&start.session_id, &q.id, letter, 10).expect("submit");
        question = outcome.next_question;
    }
    let results = engine.finish_quiz(&start.session_id).expect("finish");

    let text = engine.feedback(&results).await;
    assert!(text.contains("Excellent work"));
}
