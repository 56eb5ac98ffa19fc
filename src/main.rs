//! Rita Tutor — console entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Init logger at bootstrap level
//!   3. Load config (optional first CLI arg is a config path)
//!   4. Re-init logger at the configured level
//!   5. Seed the in-memory store, start the session sweeper
//!   6. Spawn Ctrl-C -> shutdown signal watcher
//!   7. Run the console loop until /quit, Ctrl-C or stdin close

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rita_tutor::config;
use rita_tutor::engine::TutorEngine;
use rita_tutor::error::EngineError;
use rita_tutor::logger;
use rita_tutor::model::QuestionView;
use rita_tutor::quiz::QuizResults;
use rita_tutor::store::cache::{spawn_sweeper, MemoryCache};
use rita_tutor::store::memory::InMemoryStore;
use rita_tutor::store::seed;
use rita_tutor::store::MemoryStore;

/// The console is a single-student demo; every turn belongs to this user.
const CONSOLE_USER_ID: i64 = 1;
/// How often the sweeper purges expired quiz sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EngineError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    // Bootstrap logger at "info" before config is available.
    logger::init("info", false)?;

    let config_path = std::env::args().nth(1);
    let config = config::load(config_path.as_deref())?;

    // Re-init at the configured level; already-set subscriber is fine.
    logger::parse_level(&config.log_level)?;
    let _ = logger::init(&config.log_level, true);

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());
    seed::seed_demo_catalog(store.as_ref())?;

    let cache = Arc::new(MemoryCache::new());
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(cache.clone(), SWEEP_INTERVAL, shutdown.clone());

    let engine = TutorEngine::new(config, store.clone(), cache)?;

    // Ctrl-C handler — cancels the token so all tasks shut down.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    console_loop(&engine, store.as_ref(), shutdown.clone()).await;

    shutdown.cancel();
    let _ = sweeper.await;
    Ok(())
}

// ── Console loop ─────────────────────────────────────────────────────────────

/// A quiz in progress at the console.
struct ActiveQuiz {
    session_id: String,
    current: QuestionView,
    number: usize,
    total: usize,
    asked_at: Instant,
}

async fn console_loop(engine: &TutorEngine, store: &dyn MemoryStore, shutdown: CancellationToken) {
    println!("─────────────────────────────────────────");
    println!(" Rita console  (/help for commands)");
    println!("─────────────────────────────────────────");
    match engine.ping().await {
        Ok(provider) => println!("LLM: {provider}"),
        Err(e) => {
            debug!(error = %e, "llm probe failed");
            println!("LLM: offline, replies are rule-based");
        }
    }
    println!("{}", engine.greeting(Some(CONSOLE_USER_ID), Local::now().hour()));

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut quiz: Option<ActiveQuiz> = None;

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!("\nGoodbye!");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("stdin read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        let input = input.trim().to_string();
                        if input.is_empty() { continue; }
                        if input == "/quit" {
                            println!("Goodbye!");
                            break;
                        }
                        handle_line(engine, store, &mut quiz, &input).await;
                    }
                }
            }
        }
    }
}

async fn handle_line(
    engine: &TutorEngine,
    store: &dyn MemoryStore,
    quiz: &mut Option<ActiveQuiz>,
    input: &str,
) {
    if input == "/help" {
        print_help();
        return;
    }
    if let Some(rest) = input.strip_prefix("/quiz") {
        start_quiz(engine, store, quiz, rest.trim()).await;
        return;
    }
    if input == "/finish" {
        finish_quiz(engine, quiz).await;
        return;
    }
    if input.starts_with('/') {
        println!("Unknown command. /help lists what I understand.");
        return;
    }

    if quiz.is_some() {
        submit_answer(engine, quiz, input);
        return;
    }

    let reply = engine.converse(input, Some(CONSOLE_USER_ID), None).await;
    println!("{}", reply.response_text);
    for rec in &reply.recommendations {
        println!("  tip: {}", rec.text);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /quiz <exam> [subject ids]   start a quiz (utme, waec or neco)");
    println!("  A-D                          answer the current question");
    println!("  /finish                      score the quiz");
    println!("  /quit                        exit");
    println!("Anything else is a chat message for Rita.");
}

async fn start_quiz(
    engine: &TutorEngine,
    store: &dyn MemoryStore,
    quiz: &mut Option<ActiveQuiz>,
    args: &str,
) {
    if quiz.is_some() {
        println!("A quiz is already running. Answer it or /finish first.");
        return;
    }
    let mut parts = args.split_whitespace();
    let Some(exam_id) = parts.next().and_then(seed::exam_id) else {
        println!("Which exam? Try: /quiz utme");
        return;
    };
    let requested: Vec<i64> = parts.filter_map(|p| p.parse().ok()).collect();
    let subject_ids: Vec<i64> = if requested.is_empty() {
        match store.subjects_of(exam_id) {
            Ok(subjects) => subjects.iter().map(|s| s.id).collect(),
            Err(e) => {
                warn!(error = %e, "failed to list subjects");
                return;
            }
        }
    } else {
        requested
    };

    match engine.start_quiz(Some(CONSOLE_USER_ID), exam_id, &subject_ids, None).await {
        Ok(start) => {
            println!(
                "{}: {} questions. Answer with A-D; /finish any time.",
                start.exam_name, start.total_questions
            );
            print_question(1, start.total_questions, &start.first_question);
            *quiz = Some(ActiveQuiz {
                session_id: start.session_id,
                current: start.first_question,
                number: 1,
                total: start.total_questions,
                asked_at: Instant::now(),
            });
        }
        Err(e) => println!("Could not start the quiz: {e}"),
    }
}

fn submit_answer(engine: &TutorEngine, quiz: &mut Option<ActiveQuiz>, input: &str) {
    let Some(active) = quiz.as_mut() else {
        println!("No quiz is running. /quiz <exam> starts one.");
        return;
    };
    let letter = input.to_ascii_uppercase();
    if !matches!(letter.as_str(), "A" | "B" | "C" | "D") {
        println!("Answer with A-D, or /finish to stop here.");
        return;
    }
    let elapsed = active.asked_at.elapsed().as_secs() as u32;
    match engine.submit_answer(&active.session_id, &active.current.id, &letter, elapsed) {
        Ok(outcome) => {
            if outcome.is_correct {
                println!("Correct!");
            } else {
                println!(
                    "Not quite. The answer is {}: {}",
                    outcome.correct_answer.as_str(),
                    outcome.correct_option
                );
            }
            println!("  {}", outcome.explanation);
            match outcome.next_question {
                Some(next) => {
                    active.number += 1;
                    active.asked_at = Instant::now();
                    print_question(active.number, active.total, &next);
                    active.current = next;
                }
                None => {
                    println!("That was the last question. /finish to see your score.");
                }
            }
        }
        Err(EngineError::SessionNotFound(_)) => {
            println!("That quiz session expired. /quiz to start a fresh one.");
            *quiz = None;
        }
        Err(e) => println!("Could not grade that: {e}"),
    }
}

async fn finish_quiz(engine: &TutorEngine, quiz: &mut Option<ActiveQuiz>) {
    let Some(active) = quiz.take() else {
        println!("No quiz is running. /quiz <exam> starts one.");
        return;
    };
    match engine.finish_quiz(&active.session_id) {
        Ok(results) => {
            print_results(&results);
            println!("\n{}", engine.feedback(&results).await);
        }
        Err(e) => println!("Could not score the quiz: {e}"),
    }
}

fn print_question(number: usize, total: usize, question: &QuestionView) {
    println!("\nQuestion {number}/{total} [{}]", question.difficulty.as_str());
    println!("{}", question.stem);
    for (letter, option) in ["A", "B", "C", "D"].iter().zip(question.options.iter()) {
        println!("  {letter}. {option}");
    }
}

fn print_results(results: &QuizResults) {
    println!("\n───── {} results ─────", results.exam_name);
    println!(
        "Score: {:.1}%  ({} of {} correct)  {}",
        results.score,
        results.correct_answers,
        results.total_questions,
        if results.passed { "PASS" } else { "below pass mark" }
    );
    for subject in &results.subject_breakdown {
        println!(
            "  {}: {:.1}% ({}/{})",
            subject.subject_name, subject.score, subject.correct, subject.total
        );
    }
}
