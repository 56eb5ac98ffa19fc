//! Live quiz sessions.
//!
//! A session is a cached snapshot keyed by `quiz_session:{id}`: the question
//! pool, the cursor and every answer so far. The snapshot is authoritative
//! for grading; the attempt row and per-answer rows in the store are the
//! audit trail, so failures writing them are logged and swallowed rather
//! than surfaced mid-quiz. Every submission refreshes the snapshot TTL, and
//! an expired snapshot surfaces as [`EngineError::SessionNotFound`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::error::EngineError;
use crate::llm::LlmGateway;
use crate::model::{
    Answer, AnswerRecord, PerformanceRecord, Question, QuestionSource, QuestionView, QuizAttempt,
    QuizSession, SessionStatus, Subject, Trend,
};
use crate::quiz::bank;
use crate::quiz::pipeline::QuestionPipeline;
use crate::store::cache::SessionCache;
use crate::store::MemoryStore;

const FEEDBACK_SYSTEM: &str = "You are Rita, a friendly and supportive AI study assistant \
for Nigerian students preparing for UTME, WAEC and NECO examinations.";

/// Latest score must leave this band around the running average before the
/// trend flips away from stable.
const TREND_DEAD_BAND: f64 = 5.0;

fn session_key(session_id: &str) -> String {
    format!("quiz_session:{session_id}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage score rounded to two decimals; zero questions scores zero.
fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(f64::from(correct) / f64::from(total) * 100.0)
}

// ── Sourcing tiers ───────────────────────────────────────────────────────────

/// Which pool a subject's questions are drawn from first. The chain always
/// ends at the demo bank, which cannot come up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceTier {
    Ai,
    Stored,
    Demo,
}

impl SourceTier {
    fn of(source: QuestionSource) -> Self {
        match source {
            QuestionSource::Ai => SourceTier::Ai,
            QuestionSource::Demo => SourceTier::Demo,
            QuestionSource::Manual | QuestionSource::Imported => SourceTier::Stored,
        }
    }

    fn from_config(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ai" => SourceTier::Ai,
            "demo" => SourceTier::Demo,
            _ => SourceTier::Stored,
        }
    }
}

/// Fallback order starting from the requested tier. Demo is total, so the
/// chain never continues past it.
fn tier_chain(first: SourceTier) -> Vec<SourceTier> {
    match first {
        SourceTier::Ai => vec![SourceTier::Ai, SourceTier::Stored, SourceTier::Demo],
        SourceTier::Stored => vec![SourceTier::Stored, SourceTier::Ai, SourceTier::Demo],
        SourceTier::Demo => vec![SourceTier::Demo],
    }
}

// ── Replies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct QuizStart {
    pub session_id: String,
    pub attempt_id: i64,
    pub exam_name: String,
    pub total_questions: usize,
    pub time_limit_secs: u32,
    pub first_question: QuestionView,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_answer: Answer,
    pub correct_option: String,
    pub explanation: String,
    /// Distinct questions answered so far.
    pub answered: usize,
    pub total: usize,
    pub next_question: Option<QuestionView>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectScore {
    pub subject_id: i64,
    pub subject_name: String,
    pub total: u32,
    pub correct: u32,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub question_id: String,
    pub stem: String,
    /// The raw submitted answer; empty when the question went unanswered.
    pub given: String,
    pub correct: Answer,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResults {
    pub attempt_id: i64,
    pub exam_name: String,
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_taken_secs: u32,
    pub passed: bool,
    pub passing_score: f64,
    pub subject_breakdown: Vec<SubjectScore>,
    pub review: Vec<ReviewRow>,
}

// ── Service ──────────────────────────────────────────────────────────────────

/// Runs quizzes end to end: sourcing, grading, scoring and the performance
/// bookkeeping that feeds personalization.
pub struct QuizService {
    store: Arc<dyn MemoryStore>,
    cache: Arc<dyn SessionCache>,
    pipeline: QuestionPipeline,
    gateway: Option<LlmGateway>,
    config: QuizConfig,
}

impl QuizService {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        cache: Arc<dyn SessionCache>,
        gateway: Option<LlmGateway>,
        config: QuizConfig,
    ) -> Self {
        let pipeline = QuestionPipeline::new(gateway.clone(), config.generation_max_tokens);
        Self { store, cache, pipeline, gateway, config }
    }

    /// Start a quiz for an exam and a set of its subjects. Unknown subject
    /// ids and subjects of other exams are skipped with a warning; an empty
    /// pool is an error, never a zero-question session.
    pub async fn start(
        &self,
        user_id: Option<i64>,
        exam_id: i64,
        subject_ids: &[i64],
        source: Option<QuestionSource>,
    ) -> Result<QuizStart, EngineError> {
        let exam = self
            .store
            .exam(exam_id)?
            .ok_or_else(|| EngineError::NotFound(format!("exam {exam_id}")))?;

        let mut subjects: Vec<Subject> = Vec::new();
        for id in subject_ids {
            match self.store.subject(*id)? {
                Some(s) if s.exam_id == exam_id => subjects.push(s),
                Some(_) => {
                    warn!(subject_id = id, exam_id, "subject belongs to another exam, skipped");
                }
                None => warn!(subject_id = id, "unknown subject id, skipped"),
            }
        }
        if subjects.is_empty() {
            return Err(EngineError::NoQuestionsAvailable);
        }

        let tier = source
            .map(SourceTier::of)
            .unwrap_or_else(|| SourceTier::from_config(&self.config.default_source));
        let quota = exam.questions_per_subject as usize;

        let mut pool: Vec<Question> = Vec::new();
        for subject in &subjects {
            let questions = self.subject_questions(subject, quota, tier).await?;
            // AI and demo questions carry no subject id of their own yet
            pool.extend(questions.into_iter().map(|mut q| {
                q.subject_id = q.subject_id.or(Some(subject.id));
                q
            }));
        }
        pool.shuffle(&mut rand::thread_rng());
        if let Some(cap) = exam.session_cap {
            pool.truncate(cap as usize);
        }
        if pool.is_empty() {
            return Err(EngineError::NoQuestionsAvailable);
        }

        let started_at = Utc::now();
        let attempt_id = self.store.insert_attempt(&QuizAttempt {
            id: 0,
            user_id,
            exam_id,
            subject_ids: subjects.iter().map(|s| s.id).collect(),
            score: 0.0,
            total_questions: pool.len() as u32,
            correct_answers: 0,
            time_taken_secs: 0,
            status: SessionStatus::Ongoing,
            started_at,
            completed_at: None,
        })?;

        let session = QuizSession {
            id: Uuid::new_v4().to_string(),
            attempt_id,
            user_id,
            exam_id,
            subject_ids: subjects.iter().map(|s| s.id).collect(),
            questions: pool,
            current: 0,
            answers: Vec::new(),
            started_at,
            status: SessionStatus::Ongoing,
        };
        self.save_session(&session)?;

        info!(
            session_id = %session.id,
            attempt_id,
            exam = %exam.name,
            subjects = subjects.len(),
            questions = session.questions.len(),
            "quiz session started"
        );

        Ok(QuizStart {
            session_id: session.id.clone(),
            attempt_id,
            exam_name: exam.name,
            total_questions: session.questions.len(),
            time_limit_secs: exam.time_limit_secs,
            first_question: session.questions[0].view(),
        })
    }

    /// Grade a submission against the question currently awaiting an answer
    /// and advance the cursor. The recorded answer is keyed by the submitted
    /// question id; a repeat id replaces the earlier record.
    pub fn submit_answer(
        &self,
        session_id: &str,
        question_id: &str,
        answer: &str,
        time_spent_secs: u32,
    ) -> Result<AnswerOutcome, EngineError> {
        let mut session = self.load_session(session_id)?;
        let Some(question) = session.questions.get(session.current) else {
            return Err(EngineError::InvalidInput("quiz already completed".into()));
        };

        let is_correct = question.correct.matches(answer);
        let correct_answer = question.correct;
        let correct_option = question.option_text(correct_answer).to_string();
        let explanation = question.explanation.clone();

        let record = AnswerRecord {
            question_id: question_id.to_string(),
            answer: answer.trim().to_string(),
            correct_answer,
            is_correct,
            time_spent_secs,
            answered_at: Utc::now(),
        };
        match session.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(existing) => *existing = record.clone(),
            None => session.answers.push(record.clone()),
        }
        if let Err(e) = self.store.record_answer(session.attempt_id, &record) {
            warn!(error = %e, attempt_id = session.attempt_id, "failed to persist answer");
        }

        session.current += 1;
        let next_question = session.questions.get(session.current).map(Question::view);
        let completed = next_question.is_none();
        self.save_session(&session)?;

        Ok(AnswerOutcome {
            is_correct,
            correct_answer,
            correct_option,
            explanation,
            answered: session.answers.len(),
            total: session.questions.len(),
            next_question,
            completed,
        })
    }

    /// Score the session, finalize the attempt, fold the result into the
    /// student's per-subject performance and drop the snapshot. Unanswered
    /// questions count as wrong.
    pub fn finish(&self, session_id: &str) -> Result<QuizResults, EngineError> {
        let session = self.load_session(session_id)?;
        let exam = self
            .store
            .exam(session.exam_id)?
            .ok_or_else(|| EngineError::NotFound(format!("exam {}", session.exam_id)))?;

        let total = session.questions.len() as u32;
        let correct = session.answers.iter().filter(|a| a.is_correct).count() as u32;
        let score = percentage(correct, total);
        let time_taken = (Utc::now() - session.started_at).num_seconds().max(0) as u32;

        if let Err(e) =
            self.store.complete_attempt(session.attempt_id, score, correct, total, time_taken)
        {
            warn!(error = %e, attempt_id = session.attempt_id, "failed to finalize attempt");
        }

        let breakdown = self.subject_breakdown(&session)?;
        if let Some(user_id) = session.user_id {
            for entry in &breakdown {
                if let Err(e) = self.update_performance(user_id, exam.id, entry) {
                    warn!(error = %e, subject_id = entry.subject_id, "failed to update performance");
                }
            }
        }

        let review = session
            .questions
            .iter()
            .map(|q| {
                let answer = session.answers.iter().find(|a| a.question_id == q.id);
                ReviewRow {
                    question_id: q.id.clone(),
                    stem: q.stem.clone(),
                    given: answer.map(|a| a.answer.clone()).unwrap_or_default(),
                    correct: q.correct,
                    is_correct: answer.is_some_and(|a| a.is_correct),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        if let Err(e) = self.cache.delete(&session_key(session_id)) {
            warn!(error = %e, session_id, "failed to drop quiz session snapshot");
        }

        let passed = score >= exam.passing_score;
        info!(
            attempt_id = session.attempt_id,
            score, correct, total, passed, "quiz finished"
        );

        Ok(QuizResults {
            attempt_id: session.attempt_id,
            exam_name: exam.name,
            score,
            total_questions: total,
            correct_answers: correct,
            time_taken_secs: time_taken,
            passed,
            passing_score: exam.passing_score,
            subject_breakdown: breakdown,
            review,
        })
    }

    /// Short feedback on finished results: model-written when a gateway is
    /// configured, otherwise a banded static message. Never fails.
    pub async fn feedback(&self, results: &QuizResults) -> String {
        let Some(gateway) = &self.gateway else {
            return static_feedback(results);
        };
        let prompt = feedback_prompt(results);
        match gateway.send(&prompt, Some(FEEDBACK_SYSTEM), self.config.feedback_max_tokens, &[]).await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "feedback generation failed, using static feedback");
                static_feedback(results)
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn subject_questions(
        &self,
        subject: &Subject,
        quota: usize,
        first: SourceTier,
    ) -> Result<Vec<Question>, EngineError> {
        for tier in tier_chain(first) {
            let questions = match tier {
                SourceTier::Ai => {
                    if !self.pipeline.is_configured() {
                        continue;
                    }
                    self.pipeline.generate(&subject.name, quota, None).await
                }
                SourceTier::Stored => self.store.stored_questions(subject.id, None, quota)?,
                SourceTier::Demo => bank::demo_questions(&subject.name, quota, None),
            };
            if !questions.is_empty() {
                return Ok(questions);
            }
        }
        Ok(Vec::new())
    }

    fn save_session(&self, session: &QuizSession) -> Result<(), EngineError> {
        let body = serde_json::to_string(session)
            .map_err(|e| EngineError::Cache(format!("serialize quiz session: {e}")))?;
        self.cache.set(&session_key(&session.id), &body, self.config.session_ttl())
    }

    fn load_session(&self, session_id: &str) -> Result<QuizSession, EngineError> {
        let body = self
            .cache
            .get(&session_key(session_id))?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::Cache(format!("corrupt quiz session snapshot: {e}")))
    }

    /// Per-subject totals for the session. Answers whose question id matches
    /// nothing in the pool count toward the overall score only.
    fn subject_breakdown(&self, session: &QuizSession) -> Result<Vec<SubjectScore>, EngineError> {
        let mut tally: BTreeMap<i64, (u32, u32)> = BTreeMap::new();
        for question in &session.questions {
            let Some(subject_id) = question.subject_id else { continue };
            tally.entry(subject_id).or_default().0 += 1;
        }
        for answer in &session.answers {
            if !answer.is_correct {
                continue;
            }
            let subject = session
                .questions
                .iter()
                .find(|q| q.id == answer.question_id)
                .and_then(|q| q.subject_id);
            if let Some(subject_id) = subject {
                if let Some(entry) = tally.get_mut(&subject_id) {
                    entry.1 += 1;
                }
            }
        }

        let mut rows = Vec::with_capacity(tally.len());
        for (subject_id, (total, correct)) in tally {
            let subject_name = self
                .store
                .subject(subject_id)?
                .map(|s| s.name)
                .unwrap_or_else(|| format!("Subject {subject_id}"));
            rows.push(SubjectScore {
                subject_id,
                subject_name,
                total,
                correct,
                score: percentage(correct, total),
            });
        }
        Ok(rows)
    }

    fn update_performance(
        &self,
        user_id: i64,
        exam_id: i64,
        entry: &SubjectScore,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        let record = match self.store.performance_for(user_id, exam_id, entry.subject_id)? {
            Some(prev) => {
                let total_questions = prev.total_questions + entry.total;
                let correct_answers = prev.correct_answers + entry.correct;
                let trend = if entry.score > prev.average_score + TREND_DEAD_BAND {
                    Trend::Improving
                } else if entry.score < prev.average_score - TREND_DEAD_BAND {
                    Trend::Declining
                } else {
                    Trend::Stable
                };
                PerformanceRecord {
                    total_attempts: prev.total_attempts + 1,
                    total_questions,
                    correct_answers,
                    average_score: percentage(correct_answers, total_questions),
                    best_score: prev.best_score.max(entry.score),
                    latest_score: entry.score,
                    trend,
                    updated_at: now,
                    ..prev
                }
            }
            None => PerformanceRecord {
                user_id,
                exam_id,
                subject_id: entry.subject_id,
                total_attempts: 1,
                total_questions: entry.total,
                correct_answers: entry.correct,
                average_score: entry.score,
                best_score: entry.score,
                latest_score: entry.score,
                trend: Trend::Stable,
                updated_at: now,
            },
        };
        self.store.upsert_performance(&record)
    }
}

// ── Feedback ─────────────────────────────────────────────────────────────────

fn feedback_prompt(results: &QuizResults) -> String {
    let mut breakdown = String::new();
    for s in &results.subject_breakdown {
        breakdown.push_str(&format!(
            "- {}: {} of {} correct ({:.0}%)\n",
            s.subject_name, s.correct, s.total, s.score
        ));
    }
    format!(
        "A student just finished a {} practice quiz, scoring {:.1}% ({} of {} correct).\n\
Subject breakdown:\n{}\n\
Write two or three sentences of encouraging, specific feedback. Mention their \
strongest and weakest areas and one concrete next step. Address the student directly.",
        results.exam_name,
        results.score,
        results.correct_answers,
        results.total_questions,
        breakdown
    )
}

fn static_feedback(results: &QuizResults) -> String {
    let score = results.score;
    if score >= 80.0 {
        format!(
            "Excellent work! You scored {score:.1}%. You have a strong grasp of this material; \
keep practising past questions to stay sharp."
        )
    } else if score >= 70.0 {
        format!(
            "Great job! {score:.1}% is a solid score. Review the questions you missed and you \
will be in excellent shape."
        )
    } else if score >= 60.0 {
        format!(
            "Good effort! You scored {score:.1}%. Focus your revision on the topics you missed \
to push the score higher."
        )
    } else {
        format!(
            "You scored {score:.1}%. Don't be discouraged; focused revision makes a big \
difference. Go through the explanations and try again."
        )
    }
}
