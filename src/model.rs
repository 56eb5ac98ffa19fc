//! Domain records shared across the engine.
//!
//! Everything the store persists or the cache snapshots lives here as a plain
//! serde struct. Classifier outputs and state tags are enums with string
//! forms, so the wire/storage representation is a single lowercase word.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Tag enums ────────────────────────────────────────────────────────────────

/// Difficulty tag carried by every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parse a difficulty word, ignoring case and surrounding space.
    /// Unrecognised input returns `None`; callers pick their own fallback.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Multiple-choice answer tag. Only these four values exist anywhere in the
/// system; free-form model output is constrained to them at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    A,
    B,
    C,
    D,
}

impl Answer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::A => "A",
            Answer::B => "B",
            Answer::C => "C",
            Answer::D => "D",
        }
    }

    /// Parse an answer letter, ignoring case and surrounding space.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Answer::A),
            "B" => Some(Answer::B),
            "C" => Some(Answer::C),
            "D" => Some(Answer::D),
            _ => None,
        }
    }

    /// Case-insensitive comparison against a submitted answer string.
    pub fn matches(&self, given: &str) -> bool {
        given.trim().eq_ignore_ascii_case(self.as_str())
    }

    /// Index into a question's options array.
    pub fn index(&self) -> usize {
        match self {
            Answer::A => 0,
            Answer::B => 1,
            Answer::C => 2,
            Answer::D => 3,
        }
    }
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Ai,
    Manual,
    Demo,
    Imported,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Ai => "ai",
            QuestionSource::Manual => "manual",
            QuestionSource::Demo => "demo",
            QuestionSource::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Some(QuestionSource::Ai),
            "manual" => Some(QuestionSource::Manual),
            "demo" => Some(QuestionSource::Demo),
            "imported" => Some(QuestionSource::Imported),
            _ => None,
        }
    }
}

/// Detected emotional state of a student message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Frustrated,
    Worried,
    Tired,
    Excited,
    Confident,
    Curious,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Frustrated => "frustrated",
            Emotion::Worried => "worried",
            Emotion::Tired => "tired",
            Emotion::Excited => "excited",
            Emotion::Confident => "confident",
            Emotion::Curious => "curious",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frustrated" => Some(Emotion::Frustrated),
            "worried" => Some(Emotion::Worried),
            "tired" => Some(Emotion::Tired),
            "excited" => Some(Emotion::Excited),
            "confident" => Some(Emotion::Confident),
            "curious" => Some(Emotion::Curious),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }

    /// States that call for encouragement rather than information.
    pub fn is_negative(&self) -> bool {
        matches!(self, Emotion::Frustrated | Emotion::Worried | Emotion::Tired)
    }
}

/// Recommendation priority. Ordering is derived so `High` sorts last with
/// `Ord` and lists can be ranked with a plain sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Completed,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RecommendationStatus::Pending),
            "completed" => Some(RecommendationStatus::Completed),
            _ => None,
        }
    }
}

/// Direction of a student's recent scores relative to their lifetime average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "improving" => Some(Trend::Improving),
            "stable" => Some(Trend::Stable),
            "declining" => Some(Trend::Declining),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ConversationStatus::Active),
            "archived" => Some(ConversationStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ongoing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ongoing => "ongoing",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Some(SessionStatus::Ongoing),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// Who a conversation belongs to. Known students are keyed by user id;
/// anonymous visitors by an opaque session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ConversationOwner {
    User(i64),
    Session(String),
}

impl ConversationOwner {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            ConversationOwner::User(id) => Some(*id),
            ConversationOwner::Session(_) => None,
        }
    }
}

// ── Student records ──────────────────────────────────────────────────────────

/// Persistent per-student profile. Created lazily on first contact; anonymous
/// visitors get the same defaults in memory but are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: i64,
    pub name: Option<String>,
    pub learning_style: String,
    pub strong_subjects: Vec<String>,
    pub weak_subjects: Vec<String>,
    pub preferred_difficulty: Difficulty,
    pub personality_traits: Vec<String>,
    pub communication_style: String,
    pub total_conversations: u32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Fresh profile with the platform defaults.
    pub fn with_defaults(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            name: None,
            learning_style: "mixed".to_string(),
            strong_subjects: Vec::new(),
            weak_subjects: Vec::new(),
            preferred_difficulty: Difficulty::Medium,
            personality_traits: Vec::new(),
            communication_style: "friendly".to_string(),
            total_conversations: 0,
            created_at: now,
            last_active_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner: ConversationOwner,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: u32,
    pub mood_detected: Option<Emotion>,
    pub topics_covered: Vec<String>,
    pub status: ConversationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub emotion: Emotion,
    pub topics: Vec<String>,
    /// True when the reply came from the static responder, not the gateway.
    pub fallback: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-(user, exam, subject) lifetime performance counters.
/// `correct_answers` never exceeds `total_questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub user_id: i64,
    pub exam_id: i64,
    pub subject_id: i64,
    pub total_attempts: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Lifetime percentage, `correct_answers / total_questions * 100`.
    pub average_score: f64,
    pub best_score: f64,
    pub latest_score: f64,
    pub trend: Trend,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyRecommendation {
    pub id: i64,
    pub user_id: i64,
    /// Topic tag the recommendation is about; dedup key together with the user.
    pub topic: String,
    pub subject_id: Option<i64>,
    pub text: String,
    pub priority: Priority,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One row per user, day and activity type; repeated activity merges into the
/// existing row instead of inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningAnalytics {
    pub user_id: i64,
    pub date: NaiveDate,
    pub activity_type: String,
    pub conversations: u32,
    pub questions_answered: u32,
    /// Running average of the per-reply quality heuristic, 0.0..=1.0.
    pub quality_score: f64,
    pub recommendations_generated: u32,
}

// ── Quiz catalog ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub time_limit_secs: u32,
    /// Pass mark as a percentage.
    pub passing_score: f64,
    /// How many questions each chosen subject contributes.
    pub questions_per_subject: u32,
    /// Optional hard cap on the combined pool of one session.
    pub session_cap: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub exam_id: i64,
    pub name: String,
    pub description: String,
}

/// A multiple-choice question with exactly four options labeled A through D.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub subject_id: Option<i64>,
    pub stem: String,
    pub options: [String; 4],
    pub correct: Answer,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub source: QuestionSource,
    pub image: Option<String>,
}

impl Question {
    /// Option text for an answer tag.
    pub fn option_text(&self, answer: Answer) -> &str {
        &self.options[answer.index()]
    }

    /// Outward shape of the question: what a student sees before answering.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            stem: self.stem.clone(),
            options: self.options.clone(),
            difficulty: self.difficulty,
            image: self.image.clone(),
        }
    }
}

/// Question as delivered to a student: no correct tag, no explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub stem: String,
    pub options: [String; 4],
    pub difficulty: Difficulty,
    pub image: Option<String>,
}

// ── Quiz session state ───────────────────────────────────────────────────────

/// One recorded answer inside a session. Re-answering the same question
/// replaces the record rather than appending a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: String,
    pub correct_answer: Answer,
    pub is_correct: bool,
    pub time_spent_secs: u32,
    pub answered_at: DateTime<Utc>,
}

/// Cached snapshot of a live quiz. Serialized into the session cache and
/// rewritten after every submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: String,
    pub attempt_id: i64,
    pub user_id: Option<i64>,
    pub exam_id: i64,
    pub subject_ids: Vec<i64>,
    pub questions: Vec<Question>,
    /// Index of the question currently awaiting an answer.
    pub current: usize,
    pub answers: Vec<AnswerRecord>,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
}

/// Persistent attempt row backing a session; survives the cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: Option<i64>,
    pub exam_id: i64,
    pub subject_ids: Vec<i64>,
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_taken_secs: u32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
