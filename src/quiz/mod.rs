//! Quiz engine: question sourcing, AI generation and live session state.
//!
//! # Module layout
//!
//! - **bank** — Built-in demo question bank, the tier that never fails.
//! - **repair** — Best-effort cleanup of JSON-like model output.
//! - **pipeline** — AI question generation with demo-bank fallback.
//! - **session** — Live sessions: start, grade, score, feedback.

pub mod bank;
pub mod pipeline;
pub mod repair;
pub mod session;

pub use pipeline::QuestionPipeline;
pub use session::{AnswerOutcome, QuizResults, QuizService, QuizStart, ReviewRow, SubjectScore};
