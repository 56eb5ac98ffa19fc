//! Built-in exam catalog.
//!
//! Seeds the three Nigerian exams the platform targets, their core subjects
//! and a starter set of stored questions, so a fresh store can run quizzes
//! before any admin has loaded real content. Subjects with few stored rows
//! are topped up from the generated banks at quiz time.

use crate::error::EngineError;
use crate::model::{Answer, Difficulty, Exam, Question, QuestionSource, Subject};

use super::MemoryStore;

pub const UTME_EXAM_ID: i64 = 1;
pub const WAEC_EXAM_ID: i64 = 2;
pub const NECO_EXAM_ID: i64 = 3;

/// Seeded exam id for a name like "utme" or "WAEC".
pub fn exam_id(name: &str) -> Option<i64> {
    match name.trim().to_ascii_lowercase().as_str() {
        "utme" | "jamb" => Some(UTME_EXAM_ID),
        "waec" | "wassce" => Some(WAEC_EXAM_ID),
        "neco" => Some(NECO_EXAM_ID),
        _ => None,
    }
}

/// Insert the built-in exams, subjects and starter questions.
/// Every row is keyed by a fixed id, so re-seeding is idempotent.
pub fn seed_demo_catalog(store: &dyn MemoryStore) -> Result<(), EngineError> {
    for exam in exams() {
        store.insert_exam(&exam)?;
    }
    for subject in subjects() {
        store.insert_subject(&subject)?;
    }
    for question in starter_questions() {
        store.insert_question(&question)?;
    }
    Ok(())
}

fn exams() -> Vec<Exam> {
    vec![
        Exam {
            id: UTME_EXAM_ID,
            name: "UTME".into(),
            description: "Unified Tertiary Matriculation Examination".into(),
            time_limit_secs: 2 * 60 * 60,
            passing_score: 60.0,
            questions_per_subject: 20,
            session_cap: None,
        },
        Exam {
            id: WAEC_EXAM_ID,
            name: "WAEC".into(),
            description: "West African Senior School Certificate Examination".into(),
            time_limit_secs: 3 * 60 * 60,
            passing_score: 50.0,
            questions_per_subject: 25,
            session_cap: None,
        },
        Exam {
            id: NECO_EXAM_ID,
            name: "NECO".into(),
            description: "National Examinations Council Senior School Certificate".into(),
            time_limit_secs: 3 * 60 * 60,
            passing_score: 50.0,
            questions_per_subject: 25,
            session_cap: None,
        },
    ]
}

fn subjects() -> Vec<Subject> {
    let rows: [(i64, i64, &str, &str); 15] = [
        (1, UTME_EXAM_ID, "English Language", "Use of English: comprehension, lexis and structure"),
        (2, UTME_EXAM_ID, "Mathematics", "General mathematics for tertiary entry"),
        (3, UTME_EXAM_ID, "Physics", "Mechanics, waves, electricity and modern physics"),
        (4, UTME_EXAM_ID, "Chemistry", "Physical, inorganic and organic chemistry"),
        (5, UTME_EXAM_ID, "Biology", "Cell biology, genetics, ecology and physiology"),
        (6, WAEC_EXAM_ID, "English Language", "Essay, comprehension and objective English"),
        (7, WAEC_EXAM_ID, "Mathematics", "General mathematics, WASSCE syllabus"),
        (8, WAEC_EXAM_ID, "Biology", "Senior secondary biology"),
        (9, WAEC_EXAM_ID, "Chemistry", "Senior secondary chemistry"),
        (10, WAEC_EXAM_ID, "Physics", "Senior secondary physics"),
        (11, NECO_EXAM_ID, "English Language", "Essay, comprehension and objective English"),
        (12, NECO_EXAM_ID, "Mathematics", "General mathematics, SSCE syllabus"),
        (13, NECO_EXAM_ID, "Biology", "Senior secondary biology"),
        (14, NECO_EXAM_ID, "Economics", "Principles of economics and the Nigerian economy"),
        (15, NECO_EXAM_ID, "Government", "Government and civic institutions of Nigeria"),
    ];
    rows.iter()
        .map(|(id, exam_id, name, description)| Subject {
            id: *id,
            exam_id: *exam_id,
            name: (*name).into(),
            description: (*description).into(),
        })
        .collect()
}

fn starter_questions() -> Vec<Question> {
    // (id, subject_id, stem, options, correct, explanation, difficulty)
    let rows: [(&str, i64, &str, [&str; 4], Answer, &str, Difficulty); 10] = [
        (
            "seed-eng-001",
            1,
            "Choose the word nearest in meaning to 'benevolent'.",
            ["Kind", "Hostile", "Weary", "Strict"],
            Answer::A,
            "Benevolent means well-meaning and kindly.",
            Difficulty::Easy,
        ),
        (
            "seed-eng-002",
            1,
            "Which of the following is the correct plural of 'analysis'?",
            ["Analysises", "Analyses", "Analysis", "Analysi"],
            Answer::B,
            "Nouns ending in -is form their plural with -es: analysis, analyses.",
            Difficulty::Medium,
        ),
        (
            "seed-mat-001",
            2,
            "If 2x + 3 = 11, what is the value of x?",
            ["2", "3", "4", "5"],
            Answer::C,
            "Subtract 3 from both sides to get 2x = 8, so x = 4.",
            Difficulty::Easy,
        ),
        (
            "seed-mat-002",
            2,
            "What is 15% of 200?",
            ["20", "25", "30", "35"],
            Answer::C,
            "15% of 200 is 0.15 multiplied by 200, which is 30.",
            Difficulty::Easy,
        ),
        (
            "seed-mat-003",
            2,
            "Simplify 3/4 + 1/2.",
            ["5/4", "4/6", "3/8", "1"],
            Answer::A,
            "Write 1/2 as 2/4; 3/4 + 2/4 = 5/4.",
            Difficulty::Medium,
        ),
        (
            "seed-phy-001",
            3,
            "What is the SI unit of force?",
            ["Joule", "Watt", "Newton", "Pascal"],
            Answer::C,
            "Force is measured in newtons, the SI derived unit kg m/s^2.",
            Difficulty::Easy,
        ),
        (
            "seed-phy-002",
            3,
            "A body moving with constant velocity has what acceleration?",
            ["Zero", "Constant and non-zero", "Increasing", "Decreasing"],
            Answer::A,
            "Constant velocity means no change in velocity, so acceleration is zero.",
            Difficulty::Easy,
        ),
        (
            "seed-che-001",
            4,
            "What is the chemical symbol for sodium?",
            ["So", "Sd", "Na", "Sn"],
            Answer::C,
            "Sodium's symbol Na comes from its Latin name natrium.",
            Difficulty::Easy,
        ),
        (
            "seed-bio-001",
            5,
            "Which organelle is known as the powerhouse of the cell?",
            ["Ribosome", "Mitochondrion", "Nucleus", "Golgi body"],
            Answer::B,
            "Mitochondria carry out respiration and release energy as ATP.",
            Difficulty::Easy,
        ),
        (
            "seed-bio-002",
            5,
            "Genetic information in cells is carried by which molecule?",
            ["Protein", "Lipid", "DNA", "Starch"],
            Answer::C,
            "DNA stores the hereditary information of the cell.",
            Difficulty::Easy,
        ),
    ];
    rows.iter()
        .map(|(id, subject_id, stem, options, correct, explanation, difficulty)| Question {
            id: (*id).into(),
            subject_id: Some(*subject_id),
            stem: (*stem).into(),
            options: options.map(Into::into),
            correct: *correct,
            explanation: (*explanation).into(),
            difficulty: *difficulty,
            source: QuestionSource::Manual,
            image: None,
        })
        .collect()
}
