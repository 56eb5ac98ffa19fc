//! Message classification: emotion, topics and reply quality.
//!
//! All three are keyword heuristics over the raw message, kept as data
//! tables rather than branching code. They inform prompts, recommendations
//! and analytics; none of them gates the reply itself.

use crate::model::Emotion;

/// Buckets are checked in order and the first hit wins, so negative states
/// take priority over positive ones and curiosity.
const EMOTION_RULES: &[(Emotion, &[&str])] = &[
    (
        Emotion::Frustrated,
        &["frustrat", "annoyed", "angry", "stuck", "give up", "giving up", "fed up", "hate"],
    ),
    (
        Emotion::Worried,
        &["worried", "worry", "anxious", "nervous", "scared", "afraid", "stress", "panic"],
    ),
    (Emotion::Tired, &["tired", "exhausted", "sleepy", "weary", "burnt out", "burned out"]),
    (Emotion::Excited, &["excited", "amazing", "awesome", "thrilled", "can't wait", "fantastic"]),
    (
        Emotion::Confident,
        &["confident", "i can do", "ready for", "i understand", "got this", "mastered"],
    ),
    (
        Emotion::Curious,
        &["curious", "how does", "why does", "what is", "what are", "wondering", "tell me about"],
    ),
];

/// Topic tags in stable output order. Subject tags first, then the
/// cross-cutting study tags.
const TOPIC_RULES: &[(&str, &[&str])] = &[
    ("mathematics", &["math", "algebra", "equation", "geometry", "arithmetic", "calculus"]),
    ("english", &["english", "grammar", "essay", "comprehension", "vocabulary"]),
    ("physics", &["physics", "mechanics", "electricity", "momentum"]),
    ("chemistry", &["chemistry", "chemical", "compound", "reaction", "periodic"]),
    ("biology", &["biology", "cell", "organism", "photosynthesis", "genetics"]),
    ("economics", &["economics", "demand", "supply", "inflation"]),
    ("government", &["government", "constitution", "democracy", "civic"]),
    ("literature", &["literature", "poem", "poetry", "novel", "drama"]),
    ("geography", &["geography", "climate", "river", "continent"]),
    ("history", &["history", "historical", "independence", "colonial"]),
    ("exam_prep", &["utme", "waec", "neco", "jamb", "wassce", "exam", "test"]),
    ("time_management", &["time management", "schedule", "timetable", "procrastinat"]),
    ("motivation", &["motivation", "motivated", "discouraged", "encourage"]),
];

/// First matching emotion bucket; no keyword means neutral.
pub fn emotion(message: &str) -> Emotion {
    let text = message.to_lowercase();
    for (emotion, keywords) in EMOTION_RULES {
        if keywords.iter().any(|k| text.contains(k)) {
            return *emotion;
        }
    }
    Emotion::Neutral
}

/// Every matching topic tag, deduplicated, in table order.
pub fn topics(message: &str) -> Vec<String> {
    let text = message.to_lowercase();
    TOPIC_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(topic, _)| (*topic).to_string())
        .collect()
}

const ENCOURAGING_MARKERS: &[&str] = &[
    "you can",
    "keep",
    "great",
    "well done",
    "don't worry",
    "normal",
    "practice",
    "practise",
    "improve",
    "step",
];

/// Informational score for a reply, 0.0..=1.0. Base 0.5, plus 0.25 for a
/// reasonable length, plus 0.25 for an encouraging tone when the student
/// sounded negative.
pub fn quality_score(reply: &str, detected: Emotion) -> f64 {
    let mut score: f64 = 0.5;
    if (50..=1200).contains(&reply.chars().count()) {
        score += 0.25;
    }
    if detected.is_negative() {
        let text = reply.to_lowercase();
        if ENCOURAGING_MARKERS.iter().any(|m| text.contains(m)) {
            score += 0.25;
        }
    }
    score.clamp(0.0, 1.0)
}
