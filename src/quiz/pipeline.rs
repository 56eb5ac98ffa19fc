//! AI question generation pipeline.
//!
//! `generate` is infallible by construction: every failure mode, from a
//! missing gateway to unparseable model output, degrades to the demo bank
//! so a quiz can always start. Model output is located inside arbitrary
//! prose, parsed, repaired once on failure, then validated row by row with
//! placeholders instead of rejections.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::llm::LlmGateway;
use crate::model::{Answer, Difficulty, Question, QuestionSource};
use crate::quiz::bank;
use crate::quiz::repair::repair_json_like;

const GENERATION_SYSTEM: &str = "You are an expert in creating educational quiz questions \
for Nigerian students preparing for UTME, WAEC and NECO examinations.";

static ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("static pattern"));

/// Sources questions from the configured gateway, falling back to the demo
/// bank whenever generation cannot deliver.
#[derive(Debug, Clone)]
pub struct QuestionPipeline {
    gateway: Option<LlmGateway>,
    max_tokens: u32,
}

impl QuestionPipeline {
    pub fn new(gateway: Option<LlmGateway>, max_tokens: u32) -> Self {
        Self { gateway, max_tokens }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// Produce exactly `count` questions for a subject. Never fails: a
    /// generation shortfall is padded from the demo bank and an overshoot
    /// is truncated.
    pub async fn generate(
        &self,
        subject: &str,
        count: usize,
        difficulty: Option<Difficulty>,
    ) -> Vec<Question> {
        if count == 0 {
            return Vec::new();
        }
        let Some(gateway) = &self.gateway else {
            debug!(subject, count, "no gateway configured, serving demo questions");
            return bank::demo_questions(subject, count, difficulty);
        };

        let prompt = generation_prompt(subject, count, difficulty);
        let raw = match gateway.send(&prompt, Some(GENERATION_SYSTEM), self.max_tokens, &[]).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, subject, "question generation failed, serving demo questions");
                return bank::demo_questions(subject, count, difficulty);
            }
        };

        let mut questions = parse_questions(&raw);
        if questions.len() < count {
            let shortfall = count - questions.len();
            debug!(subject, generated = questions.len(), shortfall, "padding from demo bank");
            questions.extend(bank::demo_questions(subject, shortfall, difficulty));
        }
        questions.truncate(count);
        questions
    }
}

fn generation_prompt(subject: &str, count: usize, difficulty: Option<Difficulty>) -> String {
    let difficulty_phrase = match difficulty {
        Some(d) => d.as_str().to_string(),
        None => "a mix of easy, medium and hard".to_string(),
    };
    format!(
        "Generate {count} multiple-choice questions on {subject} for Nigerian exam \
preparation (UTME/WAEC/NECO). Difficulty: {difficulty_phrase}.\n\
Return ONLY a JSON array with no other text. Each element must have exactly \
these fields:\n\
[\n  {{\n    \"question\": \"The question text\",\n    \"option_a\": \"First option\",\n    \
\"option_b\": \"Second option\",\n    \"option_c\": \"Third option\",\n    \
\"option_d\": \"Fourth option\",\n    \"correct_answer\": \"A\",\n    \
\"explanation\": \"Why the answer is correct\",\n    \"difficulty\": \"easy|medium|hard\"\n  }}\n]"
    )
}

// ── Output extraction ────────────────────────────────────────────────────────

/// Parse whatever the model returned into validated questions. Returns an
/// empty vec when no JSON array can be recovered; the caller pads.
fn parse_questions(raw: &str) -> Vec<Question> {
    let body = strip_code_fences(raw);
    let Some(array_text) = locate_array(&body) else {
        debug!("model output contains no JSON array");
        return Vec::new();
    };
    let rows = match serde_json::from_str::<Vec<Value>>(array_text) {
        Ok(rows) => rows,
        Err(_) => {
            let repaired = repair_json_like(array_text);
            match serde_json::from_str::<Vec<Value>>(&repaired) {
                Ok(rows) => rows,
                Err(e) => {
                    debug!(error = %e, "model output unparseable after repair");
                    return Vec::new();
                }
            }
        }
    };
    rows.iter().filter_map(validate_row).collect()
}

/// Drop markdown code fences wherever they appear, keeping the body.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```JSON", "").replace("```", "").trim().to_string()
}

/// Find the JSON array inside surrounding prose. Tries a strict
/// object-array match first, then falls back to the widest bracket span.
fn locate_array(text: &str) -> Option<&str> {
    if let Some(m) = ARRAY_RE.find(text) {
        return Some(m.as_str());
    }
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

/// Turn one parsed row into a question, substituting placeholders for
/// anything missing or malformed. Only non-object rows are skipped.
fn validate_row(row: &Value) -> Option<Question> {
    let obj = row.as_object()?;
    let field = |key: &str| {
        obj.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    };

    let stem = field("question").unwrap_or("Missing content").to_string();
    let options =
        ["option_a", "option_b", "option_c", "option_d"].map(|k| field(k).unwrap_or("Missing content").to_string());
    let correct = field("correct_answer").and_then(Answer::parse).unwrap_or(Answer::A);
    let explanation = field("explanation").unwrap_or("No explanation provided.").to_string();
    let difficulty = field("difficulty").and_then(Difficulty::parse).unwrap_or(Difficulty::Medium);

    Some(Question {
        id: format!("ai_{}", Uuid::new_v4()),
        subject_id: None,
        stem,
        options,
        correct,
        explanation,
        difficulty,
        source: QuestionSource::Ai,
        image: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;

    fn scripted(reply: &str) -> QuestionPipeline {
        QuestionPipeline::new(Some(LlmGateway::Scripted(ScriptedProvider::reply(reply))), 2000)
    }

    fn sample_rows(n: usize) -> String {
        let rows: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"question": "Q{i}?", "option_a": "a", "option_b": "b", "option_c": "c", "option_d": "d", "correct_answer": "B", "explanation": "because", "difficulty": "easy"}}"#
                )
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }

    #[tokio::test]
    async fn unconfigured_pipeline_serves_demo_bank() {
        let pipeline = QuestionPipeline::new(None, 2000);
        let questions = pipeline.generate("Mathematics", 5, None).await;
        assert_eq!(questions.len(), 5);
        assert!(questions.iter().all(|q| q.source == QuestionSource::Demo));
    }

    #[tokio::test]
    async fn valid_reply_is_parsed_into_ai_questions() {
        let questions = scripted(&sample_rows(2)).generate("Physics", 2, None).await;
        assert_eq!(questions.len(), 2);
        for q in &questions {
            assert!(q.id.starts_with("ai_"));
            assert_eq!(q.source, QuestionSource::Ai);
            assert_eq!(q.correct, Answer::B);
        }
    }

    #[tokio::test]
    async fn garbage_reply_falls_back_to_demo_bank() {
        let questions =
            scripted("I am sorry, I cannot do that right now.").generate("Biology", 5, None).await;
        assert_eq!(questions.len(), 5);
        assert!(questions.iter().all(|q| q.source == QuestionSource::Demo));
    }

    #[tokio::test]
    async fn gateway_failure_falls_back_to_demo_bank() {
        let gateway = LlmGateway::Scripted(ScriptedProvider::fail("connection refused"));
        let pipeline = QuestionPipeline::new(Some(gateway), 2000);
        let questions = pipeline.generate("Chemistry", 3, Some(Difficulty::Hard)).await;
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.source == QuestionSource::Demo));
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
    }

    #[tokio::test]
    async fn shortfall_is_padded_and_overshoot_truncated() {
        let questions = scripted(&sample_rows(1)).generate("Physics", 3, None).await;
        assert_eq!(questions.len(), 3);
        assert_eq!(questions.iter().filter(|q| q.source == QuestionSource::Ai).count(), 1);
        assert_eq!(questions.iter().filter(|q| q.source == QuestionSource::Demo).count(), 2);

        let questions = scripted(&sample_rows(5)).generate("Physics", 2, None).await;
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.source == QuestionSource::Ai));
    }

    #[tokio::test]
    async fn fenced_and_single_quoted_reply_is_repaired() {
        let reply = "Here you go:\n```json\n[{'question': 'Q?', 'option_a': 'a', \
'option_b': 'b', 'option_c': 'c', 'option_d': 'd', 'correct_answer': 'c', \
'explanation': 'why', 'difficulty': 'hard'},]\n```";
        let questions = scripted(reply).generate("Physics", 1, None).await;
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].source, QuestionSource::Ai);
        assert_eq!(questions[0].correct, Answer::C);
        assert_eq!(questions[0].difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn malformed_rows_get_placeholders() {
        let reply = r#"[{"question": "Q?", "correct_answer": "E"}, "not an object"]"#;
        let questions = scripted(reply).generate("Physics", 1, None).await;
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.stem, "Q?");
        assert!(q.options.iter().all(|o| o == "Missing content"));
        assert_eq!(q.correct, Answer::A);
        assert_eq!(q.explanation, "No explanation provided.");
        assert_eq!(q.difficulty, Difficulty::Medium);
    }

    #[test]
    fn locate_array_finds_span_in_prose() {
        let text = "Sure! Here are the questions: [{\"a\": 1}] Hope that helps.";
        assert_eq!(locate_array(text), Some(r#"[{"a": 1}]"#));
        assert!(locate_array("no array here").is_none());
        assert!(locate_array("] backwards [").is_none());
    }

    #[test]
    fn strip_code_fences_removes_markers() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("plain [1]"), "plain [1]");
    }
}
