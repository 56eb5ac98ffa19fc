//! System prompt assembly for the conversational engine.
//!
//! The prompt is layered: persona first, then profile, mood guidance and
//! performance context when personalization is on. Everything the model
//! needs about the student travels in the system prompt; the user message
//! goes through untouched.

use crate::config::Config;
use crate::llm::ChatMessage;
use crate::model::{ConversationMessage, Emotion, StudentProfile};

/// Average score at or above this marks a subject as strong.
pub const STRONG_THRESHOLD: f64 = 75.0;
/// Average score below this marks a subject as weak.
pub const WEAK_THRESHOLD: f64 = 50.0;

fn persona(bot_name: &str) -> String {
    format!(
        "You are {bot_name}, a friendly and knowledgeable AI tutor for Nigerian and African \
students preparing for UTME, WAEC and NECO examinations. You help with academic questions, \
provide study guidance and offer encouragement. Be helpful, culturally aware and educational. \
Keep responses concise but informative, under 200 words."
    )
}

fn emotion_guidance(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Frustrated => {
            "Acknowledge the difficulty, stay patient and break the problem into small steps."
        }
        Emotion::Worried => "Reassure the student and point to concrete preparation steps.",
        Emotion::Tired => "Keep the reply short and suggest a rest or a lighter task.",
        Emotion::Excited => "Match the enthusiasm and channel it into the next challenge.",
        Emotion::Confident => "Affirm the confidence and stretch the student a little further.",
        Emotion::Curious => "Feed the curiosity with a clear explanation and a follow-up question.",
        Emotion::Neutral => "Keep a warm, encouraging tone.",
    }
}

/// Build the system prompt for one turn. With personalization off only the
/// persona is sent.
pub fn system_prompt(
    config: &Config,
    profile: &StudentProfile,
    emotion: Emotion,
    strong: &[String],
    weak: &[String],
) -> String {
    let mut prompt = persona(&config.bot_name);
    if !config.personalization {
        return prompt;
    }

    prompt.push_str("\n\nStudent profile:");
    prompt.push_str(&format!(
        "\n- Name: {}",
        profile.name.as_deref().unwrap_or("not shared")
    ));
    prompt.push_str(&format!("\n- Learning style: {}", profile.learning_style));
    prompt.push_str(&format!(
        "\n- Preferred difficulty: {}",
        profile.preferred_difficulty.as_str()
    ));
    prompt.push_str(&format!("\n- Communication style: {}", profile.communication_style));

    prompt.push_str(&format!(
        "\n\nThe student currently sounds {}. {}",
        emotion.as_str(),
        emotion_guidance(emotion)
    ));

    if !strong.is_empty() {
        prompt.push_str(&format!("\nStrong subjects: {}.", strong.join(", ")));
    }
    if !weak.is_empty() {
        prompt.push_str(&format!("\nSubjects needing improvement: {}.", weak.join(", ")));
    }
    prompt.push_str("\nTailor explanations to this profile and acknowledge how the student is feeling.");
    prompt
}

/// Replay stored turns as role-tagged gateway history.
pub fn to_gateway_history(messages: &[ConversationMessage]) -> Vec<ChatMessage> {
    let mut turns = Vec::with_capacity(messages.len() * 2);
    for m in messages {
        turns.push(ChatMessage::user(m.user_message.clone()));
        turns.push(ChatMessage::assistant(m.ai_response.clone()));
    }
    turns
}
