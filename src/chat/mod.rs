//! Conversational engine.
//!
//! `ChatEngine::converse` is infallible: a reply always comes back, from the
//! gateway when one is configured and from the rule-based fallback
//! otherwise. Persistence is best effort; every store write is wrapped and
//! logged on failure so a broken backend degrades the memory, never the
//! conversation.
//!
//! # Module layout
//!
//! - **classify** — Emotion, topic and quality heuristics.
//! - **prompt** — System prompt assembly and history replay.
//! - **fallback** — Rule-based static replies.

pub mod classify;
pub mod fallback;
pub mod prompt;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::EngineError;
use crate::llm::LlmGateway;
use crate::model::{
    Conversation, ConversationMessage, ConversationOwner, ConversationStatus, Emotion,
    LearningAnalytics, Priority, RecommendationStatus, StudentProfile, StudyRecommendation,
};
use crate::store::MemoryStore;

/// How long a fresh recommendation stays actionable.
const RECOMMENDATION_LIFETIME_DAYS: i64 = 14;
/// How many pending recommendations ride along with a reply.
const PENDING_LIMIT: usize = 5;
/// Conversation titles are cut to roughly this many characters.
const TITLE_LIMIT: usize = 50;

// ── Replies ──────────────────────────────────────────────────────────────────

/// What the engine learned from one message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatInsights {
    pub emotion: Emotion,
    pub topics: Vec<String>,
    pub strong_subjects: Vec<String>,
    pub weak_subjects: Vec<String>,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response_text: String,
    pub conversation_id: String,
    pub insights: ChatInsights,
    pub recommendations: Vec<StudyRecommendation>,
    /// True when the reply came from the static responder.
    pub fallback: bool,
}

/// Weak subjects keep their id so recommendations can point at them.
#[derive(Debug, Clone)]
struct WeakSubject {
    subject_id: i64,
    name: String,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct ChatEngine {
    store: Arc<dyn MemoryStore>,
    gateway: Option<LlmGateway>,
    config: Config,
}

impl ChatEngine {
    pub fn new(store: Arc<dyn MemoryStore>, gateway: Option<LlmGateway>, config: Config) -> Self {
        Self { store, gateway, config }
    }

    /// One conversational turn. Known users get a persisted profile,
    /// performance-aware prompts and recommendation/analytics bookkeeping;
    /// anonymous visitors get the same conversation quality with
    /// session-scoped memory only.
    pub async fn converse(
        &self,
        message: &str,
        user_id: Option<i64>,
        session_id: Option<&str>,
    ) -> ChatReply {
        let now = Utc::now();
        let profile = self.load_profile(user_id, now);
        let owner = match (user_id, session_id) {
            (Some(id), _) => ConversationOwner::User(id),
            (None, Some(sid)) => ConversationOwner::Session(sid.to_string()),
            (None, None) => ConversationOwner::Session(Uuid::new_v4().to_string()),
        };
        let conversation = self.open_conversation(owner, message, now);
        let history = self.conversation_history(&conversation.id);

        let emotion = classify::emotion(message);
        let topics = classify::topics(message);
        let (strong, weak) = self.performance_partition(user_id);
        let weak_names: Vec<String> = weak.iter().map(|w| w.name.clone()).collect();

        let (response_text, fallback) =
            self.complete(message, &profile, emotion, &strong, &weak_names, &history).await;
        let quality = classify::quality_score(&response_text, emotion);

        debug!(
            conversation_id = %conversation.id,
            emotion = emotion.as_str(),
            topics = topics.len(),
            fallback,
            "chat turn"
        );

        let generated = self.persist_turn(
            &conversation,
            &profile,
            user_id,
            message,
            &response_text,
            emotion,
            &topics,
            fallback,
            quality,
            &weak,
            now,
        );
        let recommendations = self.pending(user_id);
        if generated > 0 {
            debug!(user_id = user_id.unwrap_or_default(), "study recommendation generated");
        }

        ChatReply {
            response_text,
            conversation_id: conversation.id,
            insights: ChatInsights {
                emotion,
                topics,
                strong_subjects: strong,
                weak_subjects: weak_names,
                quality_score: quality,
            },
            recommendations,
            fallback,
        }
    }

    /// Transcript of one conversation, oldest first.
    pub fn history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, EngineError> {
        self.store.recent_messages(conversation_id, limit)
    }

    // ── Profile and conversation setup ───────────────────────────────────────

    fn load_profile(&self, user_id: Option<i64>, now: chrono::DateTime<Utc>) -> StudentProfile {
        let Some(user_id) = user_id else {
            // anonymous visitors get an in-memory default, never persisted
            return StudentProfile::with_defaults(0, now);
        };
        match self.store.profile(user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                let profile = StudentProfile::with_defaults(user_id, now);
                if self.config.memory_writes {
                    if let Err(e) = self.store.upsert_profile(&profile) {
                        warn!(error = %e, user_id, "failed to persist default profile");
                    }
                }
                profile
            }
            Err(e) => {
                warn!(error = %e, user_id, "failed to load profile");
                StudentProfile::with_defaults(user_id, now)
            }
        }
    }

    fn open_conversation(
        &self,
        owner: ConversationOwner,
        message: &str,
        now: chrono::DateTime<Utc>,
    ) -> Conversation {
        if self.config.memory_writes {
            let since = now - Duration::hours(self.config.chat.conversation_window_hours);
            match self.store.active_conversation(&owner, since) {
                Ok(Some(conversation)) => return conversation,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to look up active conversation"),
            }
        }
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            owner,
            title: conversation_title(message),
            started_at: now,
            last_message_at: now,
            message_count: 0,
            mood_detected: None,
            topics_covered: Vec::new(),
            status: ConversationStatus::Active,
        };
        if self.config.memory_writes {
            if let Err(e) = self.store.insert_conversation(&conversation) {
                warn!(error = %e, "failed to persist conversation");
            }
        }
        conversation
    }

    fn conversation_history(&self, conversation_id: &str) -> Vec<ConversationMessage> {
        match self.store.recent_messages(conversation_id, self.config.chat.history_window) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, conversation_id, "failed to load history");
                Vec::new()
            }
        }
    }

    /// Subject names split by lifetime average: strong at or above 75%, weak
    /// below 50%. Anonymous users have no performance history.
    fn performance_partition(&self, user_id: Option<i64>) -> (Vec<String>, Vec<WeakSubject>) {
        let Some(user_id) = user_id else { return (Vec::new(), Vec::new()) };
        let records = match self.store.performance(user_id) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, user_id, "failed to load performance records");
                return (Vec::new(), Vec::new());
            }
        };
        let mut strong: Vec<String> = Vec::new();
        let mut weak: Vec<WeakSubject> = Vec::new();
        for record in records {
            let name = match self.store.subject(record.subject_id) {
                Ok(Some(subject)) => subject.name,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, subject_id = record.subject_id, "failed to load subject");
                    continue;
                }
            };
            if record.average_score >= prompt::STRONG_THRESHOLD {
                if !strong.contains(&name) {
                    strong.push(name);
                }
            } else if record.average_score < prompt::WEAK_THRESHOLD
                && !weak.iter().any(|w| w.name == name)
            {
                weak.push(WeakSubject { subject_id: record.subject_id, name });
            }
        }
        (strong, weak)
    }

    // ── Reply generation ─────────────────────────────────────────────────────

    async fn complete(
        &self,
        message: &str,
        profile: &StudentProfile,
        emotion: Emotion,
        strong: &[String],
        weak: &[String],
        history: &[ConversationMessage],
    ) -> (String, bool) {
        let Some(gateway) = &self.gateway else {
            return (fallback::static_reply(message), true);
        };
        let system = prompt::system_prompt(&self.config, profile, emotion, strong, weak);
        let turns = prompt::to_gateway_history(history);
        match gateway.send(message, Some(&system), self.config.chat.reply_max_tokens, &turns).await
        {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(
                    error = %e,
                    provider = gateway.provider_name(),
                    "chat completion failed, using static fallback"
                );
                (fallback::static_reply(message), true)
            }
        }
    }

    // ── Side effects ─────────────────────────────────────────────────────────

    /// Persist everything one turn produces. Each write is independent:
    /// failures are logged and swallowed. Returns how many recommendations
    /// were generated (0 or 1).
    #[allow(clippy::too_many_arguments)]
    fn persist_turn(
        &self,
        conversation: &Conversation,
        profile: &StudentProfile,
        user_id: Option<i64>,
        message: &str,
        response_text: &str,
        emotion: Emotion,
        topics: &[String],
        fallback: bool,
        quality: f64,
        weak: &[WeakSubject],
        now: chrono::DateTime<Utc>,
    ) -> u32 {
        if !self.config.memory_writes {
            return 0;
        }

        let record = ConversationMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            user_message: message.to_string(),
            ai_response: response_text.to_string(),
            emotion,
            topics: topics.to_vec(),
            fallback,
            created_at: now,
        };
        if let Err(e) = self.store.append_message(&record) {
            warn!(error = %e, "failed to append conversation message");
        }

        let mut updated = conversation.clone();
        updated.last_message_at = now;
        updated.message_count += 1;
        updated.mood_detected = Some(emotion);
        for topic in topics {
            if !updated.topics_covered.contains(topic) {
                updated.topics_covered.push(topic.clone());
            }
        }
        if let Err(e) = self.store.update_conversation(&updated) {
            warn!(error = %e, conversation_id = %conversation.id, "failed to update conversation");
        }

        // profile, recommendations and analytics exist for known users only
        let Some(user_id) = user_id else { return 0 };

        let mut updated_profile = profile.clone();
        updated_profile.total_conversations += 1;
        updated_profile.last_active_at = now;
        if emotion != Emotion::Neutral {
            let trait_tag = emotion.as_str().to_string();
            if !updated_profile.personality_traits.contains(&trait_tag) {
                updated_profile.personality_traits.push(trait_tag);
            }
        }
        if let Err(e) = self.store.upsert_profile(&updated_profile) {
            warn!(error = %e, user_id, "failed to update profile counters");
        }

        let mut generated = 0;
        if let Some(rec) = build_recommendation(user_id, emotion, topics, weak, now) {
            let since = now - Duration::days(self.config.chat.recommendation_dedup_days);
            match self.store.has_recent_recommendation(user_id, &rec.topic, since) {
                Ok(true) => {}
                Ok(false) => match self.store.insert_recommendation(&rec) {
                    Ok(_) => generated = 1,
                    Err(e) => warn!(error = %e, "failed to insert recommendation"),
                },
                Err(e) => warn!(error = %e, "recommendation dedup check failed"),
            }
        }

        let analytics = LearningAnalytics {
            user_id,
            date: now.date_naive(),
            activity_type: "conversation".into(),
            conversations: 1,
            questions_answered: 0,
            quality_score: quality,
            recommendations_generated: generated,
        };
        if let Err(e) = self.store.merge_daily_analytics(&analytics) {
            warn!(error = %e, "failed to merge daily analytics");
        }

        generated
    }

    fn pending(&self, user_id: Option<i64>) -> Vec<StudyRecommendation> {
        let Some(user_id) = user_id else { return Vec::new() };
        match self.store.pending_recommendations(user_id, PENDING_LIMIT) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, user_id, "failed to load pending recommendations");
                Vec::new()
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn conversation_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= TITLE_LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(TITLE_LIMIT - 3).collect();
        format!("{}...", cut.trim_end())
    }
}

/// A topic touching a weak subject earns a high-priority recommendation; a
/// negative mood alone earns a medium one. Anything else, none.
fn build_recommendation(
    user_id: i64,
    emotion: Emotion,
    topics: &[String],
    weak: &[WeakSubject],
    now: chrono::DateTime<Utc>,
) -> Option<StudyRecommendation> {
    let expires_at = now + Duration::days(RECOMMENDATION_LIFETIME_DAYS);
    for topic in topics {
        if let Some(subject) = weak.iter().find(|w| w.name.to_lowercase().contains(topic.as_str()))
        {
            return Some(StudyRecommendation {
                id: 0,
                user_id,
                topic: topic.clone(),
                subject_id: Some(subject.subject_id),
                text: format!(
                    "Your recent quiz results show {} needs attention. Set aside extra \
practice time for {} this week and work through past questions.",
                    subject.name, topic
                ),
                priority: Priority::High,
                status: RecommendationStatus::Pending,
                created_at: now,
                expires_at,
            });
        }
    }
    if emotion.is_negative() {
        let topic = topics.first().cloned().unwrap_or_else(|| "motivation".to_string());
        return Some(StudyRecommendation {
            id: 0,
            user_id,
            topic,
            subject_id: None,
            text: format!(
                "You sounded {} today. Short, focused study sessions with small wins will \
rebuild your momentum.",
                emotion.as_str()
            ),
            priority: Priority::Medium,
            status: RecommendationStatus::Pending,
            created_at: now,
            expires_at,
        });
    }
    None
}

/// Time-of-day greeting in the bot's voice, personalized when the student's
/// name is known. Hours follow a 24h clock.
pub fn greeting(bot_name: &str, profile: Option<&StudentProfile>, hour: u32) -> String {
    let opening = if (5..12).contains(&hour) {
        "Good morning"
    } else if (12..18).contains(&hour) {
        "Good afternoon"
    } else {
        "Good evening"
    };
    match profile.and_then(|p| p.name.as_deref()) {
        Some(name) => format!(
            "{opening}, {name}! I'm {bot_name}, your AI study assistant. How can I help you today?"
        ),
        None => {
            format!("{opening}! I'm {bot_name}, your AI study assistant. How can I help you today?")
        }
    }
}
