//! SQLite store — durable backend behind the `sqlite-store` feature.
//!
//! One database file holds every record family. Connections are opened per
//! operation with WAL, foreign keys and a busy timeout applied, so the store
//! can be shared across tasks without holding a connection in a lock.
//! List-valued columns are stored as JSON text; tag enums as their lowercase
//! string form; timestamps as RFC 3339 text.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::EngineError;
use crate::model::{
    Answer, AnswerRecord, Conversation, ConversationMessage, ConversationOwner,
    ConversationStatus, Difficulty, Emotion, Exam, LearningAnalytics, PerformanceRecord, Priority,
    Question, QuestionSource, QuizAttempt, RecommendationStatus, SessionStatus, StudentProfile,
    StudyRecommendation, Subject, Trend,
};

use super::MemoryStore;

/// Schema version stored in `PRAGMA user_version`.
/// Increment when the DDL changes and add a migration in `init_schema`.
const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the database at `db_path`, creating the file and schema if needed.
    pub fn open(db_path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Store(format!("sqlite: cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = Self { db_path: db_path.to_path_buf() };
        let conn = store.conn()?;
        init_schema(&conn)?;
        Ok(store)
    }

    fn conn(&self) -> Result<Connection, EngineError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            EngineError::Store(format!("sqlite: open {}: {e}", self.db_path.display()))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err("set journal_mode WAL"))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(store_err("set foreign_keys ON"))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(store_err("set busy_timeout"))?;
        Ok(conn)
    }
}

fn init_schema(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS student_profiles (
            user_id INTEGER PRIMARY KEY,
            name TEXT,
            learning_style TEXT NOT NULL,
            strong_subjects TEXT NOT NULL,
            weak_subjects TEXT NOT NULL,
            preferred_difficulty TEXT NOT NULL,
            personality_traits TEXT NOT NULL,
            communication_style TEXT NOT NULL,
            total_conversations INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            last_active_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            owner_kind TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            started_at TEXT NOT NULL,
            last_message_at TEXT NOT NULL,
            message_count INTEGER NOT NULL,
            mood_detected TEXT,
            topics_covered TEXT NOT NULL,
            status TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_owner
            ON conversations(owner_kind, owner_id, last_message_at);

        CREATE TABLE IF NOT EXISTS conversation_messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            user_message TEXT NOT NULL,
            ai_response TEXT NOT NULL,
            emotion TEXT NOT NULL,
            topics TEXT NOT NULL,
            fallback INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON conversation_messages(conversation_id, created_at);

        CREATE TABLE IF NOT EXISTS performance_records (
            user_id INTEGER NOT NULL,
            exam_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            total_attempts INTEGER NOT NULL,
            total_questions INTEGER NOT NULL,
            correct_answers INTEGER NOT NULL,
            average_score REAL NOT NULL,
            best_score REAL NOT NULL,
            latest_score REAL NOT NULL,
            trend TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, exam_id, subject_id)
        );

        CREATE TABLE IF NOT EXISTS study_recommendations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            topic TEXT NOT NULL,
            subject_id INTEGER,
            text TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_recommendations_user
            ON study_recommendations(user_id, status, created_at);

        CREATE TABLE IF NOT EXISTS learning_analytics (
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            conversations INTEGER NOT NULL,
            questions_answered INTEGER NOT NULL,
            quality_score REAL NOT NULL,
            recommendations_generated INTEGER NOT NULL,
            PRIMARY KEY (user_id, date, activity_type)
        );

        CREATE TABLE IF NOT EXISTS exams (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            time_limit_secs INTEGER NOT NULL,
            passing_score REAL NOT NULL,
            questions_per_subject INTEGER NOT NULL,
            session_cap INTEGER
        );

        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY,
            exam_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subjects_exam ON subjects(exam_id);

        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            subject_id INTEGER,
            stem TEXT NOT NULL,
            option_a TEXT NOT NULL,
            option_b TEXT NOT NULL,
            option_c TEXT NOT NULL,
            option_d TEXT NOT NULL,
            correct TEXT NOT NULL,
            explanation TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            source TEXT NOT NULL,
            image TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_questions_subject
            ON questions(subject_id, difficulty);

        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            exam_id INTEGER NOT NULL,
            subject_ids TEXT NOT NULL,
            score REAL NOT NULL,
            total_questions INTEGER NOT NULL,
            correct_answers INTEGER NOT NULL,
            time_taken_secs INTEGER NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS attempt_answers (
            attempt_id INTEGER NOT NULL,
            question_id TEXT NOT NULL,
            answer TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            time_spent_secs INTEGER NOT NULL,
            answered_at TEXT NOT NULL,
            PRIMARY KEY (attempt_id, question_id)
        );

        PRAGMA user_version = {SCHEMA_VERSION};
        "
    ))
    .map_err(store_err("initialize schema"))
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn store_err<E: std::fmt::Display>(op: &str) -> impl Fn(E) -> EngineError + '_ {
    move |e| EngineError::Store(format!("sqlite: {op}: {e}"))
}

/// Conversion failure for a tag column holding an unexpected word.
fn decode_err(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value {value:?}").into(),
    )
}

fn owner_columns(owner: &ConversationOwner) -> (&'static str, String) {
    match owner {
        ConversationOwner::User(id) => ("user", id.to_string()),
        ConversationOwner::Session(key) => ("session", key.clone()),
    }
}

fn owner_from_columns(kind: &str, id: &str, idx: usize) -> Result<ConversationOwner, rusqlite::Error> {
    match kind {
        "user" => id
            .parse::<i64>()
            .map(ConversationOwner::User)
            .map_err(|_| decode_err(idx, id)),
        "session" => Ok(ConversationOwner::Session(id.to_string())),
        _ => Err(decode_err(idx, kind)),
    }
}

fn string_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn id_list(json: &str) -> Vec<i64> {
    serde_json::from_str(json).unwrap_or_default()
}

// ── Row mappers ──────────────────────────────────────────────────────────────

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let kind: String = row.get(1)?;
    let owner_id: String = row.get(2)?;
    let mood: Option<String> = row.get(7)?;
    let mood = match mood {
        Some(s) => Some(Emotion::parse(&s).ok_or_else(|| decode_err(7, &s))?),
        None => None,
    };
    let topics: String = row.get(8)?;
    let status: String = row.get(9)?;
    Ok(Conversation {
        id: row.get(0)?,
        owner: owner_from_columns(&kind, &owner_id, 1)?,
        title: row.get(3)?,
        started_at: row.get(4)?,
        last_message_at: row.get(5)?,
        message_count: row.get(6)?,
        mood_detected: mood,
        topics_covered: string_list(&topics),
        status: ConversationStatus::parse(&status).ok_or_else(|| decode_err(9, &status))?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationMessage> {
    let emotion: String = row.get(4)?;
    let topics: String = row.get(5)?;
    Ok(ConversationMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_message: row.get(2)?,
        ai_response: row.get(3)?,
        emotion: Emotion::parse(&emotion).ok_or_else(|| decode_err(4, &emotion))?,
        topics: string_list(&topics),
        fallback: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    let trend: String = row.get(9)?;
    Ok(PerformanceRecord {
        user_id: row.get(0)?,
        exam_id: row.get(1)?,
        subject_id: row.get(2)?,
        total_attempts: row.get(3)?,
        total_questions: row.get(4)?,
        correct_answers: row.get(5)?,
        average_score: row.get(6)?,
        best_score: row.get(7)?,
        latest_score: row.get(8)?,
        trend: Trend::parse(&trend).ok_or_else(|| decode_err(9, &trend))?,
        updated_at: row.get(10)?,
    })
}

fn recommendation_from_row(row: &Row<'_>) -> rusqlite::Result<StudyRecommendation> {
    let priority: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(StudyRecommendation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        topic: row.get(2)?,
        subject_id: row.get(3)?,
        text: row.get(4)?,
        priority: Priority::parse(&priority).ok_or_else(|| decode_err(5, &priority))?,
        status: RecommendationStatus::parse(&status).ok_or_else(|| decode_err(6, &status))?,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    let correct: String = row.get(7)?;
    let difficulty: String = row.get(9)?;
    let source: String = row.get(10)?;
    Ok(Question {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        stem: row.get(2)?,
        options: [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?],
        correct: Answer::parse(&correct).ok_or_else(|| decode_err(7, &correct))?,
        explanation: row.get(8)?,
        difficulty: Difficulty::parse(&difficulty).ok_or_else(|| decode_err(9, &difficulty))?,
        source: QuestionSource::parse(&source).ok_or_else(|| decode_err(10, &source))?,
        image: row.get(11)?,
    })
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<QuizAttempt> {
    let subject_ids: String = row.get(3)?;
    let status: String = row.get(8)?;
    Ok(QuizAttempt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        exam_id: row.get(2)?,
        subject_ids: id_list(&subject_ids),
        score: row.get(4)?,
        total_questions: row.get(5)?,
        correct_answers: row.get(6)?,
        time_taken_secs: row.get(7)?,
        status: SessionStatus::parse(&status).ok_or_else(|| decode_err(8, &status))?,
        started_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<AnswerRecord> {
    let correct: String = row.get(2)?;
    Ok(AnswerRecord {
        question_id: row.get(0)?,
        answer: row.get(1)?,
        correct_answer: Answer::parse(&correct).ok_or_else(|| decode_err(2, &correct))?,
        is_correct: row.get(3)?,
        time_spent_secs: row.get(4)?,
        answered_at: row.get(5)?,
    })
}

// ── MemoryStore impl ─────────────────────────────────────────────────────────

impl MemoryStore for SqliteStore {
    fn store_type(&self) -> &str {
        "sqlite"
    }

    fn profile(&self, user_id: i64) -> Result<Option<StudentProfile>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT name, learning_style, strong_subjects, weak_subjects, preferred_difficulty,
                    personality_traits, communication_style, total_conversations, created_at,
                    last_active_at
             FROM student_profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                let strong: String = row.get(2)?;
                let weak: String = row.get(3)?;
                let difficulty: String = row.get(4)?;
                let traits: String = row.get(5)?;
                Ok(StudentProfile {
                    user_id,
                    name: row.get(0)?,
                    learning_style: row.get(1)?,
                    strong_subjects: string_list(&strong),
                    weak_subjects: string_list(&weak),
                    preferred_difficulty: Difficulty::parse(&difficulty)
                        .ok_or_else(|| decode_err(4, &difficulty))?,
                    personality_traits: string_list(&traits),
                    communication_style: row.get(6)?,
                    total_conversations: row.get(7)?,
                    created_at: row.get(8)?,
                    last_active_at: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(store_err("get profile"))
    }

    fn upsert_profile(&self, profile: &StudentProfile) -> Result<(), EngineError> {
        let strong = serde_json::to_string(&profile.strong_subjects)
            .map_err(store_err("serialize strong_subjects"))?;
        let weak = serde_json::to_string(&profile.weak_subjects)
            .map_err(store_err("serialize weak_subjects"))?;
        let traits = serde_json::to_string(&profile.personality_traits)
            .map_err(store_err("serialize personality_traits"))?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO student_profiles
                 (user_id, name, learning_style, strong_subjects, weak_subjects,
                  preferred_difficulty, personality_traits, communication_style,
                  total_conversations, created_at, last_active_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    profile.user_id,
                    profile.name,
                    profile.learning_style,
                    strong,
                    weak,
                    profile.preferred_difficulty.as_str(),
                    traits,
                    profile.communication_style,
                    profile.total_conversations,
                    profile.created_at,
                    profile.last_active_at,
                ],
            )
            .map_err(store_err("upsert profile"))?;
        Ok(())
    }

    fn active_conversation(
        &self,
        owner: &ConversationOwner,
        since: DateTime<Utc>,
    ) -> Result<Option<Conversation>, EngineError> {
        let (kind, owner_id) = owner_columns(owner);
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, owner_kind, owner_id, title, started_at, last_message_at, message_count,
                    mood_detected, topics_covered, status
             FROM conversations
             WHERE owner_kind = ?1 AND owner_id = ?2 AND status = 'active'
               AND last_message_at >= ?3
             ORDER BY last_message_at DESC LIMIT 1",
            params![kind, owner_id, since],
            conversation_from_row,
        )
        .optional()
        .map_err(store_err("get active conversation"))
    }

    fn conversation(&self, id: &str) -> Result<Option<Conversation>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, owner_kind, owner_id, title, started_at, last_message_at, message_count,
                    mood_detected, topics_covered, status
             FROM conversations WHERE id = ?1",
            params![id],
            conversation_from_row,
        )
        .optional()
        .map_err(store_err("get conversation"))
    }

    fn insert_conversation(&self, conversation: &Conversation) -> Result<(), EngineError> {
        self.write_conversation(conversation, "insert conversation")
    }

    fn update_conversation(&self, conversation: &Conversation) -> Result<(), EngineError> {
        if self.conversation(&conversation.id)?.is_none() {
            return Err(EngineError::NotFound(format!(
                "conversation {}",
                conversation.id
            )));
        }
        self.write_conversation(conversation, "update conversation")
    }

    fn append_message(&self, message: &ConversationMessage) -> Result<(), EngineError> {
        let topics =
            serde_json::to_string(&message.topics).map_err(store_err("serialize topics"))?;
        self.conn()?
            .execute(
                "INSERT INTO conversation_messages
                 (id, conversation_id, user_message, ai_response, emotion, topics, fallback,
                  created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.conversation_id,
                    message.user_message,
                    message.ai_response,
                    message.emotion.as_str(),
                    topics,
                    message.fallback,
                    message.created_at,
                ],
            )
            .map_err(store_err("append message"))?;
        Ok(())
    }

    fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, conversation_id, user_message, ai_response, emotion, topics, fallback,
                        created_at
                 FROM conversation_messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(store_err("prepare recent_messages"))?;
        let rows = stmt
            .query_map(params![conversation_id, limit as i64], message_from_row)
            .map_err(store_err("query recent_messages"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("map message row"))?);
        }
        out.reverse();
        Ok(out)
    }

    fn performance(&self, user_id: i64) -> Result<Vec<PerformanceRecord>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, exam_id, subject_id, total_attempts, total_questions,
                        correct_answers, average_score, best_score, latest_score, trend, updated_at
                 FROM performance_records WHERE user_id = ?1
                 ORDER BY exam_id, subject_id",
            )
            .map_err(store_err("prepare performance"))?;
        let rows = stmt
            .query_map(params![user_id], performance_from_row)
            .map_err(store_err("query performance"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("map performance row"))?);
        }
        Ok(out)
    }

    fn performance_for(
        &self,
        user_id: i64,
        exam_id: i64,
        subject_id: i64,
    ) -> Result<Option<PerformanceRecord>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_id, exam_id, subject_id, total_attempts, total_questions,
                    correct_answers, average_score, best_score, latest_score, trend, updated_at
             FROM performance_records
             WHERE user_id = ?1 AND exam_id = ?2 AND subject_id = ?3",
            params![user_id, exam_id, subject_id],
            performance_from_row,
        )
        .optional()
        .map_err(store_err("get performance"))
    }

    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), EngineError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO performance_records
                 (user_id, exam_id, subject_id, total_attempts, total_questions, correct_answers,
                  average_score, best_score, latest_score, trend, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.user_id,
                    record.exam_id,
                    record.subject_id,
                    record.total_attempts,
                    record.total_questions,
                    record.correct_answers,
                    record.average_score,
                    record.best_score,
                    record.latest_score,
                    record.trend.as_str(),
                    record.updated_at,
                ],
            )
            .map_err(store_err("upsert performance"))?;
        Ok(())
    }

    fn has_recent_recommendation(
        &self,
        user_id: i64,
        topic: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM study_recommendations
                 WHERE user_id = ?1 AND topic = ?2 AND status = 'pending' AND created_at >= ?3
             )",
            params![user_id, topic, since],
            |row| row.get(0),
        )
        .map_err(store_err("check recent recommendation"))
    }

    fn insert_recommendation(&self, rec: &StudyRecommendation) -> Result<i64, EngineError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO study_recommendations
             (user_id, topic, subject_id, text, priority, status, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.user_id,
                rec.topic,
                rec.subject_id,
                rec.text,
                rec.priority.as_str(),
                rec.status.as_str(),
                rec.created_at,
                rec.expires_at,
            ],
        )
        .map_err(store_err("insert recommendation"))?;
        Ok(conn.last_insert_rowid())
    }

    fn pending_recommendations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<StudyRecommendation>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, topic, subject_id, text, priority, status, created_at,
                        expires_at
                 FROM study_recommendations
                 WHERE user_id = ?1 AND status = 'pending' AND expires_at > ?2
                 ORDER BY CASE priority WHEN 'high' THEN 2 WHEN 'medium' THEN 1 ELSE 0 END DESC,
                          created_at DESC
                 LIMIT ?3",
            )
            .map_err(store_err("prepare pending_recommendations"))?;
        let rows = stmt
            .query_map(
                params![user_id, Utc::now(), limit as i64],
                recommendation_from_row,
            )
            .map_err(store_err("query pending_recommendations"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("map recommendation row"))?);
        }
        Ok(out)
    }

    fn complete_recommendation(&self, id: i64) -> Result<bool, EngineError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE study_recommendations SET status = 'completed' WHERE id = ?1",
                params![id],
            )
            .map_err(store_err("complete recommendation"))?;
        Ok(changed > 0)
    }

    fn merge_daily_analytics(&self, row: &LearningAnalytics) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(store_err("begin analytics tx"))?;
        let existing: Option<(u32, u32, f64, u32)> = tx
            .query_row(
                "SELECT conversations, questions_answered, quality_score,
                        recommendations_generated
                 FROM learning_analytics
                 WHERE user_id = ?1 AND date = ?2 AND activity_type = ?3",
                params![row.user_id, row.date, row.activity_type],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()
            .map_err(store_err("read analytics row"))?;

        match existing {
            Some((conversations, questions_answered, quality_score, recommendations)) => {
                let total_conv = conversations + row.conversations;
                let quality = if total_conv > 0 {
                    (quality_score * conversations as f64
                        + row.quality_score * row.conversations as f64)
                        / total_conv as f64
                } else {
                    quality_score
                };
                tx.execute(
                    "UPDATE learning_analytics
                     SET conversations = ?4, questions_answered = ?5, quality_score = ?6,
                         recommendations_generated = ?7
                     WHERE user_id = ?1 AND date = ?2 AND activity_type = ?3",
                    params![
                        row.user_id,
                        row.date,
                        row.activity_type,
                        total_conv,
                        questions_answered + row.questions_answered,
                        quality,
                        recommendations + row.recommendations_generated,
                    ],
                )
                .map_err(store_err("update analytics row"))?;
            }
            None => {
                tx.execute(
                    "INSERT INTO learning_analytics
                     (user_id, date, activity_type, conversations, questions_answered,
                      quality_score, recommendations_generated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        row.user_id,
                        row.date,
                        row.activity_type,
                        row.conversations,
                        row.questions_answered,
                        row.quality_score,
                        row.recommendations_generated,
                    ],
                )
                .map_err(store_err("insert analytics row"))?;
            }
        }
        tx.commit().map_err(store_err("commit analytics tx"))
    }

    fn analytics_for_day(
        &self,
        user_id: i64,
        date: NaiveDate,
        activity_type: &str,
    ) -> Result<Option<LearningAnalytics>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT conversations, questions_answered, quality_score, recommendations_generated
             FROM learning_analytics
             WHERE user_id = ?1 AND date = ?2 AND activity_type = ?3",
            params![user_id, date, activity_type],
            |row| {
                Ok(LearningAnalytics {
                    user_id,
                    date,
                    activity_type: activity_type.to_string(),
                    conversations: row.get(0)?,
                    questions_answered: row.get(1)?,
                    quality_score: row.get(2)?,
                    recommendations_generated: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(store_err("get analytics"))
    }

    fn exam(&self, exam_id: i64) -> Result<Option<Exam>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, description, time_limit_secs, passing_score, questions_per_subject,
                    session_cap
             FROM exams WHERE id = ?1",
            params![exam_id],
            |row| {
                Ok(Exam {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    time_limit_secs: row.get(3)?,
                    passing_score: row.get(4)?,
                    questions_per_subject: row.get(5)?,
                    session_cap: row.get(6)?,
                })
            },
        )
        .optional()
        .map_err(store_err("get exam"))
    }

    fn insert_exam(&self, exam: &Exam) -> Result<(), EngineError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO exams
                 (id, name, description, time_limit_secs, passing_score, questions_per_subject,
                  session_cap)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    exam.id,
                    exam.name,
                    exam.description,
                    exam.time_limit_secs,
                    exam.passing_score,
                    exam.questions_per_subject,
                    exam.session_cap,
                ],
            )
            .map_err(store_err("insert exam"))?;
        Ok(())
    }

    fn subject(&self, subject_id: i64) -> Result<Option<Subject>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, exam_id, name, description FROM subjects WHERE id = ?1",
            params![subject_id],
            |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    exam_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(store_err("get subject"))
    }

    fn subjects_of(&self, exam_id: i64) -> Result<Vec<Subject>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, exam_id, name, description FROM subjects WHERE exam_id = ?1 ORDER BY id")
            .map_err(store_err("prepare subjects_of"))?;
        let rows = stmt
            .query_map(params![exam_id], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    exam_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            })
            .map_err(store_err("query subjects_of"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("map subject row"))?);
        }
        Ok(out)
    }

    fn insert_subject(&self, subject: &Subject) -> Result<(), EngineError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO subjects (id, exam_id, name, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![subject.id, subject.exam_id, subject.name, subject.description],
            )
            .map_err(store_err("insert subject"))?;
        Ok(())
    }

    fn insert_question(&self, question: &Question) -> Result<(), EngineError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO questions
                 (id, subject_id, stem, option_a, option_b, option_c, option_d, correct,
                  explanation, difficulty, source, image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    question.id,
                    question.subject_id,
                    question.stem,
                    question.options[0],
                    question.options[1],
                    question.options[2],
                    question.options[3],
                    question.correct.as_str(),
                    question.explanation,
                    question.difficulty.as_str(),
                    question.source.as_str(),
                    question.image,
                ],
            )
            .map_err(store_err("insert question"))?;
        Ok(())
    }

    fn stored_questions(
        &self,
        subject_id: i64,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Result<Vec<Question>, EngineError> {
        let conn = self.conn()?;
        let mut out = Vec::new();
        match difficulty {
            Some(d) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, subject_id, stem, option_a, option_b, option_c, option_d,
                                correct, explanation, difficulty, source, image
                         FROM questions WHERE subject_id = ?1 AND difficulty = ?2
                         ORDER BY RANDOM() LIMIT ?3",
                    )
                    .map_err(store_err("prepare stored_questions"))?;
                let rows = stmt
                    .query_map(params![subject_id, d.as_str(), limit as i64], question_from_row)
                    .map_err(store_err("query stored_questions"))?;
                for row in rows {
                    out.push(row.map_err(store_err("map question row"))?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, subject_id, stem, option_a, option_b, option_c, option_d,
                                correct, explanation, difficulty, source, image
                         FROM questions WHERE subject_id = ?1
                         ORDER BY RANDOM() LIMIT ?2",
                    )
                    .map_err(store_err("prepare stored_questions"))?;
                let rows = stmt
                    .query_map(params![subject_id, limit as i64], question_from_row)
                    .map_err(store_err("query stored_questions"))?;
                for row in rows {
                    out.push(row.map_err(store_err("map question row"))?);
                }
            }
        }
        Ok(out)
    }

    fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<i64, EngineError> {
        let subject_ids = serde_json::to_string(&attempt.subject_ids)
            .map_err(store_err("serialize subject_ids"))?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quiz_attempts
             (user_id, exam_id, subject_ids, score, total_questions, correct_answers,
              time_taken_secs, status, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                attempt.user_id,
                attempt.exam_id,
                subject_ids,
                attempt.score,
                attempt.total_questions,
                attempt.correct_answers,
                attempt.time_taken_secs,
                attempt.status.as_str(),
                attempt.started_at,
                attempt.completed_at,
            ],
        )
        .map_err(store_err("insert attempt"))?;
        Ok(conn.last_insert_rowid())
    }

    fn attempt(&self, attempt_id: i64) -> Result<Option<QuizAttempt>, EngineError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, user_id, exam_id, subject_ids, score, total_questions, correct_answers,
                    time_taken_secs, status, started_at, completed_at
             FROM quiz_attempts WHERE id = ?1",
            params![attempt_id],
            attempt_from_row,
        )
        .optional()
        .map_err(store_err("get attempt"))
    }

    fn complete_attempt(
        &self,
        attempt_id: i64,
        score: f64,
        correct_answers: u32,
        total_questions: u32,
        time_taken_secs: u32,
    ) -> Result<(), EngineError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE quiz_attempts
                 SET score = ?2, correct_answers = ?3, total_questions = ?4,
                     time_taken_secs = ?5, status = 'completed', completed_at = ?6
                 WHERE id = ?1",
                params![
                    attempt_id,
                    score,
                    correct_answers,
                    total_questions,
                    time_taken_secs,
                    Utc::now(),
                ],
            )
            .map_err(store_err("complete attempt"))?;
        if changed == 0 {
            return Err(EngineError::NotFound(format!("attempt {attempt_id}")));
        }
        Ok(())
    }

    fn record_answer(&self, attempt_id: i64, answer: &AnswerRecord) -> Result<(), EngineError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO attempt_answers
                 (attempt_id, question_id, answer, correct_answer, is_correct, time_spent_secs,
                  answered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attempt_id,
                    answer.question_id,
                    answer.answer,
                    answer.correct_answer.as_str(),
                    answer.is_correct,
                    answer.time_spent_secs,
                    answer.answered_at,
                ],
            )
            .map_err(store_err("record answer"))?;
        Ok(())
    }

    fn attempt_answers(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT question_id, answer, correct_answer, is_correct, time_spent_secs,
                        answered_at
                 FROM attempt_answers WHERE attempt_id = ?1
                 ORDER BY answered_at, rowid",
            )
            .map_err(store_err("prepare attempt_answers"))?;
        let rows = stmt
            .query_map(params![attempt_id], answer_from_row)
            .map_err(store_err("query attempt_answers"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("map answer row"))?);
        }
        Ok(out)
    }
}

impl SqliteStore {
    fn write_conversation(&self, conversation: &Conversation, op: &str) -> Result<(), EngineError> {
        let (kind, owner_id) = owner_columns(&conversation.owner);
        let topics = serde_json::to_string(&conversation.topics_covered)
            .map_err(store_err("serialize topics_covered"))?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO conversations
                 (id, owner_kind, owner_id, title, started_at, last_message_at, message_count,
                  mood_detected, topics_covered, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    conversation.id,
                    kind,
                    owner_id,
                    conversation.title,
                    conversation.started_at,
                    conversation.last_message_at,
                    conversation.message_count,
                    conversation.mood_detected.map(|m| m.as_str()),
                    topics,
                    conversation.status.as_str(),
                ],
            )
            .map_err(store_err(op))?;
        Ok(())
    }
}
