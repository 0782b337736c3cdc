use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;

pub const LOG_ENTRY_COLUMNS: &str = "id, student_id, date, content, attachments, tags, mood, \
     hours_worked, log_type, is_private, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excellent,
    Good,
    Neutral,
    Challenging,
    Difficult,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excellent => "excellent",
            Mood::Good => "good",
            Mood::Neutral => "neutral",
            Mood::Challenging => "challenging",
            Mood::Difficult => "difficult",
        }
    }

    pub fn parse(value: &str) -> Option<Mood> {
        match value {
            "excellent" => Some(Mood::Excellent),
            "good" => Some(Mood::Good),
            "neutral" => Some(Mood::Neutral),
            "challenging" => Some(Mood::Challenging),
            "difficult" => Some(Mood::Difficult),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    Regular,
    Quick,
    WeeklySummary,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Regular => "regular",
            LogType::Quick => "quick",
            LogType::WeeklySummary => "weekly_summary",
        }
    }

    pub fn parse(value: &str) -> Option<LogType> {
        match value {
            "regular" => Some(LogType::Regular),
            "quick" => Some(LogType::Quick),
            "weekly_summary" => Some(LogType::WeeklySummary),
            _ => None,
        }
    }
}

/// File metadata only; the storage mechanism itself lives outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub filename: String,
    pub original_name: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachmentUpload {
    pub filename: String,
    pub original_name: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<String>,
    pub mood: Option<Mood>,
    pub hours_worked: Option<f64>,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbLogEntry {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub content: String,
    pub attachments: String,
    pub tags: String,
    pub mood: Option<String>,
    pub hours_worked: Option<f64>,
    pub log_type: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbLogEntry {
    pub async fn by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DbLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, DbLogEntry>(&format!(
            "SELECT {LOG_ENTRY_COLUMNS} FROM log_entries WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
    }
}

impl TryFrom<DbLogEntry> for LogEntry {
    type Error = AppError;

    fn try_from(value: DbLogEntry) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("malformed log entry id {}: {err}", value.id)))?;
        let student_id = Uuid::parse_str(&value.student_id).map_err(|err| {
            AppError::internal(format!("malformed student id {}: {err}", value.student_id))
        })?;
        let attachments: Vec<Attachment> = serde_json::from_str(&value.attachments)
            .map_err(|err| AppError::internal(format!("malformed attachments json: {err}")))?;
        let tags: Vec<String> = serde_json::from_str(&value.tags)
            .map_err(|err| AppError::internal(format!("malformed tags json: {err}")))?;
        let mood = value
            .mood
            .map(|mood| {
                Mood::parse(&mood).ok_or_else(|| AppError::internal(format!("unknown mood {mood}")))
            })
            .transpose()?;
        let log_type = LogType::parse(&value.log_type)
            .ok_or_else(|| AppError::internal(format!("unknown log type {}", value.log_type)))?;

        Ok(LogEntry {
            id,
            student_id,
            date: value.date,
            content: value.content,
            attachments,
            tags,
            mood,
            hours_worked: value.hours_worked,
            log_type,
            is_private: value.is_private,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LogEntryCreateRequest {
    #[schema(example = "2026-08-06")]
    #[validate(custom(function = crate::validate::not_future))]
    pub date: NaiveDate,
    #[validate(length(min = 10, max = 5000, message = "content must be 10-5000 characters"))]
    pub content: String,
    pub attachments: Option<Vec<AttachmentUpload>>,
    pub tags: Option<Vec<String>>,
    pub mood: Option<Mood>,
    #[validate(range(min = 0.0, max = 24.0, message = "hours worked must be between 0 and 24"))]
    pub hours_worked: Option<f64>,
    #[serde(rename = "type")]
    pub log_type: Option<LogType>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LogEntryUpdateRequest {
    #[validate(custom(function = crate::validate::not_future))]
    pub date: Option<NaiveDate>,
    #[validate(length(min = 10, max = 5000, message = "content must be 10-5000 characters"))]
    pub content: Option<String>,
    pub attachments: Option<Vec<AttachmentUpload>>,
    pub tags: Option<Vec<String>>,
    pub mood: Option<Mood>,
    #[validate(range(min = 0.0, max = 24.0, message = "hours worked must be between 0 and 24"))]
    pub hours_worked: Option<f64>,
    #[serde(rename = "type")]
    pub log_type: Option<LogType>,
    pub is_private: Option<bool>,
}
