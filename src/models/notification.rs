use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;

pub const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, notification_type, priority, \
     is_read, read_at, related_entity_type, related_entity_id, action_url, expires_at, \
     created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
    Reminder,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::Reminder => "reminder",
        }
    }

    pub fn parse(value: &str) -> Option<NotificationType> {
        match value {
            "info" => Some(NotificationType::Info),
            "success" => Some(NotificationType::Success),
            "warning" => Some(NotificationType::Warning),
            "error" => Some(NotificationType::Error),
            "reminder" => Some(NotificationType::Reminder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Priority> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityType {
    LogEntry,
    WeeklyReport,
    User,
    System,
}

impl RelatedEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedEntityType::LogEntry => "log_entry",
            RelatedEntityType::WeeklyReport => "weekly_report",
            RelatedEntityType::User => "user",
            RelatedEntityType::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<RelatedEntityType> {
        match value {
            "log_entry" => Some(RelatedEntityType::LogEntry),
            "weekly_report" => Some(RelatedEntityType::WeeklyReport),
            "user" => Some(RelatedEntityType::User),
            "system" => Some(RelatedEntityType::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_entity_type: Option<RelatedEntityType>,
    pub related_entity_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|expires| now > expires).unwrap_or(false)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbNotification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub action_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbNotification {
    pub async fn by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DbNotification>, sqlx::Error> {
        sqlx::query_as::<_, DbNotification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
    }
}

impl TryFrom<DbNotification> for Notification {
    type Error = AppError;

    fn try_from(value: DbNotification) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id).map_err(|err| {
            AppError::internal(format!("malformed notification id {}: {err}", value.id))
        })?;
        let user_id = Uuid::parse_str(&value.user_id)
            .map_err(|err| AppError::internal(format!("malformed user id {}: {err}", value.user_id)))?;
        let notification_type = NotificationType::parse(&value.notification_type).ok_or_else(|| {
            AppError::internal(format!("unknown notification type {}", value.notification_type))
        })?;
        let priority = Priority::parse(&value.priority)
            .ok_or_else(|| AppError::internal(format!("unknown priority {}", value.priority)))?;
        let related_entity_type = value
            .related_entity_type
            .map(|kind| {
                RelatedEntityType::parse(&kind)
                    .ok_or_else(|| AppError::internal(format!("unknown entity type {kind}")))
            })
            .transpose()?;
        let related_entity_id = value
            .related_entity_id
            .map(|id| {
                Uuid::parse_str(&id)
                    .map_err(|err| AppError::internal(format!("malformed entity id {id}: {err}")))
            })
            .transpose()?;

        Ok(Notification {
            id,
            user_id,
            title: value.title,
            message: value.message,
            notification_type,
            priority,
            is_read: value.is_read,
            read_at: value.read_at,
            related_entity_type,
            related_entity_id,
            action_url: value.action_url,
            expires_at: value.expires_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NotificationCreateRequest {
    /// Target user; omitted means broadcast to every active user.
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "message must be 1-1000 characters"))]
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub priority: Option<Priority>,
    #[validate(url(message = "action URL must be valid"))]
    pub action_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
