//! Notification rows written as side effects of domain events.
//!
//! Delivery (email, push) is out of scope; this module only records what the
//! owning user will see in their notification feed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::{NotificationType, Priority, RelatedEntityType};
use crate::utils::utc_now;

#[derive(Debug, Clone)]
pub struct NotifyOptions {
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub related_entity_type: Option<RelatedEntityType>,
    pub related_entity_id: Option<Uuid>,
    pub action_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            notification_type: NotificationType::Info,
            priority: Priority::Medium,
            related_entity_type: None,
            related_entity_id: None,
            action_url: None,
            expires_at: None,
        }
    }
}

pub async fn create_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    title: &str,
    message: &str,
    options: NotifyOptions,
) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, notification_type, priority, \
         is_read, related_entity_type, related_entity_id, action_url, expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(title)
    .bind(message)
    .bind(options.notification_type.as_str())
    .bind(options.priority.as_str())
    .bind(options.related_entity_type.map(|kind| kind.as_str()))
    .bind(options.related_entity_id.map(|id| id.to_string()))
    .bind(options.action_url)
    .bind(options.expires_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Posted when a supervisor leaves feedback on a student's weekly report.
pub async fn supervisor_feedback(
    pool: &SqlitePool,
    student_id: Uuid,
    report_id: Uuid,
    supervisor_name: &str,
) -> Result<Uuid, AppError> {
    create_for_user(
        pool,
        student_id,
        "Supervisor Feedback",
        &format!("{supervisor_name} has provided feedback on your weekly report."),
        NotifyOptions {
            notification_type: NotificationType::Success,
            priority: Priority::High,
            related_entity_type: Some(RelatedEntityType::WeeklyReport),
            related_entity_id: Some(report_id),
            ..Default::default()
        },
    )
    .await
}

/// Posted when an administrator provisions a new account.
pub async fn account_created(pool: &SqlitePool, user_id: Uuid, name: &str) -> Result<Uuid, AppError> {
    create_for_user(
        pool,
        user_id,
        "Welcome to the SIWES Logbook",
        &format!("{name}, your account has been created. You can now record your daily activities."),
        NotifyOptions {
            related_entity_type: Some(RelatedEntityType::User),
            related_entity_id: Some(user_id),
            ..Default::default()
        },
    )
    .await
}
