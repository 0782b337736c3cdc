use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{require_role, Role};
use crate::errors::{AppError, AppResult};
use crate::jwt::Identity;
use crate::models::notification::{
    DbNotification, Notification, NotificationCreateRequest, NotificationType, Priority,
    NOTIFICATION_COLUMNS,
};
use crate::models::user::DbUser;
use crate::models::{page_window, Pagination};
use crate::notify::{self, NotifyOptions};
use crate::routes::auth::MessageResponse;
use crate::utils::utc_now;
use crate::validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationListQuery {
    pub is_read: Option<bool>,
    #[validate(range(min = 1, message = "page must be a positive integer"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationsPage {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationEnvelope {
    pub notification: Notification,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationMutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Caller's notifications, newest first", body = NotificationsPage))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<NotificationListQuery>,
) -> AppResult<Json<NotificationsPage>> {
    validate::check(&query)?;

    let (page, limit, offset) = page_window(query.page, query.limit);

    let (total, rows) = match query.is_read {
        Some(is_read) => {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM notifications WHERE user_id = ? AND is_read = ?",
            )
            .bind(identity.id.to_string())
            .bind(is_read)
            .fetch_one(&state.pool)
            .await?;
            let rows = sqlx::query_as::<_, DbNotification>(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? AND is_read = ? \
                 ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(identity.id.to_string())
            .bind(is_read)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
        None => {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM notifications WHERE user_id = ?")
                    .bind(identity.id.to_string())
                    .fetch_one(&state.pool)
                    .await?;
            let rows = sqlx::query_as::<_, DbNotification>(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? \
                 ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(identity.id.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
    };

    let notifications: Vec<Notification> = rows
        .into_iter()
        .map(Notification::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(NotificationsPage {
        notifications,
        pagination: Pagination::new(total, page, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Unread notification count", body = UnreadCountResponse))
)]
pub async fn unread_count(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread_count: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM notifications WHERE user_id = ? AND is_read = 0")
            .bind(identity.id.to_string())
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Single notification", body = NotificationEnvelope),
        (status = 403, description = "Not the owning user")
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationEnvelope>> {
    let notification = fetch_notification(&state, id).await?;

    if notification.user_id != identity.id {
        return Err(AppError::forbidden("access denied"));
    }

    Ok(Json(NotificationEnvelope { notification }))
}

#[utoipa::path(
    post,
    path = "/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    request_body = NotificationCreateRequest,
    responses(
        (status = 201, description = "Notification created, or broadcast to all active users", body = NotificationMutationResponse)
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<NotificationCreateRequest>,
) -> AppResult<(StatusCode, Json<NotificationMutationResponse>)> {
    require_role(&identity, &[Role::Admin])?;
    validate::check(&payload)?;

    let options = NotifyOptions {
        notification_type: payload.notification_type.unwrap_or(NotificationType::Info),
        priority: payload.priority.unwrap_or(Priority::Medium),
        action_url: payload.action_url.clone(),
        expires_at: payload.expires_at,
        ..Default::default()
    };

    match payload.user_id {
        Some(user_id) => {
            DbUser::by_id(&state.pool, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("user not found"))?;

            let id = notify::create_for_user(
                &state.pool,
                user_id,
                &payload.title,
                &payload.message,
                options,
            )
            .await?;
            let notification = fetch_notification(&state, id).await?;

            Ok((
                StatusCode::CREATED,
                Json(NotificationMutationResponse {
                    success: true,
                    message: "Notification created successfully".to_string(),
                    notification: Some(notification),
                    count: None,
                }),
            ))
        }
        None => {
            // admin broadcast to every active account
            let user_ids: Vec<String> =
                sqlx::query_scalar("SELECT id FROM users WHERE is_active = 1")
                    .fetch_all(&state.pool)
                    .await?;

            let mut count = 0i64;
            for user_id in user_ids {
                let user_id = Uuid::parse_str(&user_id)
                    .map_err(|err| AppError::internal(format!("malformed user id: {err}")))?;
                notify::create_for_user(
                    &state.pool,
                    user_id,
                    &payload.title,
                    &payload.message,
                    options.clone(),
                )
                .await?;
                count += 1;
            }

            Ok((
                StatusCode::CREATED,
                Json(NotificationMutationResponse {
                    success: true,
                    message: format!("Notification sent to {count} users"),
                    notification: None,
                    count: Some(count),
                }),
            ))
        }
    }
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "Marked as read", body = NotificationMutationResponse))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationMutationResponse>> {
    let mut notification = fetch_notification(&state, id).await?;

    if notification.user_id != identity.id {
        return Err(AppError::forbidden("access denied"));
    }

    let now = utc_now();
    sqlx::query("UPDATE notifications SET is_read = 1, read_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    notification.is_read = true;
    notification.read_at = Some(now);
    notification.updated_at = now;

    Ok(Json(NotificationMutationResponse {
        success: true,
        message: "Notification marked as read".to_string(),
        notification: Some(notification),
        count: None,
    }))
}

#[utoipa::path(
    put,
    path = "/notifications/mark-all-read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "All unread notifications marked as read", body = NotificationMutationResponse))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<NotificationMutationResponse>> {
    let now = utc_now();
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1, read_at = ?, updated_at = ? \
         WHERE user_id = ? AND is_read = 0",
    )
    .bind(now)
    .bind(now)
    .bind(identity.id.to_string())
    .execute(&state.pool)
    .await?;

    let count = result.rows_affected() as i64;

    Ok(Json(NotificationMutationResponse {
        success: true,
        message: format!("{count} notifications marked as read"),
        notification: None,
        count: Some(count),
    }))
}

#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "Notification deleted", body = MessageResponse))
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let notification = fetch_notification(&state, id).await?;

    if notification.user_id != identity.id && !identity.is_admin() {
        return Err(AppError::forbidden("access denied"));
    }

    sqlx::query("DELETE FROM notifications WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Notification deleted successfully".to_string(),
    }))
}

async fn fetch_notification(state: &AppState, id: Uuid) -> AppResult<Notification> {
    let row = DbNotification::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("notification not found"))?;
    row.try_into()
}
