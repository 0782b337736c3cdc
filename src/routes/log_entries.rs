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
use crate::models::log_entry::{
    Attachment, AttachmentUpload, DbLogEntry, LogEntry, LogEntryCreateRequest,
    LogEntryUpdateRequest, LogType, LOG_ENTRY_COLUMNS,
};
use crate::models::{page_window, Pagination};
use crate::routes::auth::MessageResponse;
use crate::utils::utc_now;
use crate::validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LogListQuery {
    pub student_id: Option<Uuid>,
    #[validate(range(min = 1, message = "page must be a positive integer"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntriesPage {
    pub log_entries: Vec<LogEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntriesList {
    pub log_entries: Vec<LogEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntryEnvelope {
    pub log_entry: LogEntry,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntryMutationResponse {
    pub success: bool,
    pub message: String,
    pub log_entry: LogEntry,
}

fn stamp_attachments(uploads: Vec<AttachmentUpload>) -> Vec<Attachment> {
    let now = utc_now();
    uploads
        .into_iter()
        .map(|upload| Attachment {
            filename: upload.filename,
            original_name: upload.original_name,
            size: upload.size,
            uploaded_at: now,
        })
        .collect()
}

fn encode_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|err| AppError::internal(format!("failed to encode json column: {err}")))
}

/// Students act only on their own entries; supervisors are read-only; admin
/// passes everything.
fn ensure_can_modify(identity: &Identity, entry: &LogEntry) -> AppResult<()> {
    match identity.role {
        Role::Admin => Ok(()),
        Role::Student if identity.id == entry.student_id => Ok(()),
        Role::Student => Err(AppError::forbidden("access denied")),
        _ => Err(AppError::forbidden("supervisors cannot modify log entries")),
    }
}

fn ensure_can_view(identity: &Identity, entry: &LogEntry) -> AppResult<()> {
    if identity.is_student() && identity.id != entry.student_id {
        return Err(AppError::forbidden("access denied"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/log-entries",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Paginated log entries, scoped by role", body = LogEntriesPage))
)]
pub async fn list_log_entries(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<LogListQuery>,
) -> AppResult<Json<LogEntriesPage>> {
    validate::check(&query)?;

    let (page, limit, offset) = page_window(query.page, query.limit);

    // students only ever see their own entries
    let scope = if identity.is_student() {
        Some(identity.id)
    } else {
        query.student_id
    };

    let (total, rows) = match scope {
        Some(student_id) => {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM log_entries WHERE student_id = ?")
                    .bind(student_id.to_string())
                    .fetch_one(&state.pool)
                    .await?;
            let rows = sqlx::query_as::<_, DbLogEntry>(&format!(
                "SELECT {LOG_ENTRY_COLUMNS} FROM log_entries WHERE student_id = ? \
                 ORDER BY date DESC, created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(student_id.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM log_entries")
                .fetch_one(&state.pool)
                .await?;
            let rows = sqlx::query_as::<_, DbLogEntry>(&format!(
                "SELECT {LOG_ENTRY_COLUMNS} FROM log_entries \
                 ORDER BY date DESC, created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
    };

    let log_entries: Vec<LogEntry> = rows
        .into_iter()
        .map(LogEntry::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(LogEntriesPage {
        log_entries,
        pagination: Pagination::new(total, page, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/log-entries/student/{student_id}",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    params(("student_id" = Uuid, Path, description = "Student user id")),
    responses((status = 200, description = "All entries for one student", body = LogEntriesList))
)]
pub async fn student_log_entries(
    State(state): State<AppState>,
    identity: Identity,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<LogEntriesList>> {
    if identity.is_student() && identity.id != student_id {
        return Err(AppError::forbidden("access denied"));
    }

    let rows = sqlx::query_as::<_, DbLogEntry>(&format!(
        "SELECT {LOG_ENTRY_COLUMNS} FROM log_entries WHERE student_id = ? \
         ORDER BY date DESC, created_at DESC"
    ))
    .bind(student_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let log_entries: Vec<LogEntry> = rows
        .into_iter()
        .map(LogEntry::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(LogEntriesList { log_entries }))
}

#[utoipa::path(
    get,
    path = "/log-entries/{id}",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Log entry id")),
    responses(
        (status = 200, description = "Single log entry", body = LogEntryEnvelope),
        (status = 404, description = "No such entry")
    )
)]
pub async fn get_log_entry(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LogEntryEnvelope>> {
    let entry = fetch_log_entry(&state, id).await?;
    ensure_can_view(&identity, &entry)?;

    Ok(Json(LogEntryEnvelope { log_entry: entry }))
}

#[utoipa::path(
    post,
    path = "/log-entries",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    request_body = LogEntryCreateRequest,
    responses(
        (status = 201, description = "Log entry created", body = LogEntryMutationResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Only students create log entries")
    )
)]
pub async fn create_log_entry(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<LogEntryCreateRequest>,
) -> AppResult<(StatusCode, Json<LogEntryMutationResponse>)> {
    require_role(&identity, &[Role::Student])?;
    validate::check(&payload)?;

    let id = Uuid::new_v4();
    let now = utc_now();
    let attachments = stamp_attachments(payload.attachments.unwrap_or_default());
    let tags = payload.tags.unwrap_or_default();
    let log_type = payload.log_type.unwrap_or(LogType::Regular);

    sqlx::query(
        "INSERT INTO log_entries (id, student_id, date, content, attachments, tags, mood, \
         hours_worked, log_type, is_private, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(identity.id.to_string())
    .bind(payload.date)
    .bind(&payload.content)
    .bind(encode_json(&attachments)?)
    .bind(encode_json(&tags)?)
    .bind(payload.mood.map(|mood| mood.as_str()))
    .bind(payload.hours_worked)
    .bind(log_type.as_str())
    .bind(payload.is_private.unwrap_or(false))
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let entry = fetch_log_entry(&state, id).await?;

    Ok((
        StatusCode::CREATED,
        Json(LogEntryMutationResponse {
            success: true,
            message: "Log entry created successfully".to_string(),
            log_entry: entry,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/log-entries/{id}",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Log entry id")),
    request_body = LogEntryUpdateRequest,
    responses(
        (status = 200, description = "Log entry updated", body = LogEntryMutationResponse),
        (status = 403, description = "Not the owning student")
    )
)]
pub async fn update_log_entry(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<LogEntryUpdateRequest>,
) -> AppResult<Json<LogEntryMutationResponse>> {
    let mut entry = fetch_log_entry(&state, id).await?;
    ensure_can_modify(&identity, &entry)?;
    validate::check(&payload)?;

    if let Some(date) = payload.date {
        entry.date = date;
    }
    if let Some(content) = payload.content {
        entry.content = content;
    }
    if let Some(attachments) = payload.attachments {
        entry.attachments = stamp_attachments(attachments);
    }
    if let Some(tags) = payload.tags {
        entry.tags = tags;
    }
    if payload.mood.is_some() {
        entry.mood = payload.mood;
    }
    if payload.hours_worked.is_some() {
        entry.hours_worked = payload.hours_worked;
    }
    if let Some(log_type) = payload.log_type {
        entry.log_type = log_type;
    }
    if let Some(is_private) = payload.is_private {
        entry.is_private = is_private;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE log_entries SET date = ?, content = ?, attachments = ?, tags = ?, mood = ?, \
         hours_worked = ?, log_type = ?, is_private = ?, updated_at = ? WHERE id = ?",
    )
    .bind(entry.date)
    .bind(&entry.content)
    .bind(encode_json(&entry.attachments)?)
    .bind(encode_json(&entry.tags)?)
    .bind(entry.mood.map(|mood| mood.as_str()))
    .bind(entry.hours_worked)
    .bind(entry.log_type.as_str())
    .bind(entry.is_private)
    .bind(now)
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    entry.updated_at = now;

    Ok(Json(LogEntryMutationResponse {
        success: true,
        message: "Log entry updated successfully".to_string(),
        log_entry: entry,
    }))
}

#[utoipa::path(
    delete,
    path = "/log-entries/{id}",
    tag = "LogEntries",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Log entry id")),
    responses(
        (status = 200, description = "Log entry deleted", body = MessageResponse),
        (status = 403, description = "Not the owning student")
    )
)]
pub async fn delete_log_entry(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let entry = fetch_log_entry(&state, id).await?;
    ensure_can_modify(&identity, &entry)?;

    sqlx::query("DELETE FROM log_entries WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Log entry deleted successfully".to_string(),
    }))
}

async fn fetch_log_entry(state: &AppState, id: Uuid) -> AppResult<LogEntry> {
    let row = DbLogEntry::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("log entry not found"))?;
    row.try_into()
}
