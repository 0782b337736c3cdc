use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{require_role, Role, ADMIN_OR_SUPERVISOR};
use crate::errors::{AppError, AppResult};
use crate::jwt::Identity;
use crate::lifecycle::{self, ReportPatch};
use crate::models::log_entry::{Attachment, AttachmentUpload};
use crate::models::profile::{DbStudentProfile, StudentProfile};
use crate::models::report::{
    DbWeeklyReport, IndustrialCommentRequest, ReportCreateRequest, ReportStatus,
    ReportUpdateRequest, ReviewRequest, WeeklyReport, REPORT_COLUMNS,
};
use crate::models::{page_window, Pagination};
use crate::notify;
use crate::routes::auth::MessageResponse;
use crate::utils::utc_now;
use crate::validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ReportListQuery {
    pub student_id: Option<Uuid>,
    pub status: Option<ReportStatus>,
    #[validate(range(min = 1, message = "page must be a positive integer"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportsPage {
    pub reports: Vec<WeeklyReport>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportsList {
    pub reports: Vec<WeeklyReport>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportEnvelope {
    pub report: WeeklyReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportMutationResponse {
    pub success: bool,
    pub message: String,
    pub report: WeeklyReport,
}

#[utoipa::path(
    get,
    path = "/weekly-reports",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Paginated reports, scoped by role", body = ReportsPage))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ReportListQuery>,
) -> AppResult<Json<ReportsPage>> {
    validate::check(&query)?;

    let (page, limit, offset) = page_window(query.page, query.limit);

    let scope = if identity.is_student() {
        Some(identity.id)
    } else {
        query.student_id
    };

    // the filter combinations stay enumerable: (student?, status?)
    let mut conditions = Vec::new();
    let mut binds: Vec<String> = Vec::new();
    if let Some(student_id) = scope {
        conditions.push("student_id = ?");
        binds.push(student_id.to_string());
    }
    if let Some(status) = query.status {
        conditions.push("status = ?");
        binds.push(status.as_str().to_string());
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(1) FROM weekly_reports{where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for bind in &binds {
        count_query = count_query.bind(bind);
    }
    let total = count_query.fetch_one(&state.pool).await?;

    let rows_sql = format!(
        "SELECT {REPORT_COLUMNS} FROM weekly_reports{where_clause} \
         ORDER BY week_number DESC, created_at DESC LIMIT ? OFFSET ?"
    );
    let mut rows_query = sqlx::query_as::<_, DbWeeklyReport>(&rows_sql);
    for bind in &binds {
        rows_query = rows_query.bind(bind);
    }
    let rows = rows_query.bind(limit).bind(offset).fetch_all(&state.pool).await?;

    let reports: Vec<WeeklyReport> = rows
        .into_iter()
        .map(WeeklyReport::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(ReportsPage {
        reports,
        pagination: Pagination::new(total, page, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/weekly-reports/pending",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Submitted reports awaiting review, scoped to the supervisor's students", body = ReportsList))
)]
pub async fn pending_reports(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<ReportsList>> {
    require_role(&identity, ADMIN_OR_SUPERVISOR)?;

    let rows = if identity.is_supervisor() {
        let supervisor_column = match identity.role {
            Role::AcademicSupervisor => "academic_supervisor_id",
            _ => "industrial_supervisor_id",
        };

        let student_ids: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT user_id FROM student_profiles WHERE {supervisor_column} = ?"
        ))
        .bind(identity.id.to_string())
        .fetch_all(&state.pool)
        .await?;

        if student_ids.is_empty() {
            return Ok(Json(ReportsList { reports: Vec::new() }));
        }

        let placeholders = vec!["?"; student_ids.len()].join(", ");
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM weekly_reports \
             WHERE status = 'submitted' AND student_id IN ({placeholders}) ORDER BY created_at ASC"
        );
        let mut query = sqlx::query_as::<_, DbWeeklyReport>(&sql);
        for id in &student_ids {
            query = query.bind(id);
        }
        query.fetch_all(&state.pool).await?
    } else {
        sqlx::query_as::<_, DbWeeklyReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM weekly_reports WHERE status = 'submitted' ORDER BY created_at ASC"
        ))
        .fetch_all(&state.pool)
        .await?
    };

    let reports: Vec<WeeklyReport> = rows
        .into_iter()
        .map(WeeklyReport::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(ReportsList { reports }))
}

#[utoipa::path(
    get,
    path = "/weekly-reports/student/{student_id}",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("student_id" = Uuid, Path, description = "Student user id")),
    responses((status = 200, description = "All reports for one student", body = ReportsList))
)]
pub async fn student_reports(
    State(state): State<AppState>,
    identity: Identity,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<ReportsList>> {
    if identity.is_student() && identity.id != student_id {
        return Err(AppError::forbidden("access denied"));
    }

    let rows = sqlx::query_as::<_, DbWeeklyReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM weekly_reports WHERE student_id = ? ORDER BY week_number DESC"
    ))
    .bind(student_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let reports: Vec<WeeklyReport> = rows
        .into_iter()
        .map(WeeklyReport::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(ReportsList { reports }))
}

#[utoipa::path(
    get,
    path = "/weekly-reports/{id}",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Single report", body = ReportEnvelope),
        (status = 404, description = "No such report")
    )
)]
pub async fn get_report(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReportEnvelope>> {
    let report = fetch_report(&state, id).await?;

    if identity.is_student() && identity.id != report.student_id {
        return Err(AppError::forbidden("access denied"));
    }

    Ok(Json(ReportEnvelope { report }))
}

#[utoipa::path(
    post,
    path = "/weekly-reports",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    request_body = ReportCreateRequest,
    responses(
        (status = 201, description = "Report created", body = ReportMutationResponse),
        (status = 409, description = "A report for this week already exists")
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ReportCreateRequest>,
) -> AppResult<(StatusCode, Json<ReportMutationResponse>)> {
    require_role(&identity, &[Role::Student])?;
    validate::check(&payload)?;

    ensure_week_available(&state, identity.id, payload.week_number, None).await?;

    let id = Uuid::new_v4();
    let now = utc_now();
    let status = payload.status.unwrap_or(ReportStatus::Draft);
    let attachments = stamp_attachments(payload.attachments.unwrap_or_default());

    let report = WeeklyReport {
        id,
        student_id: identity.id,
        week_number: payload.week_number,
        start_date: payload.start_date,
        end_date: payload.end_date,
        content: payload.content,
        status,
        supervisor_feedback: None,
        academic_feedback: None,
        academic_comment_date: None,
        industrial_supervisor_feedback: None,
        industrial_supervisor_id: None,
        industrial_comment_date: None,
        grade: None,
        attachments,
        submitted_at: None,
        reviewed_at: None,
        created_at: now,
        updated_at: now,
    };
    let report = lifecycle::initialize(report, now);

    sqlx::query(
        "INSERT INTO weekly_reports (id, student_id, week_number, start_date, end_date, content, \
         status, attachments, submitted_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(report.id.to_string())
    .bind(report.student_id.to_string())
    .bind(report.week_number)
    .bind(report.start_date)
    .bind(report.end_date)
    .bind(&report.content)
    .bind(report.status.as_str())
    .bind(encode_json(&report.attachments)?)
    .bind(report.submitted_at)
    .bind(report.created_at)
    .bind(report.updated_at)
    .execute(&state.pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReportMutationResponse {
            success: true,
            message: "Weekly report created successfully".to_string(),
            report,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/weekly-reports/{id}",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = ReportUpdateRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportMutationResponse),
        (status = 409, description = "Duplicate week or report already reviewed")
    )
)]
pub async fn update_report(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportUpdateRequest>,
) -> AppResult<Json<ReportMutationResponse>> {
    let report = fetch_report(&state, id).await?;
    ensure_can_modify(&identity, &report)?;
    validate::check(&payload)?;

    if let Some(week_number) = payload.week_number {
        if week_number != report.week_number {
            ensure_week_available(&state, report.student_id, week_number, Some(id)).await?;
        }
    }

    let mut patch = ReportPatch {
        week_number: payload.week_number,
        start_date: payload.start_date,
        end_date: payload.end_date,
        content: payload.content,
        status: payload.status,
    };
    // attachments are replaced wholesale, outside the state machine
    let attachments = payload.attachments.map(stamp_attachments);
    if patch.status == Some(ReportStatus::Submitted) && report.status == ReportStatus::Submitted {
        // idempotent re-submission keeps the original timestamp
        patch.status = None;
    }

    let mut updated = lifecycle::apply_update(report, patch, identity.role, utc_now())?;
    if let Some(attachments) = attachments {
        updated.attachments = attachments;
    }

    persist_report(&state, &updated).await?;

    Ok(Json(ReportMutationResponse {
        success: true,
        message: "Weekly report updated successfully".to_string(),
        report: updated,
    }))
}

#[utoipa::path(
    put,
    path = "/weekly-reports/{id}/review",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReportMutationResponse),
        (status = 403, description = "Not the assigned academic supervisor"),
        (status = 409, description = "Report not reviewable in its current state")
    )
)]
pub async fn review_report(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ReportMutationResponse>> {
    require_role(&identity, &[Role::AcademicSupervisor])?;
    validate::check(&payload)?;

    let report = fetch_report(&state, id).await?;
    let profile = student_profile(&state, report.student_id).await?;
    if profile.academic_supervisor_id != Some(identity.id) {
        return Err(AppError::forbidden(
            "you are not assigned as supervisor for this student",
        ));
    }

    let updated = lifecycle::academic_review(
        report,
        &payload.feedback,
        payload.grade,
        payload.decision,
        utc_now(),
    )?;

    persist_report(&state, &updated).await?;
    notify::supervisor_feedback(&state.pool, updated.student_id, updated.id, &identity.name).await?;

    Ok(Json(ReportMutationResponse {
        success: true,
        message: "Report reviewed successfully".to_string(),
        report: updated,
    }))
}

#[utoipa::path(
    put,
    path = "/weekly-reports/{id}/industrial-comment",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = IndustrialCommentRequest,
    responses(
        (status = 200, description = "Comment recorded", body = ReportMutationResponse),
        (status = 403, description = "Not the assigned industrial supervisor")
    )
)]
pub async fn industrial_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<IndustrialCommentRequest>,
) -> AppResult<Json<ReportMutationResponse>> {
    require_role(&identity, &[Role::IndustrialSupervisor])?;
    validate::check(&payload)?;

    let report = fetch_report(&state, id).await?;
    let profile = student_profile(&state, report.student_id).await?;
    if profile.industrial_supervisor_id != Some(identity.id) {
        return Err(AppError::forbidden(
            "you are not assigned as industrial supervisor for this student",
        ));
    }

    let updated = lifecycle::industrial_comment(report, &payload.feedback, identity.id, utc_now())?;

    persist_report(&state, &updated).await?;
    notify::supervisor_feedback(&state.pool, updated.student_id, updated.id, &identity.name).await?;

    Ok(Json(ReportMutationResponse {
        success: true,
        message: "Industrial supervisor comment added successfully".to_string(),
        report: updated,
    }))
}

#[utoipa::path(
    delete,
    path = "/weekly-reports/{id}",
    tag = "WeeklyReports",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report deleted", body = MessageResponse),
        (status = 409, description = "Only draft reports can be deleted")
    )
)]
pub async fn delete_report(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let report = fetch_report(&state, id).await?;
    ensure_can_modify(&identity, &report)?;
    lifecycle::ensure_deletable(&report, identity.role)?;

    sqlx::query("DELETE FROM weekly_reports WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Weekly report deleted successfully".to_string(),
    }))
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

/// Students act only on their own reports; supervisors use the review and
/// comment endpoints instead of plain updates.
fn ensure_can_modify(identity: &Identity, report: &WeeklyReport) -> AppResult<()> {
    match identity.role {
        Role::Admin => Ok(()),
        Role::Student if identity.id == report.student_id => Ok(()),
        Role::Student => Err(AppError::forbidden("access denied")),
        _ => Err(AppError::forbidden(
            "supervisors review reports through the review endpoints",
        )),
    }
}

async fn fetch_report(state: &AppState, id: Uuid) -> AppResult<WeeklyReport> {
    let row = DbWeeklyReport::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("weekly report not found"))?;
    row.try_into()
}

async fn student_profile(state: &AppState, student_id: Uuid) -> AppResult<StudentProfile> {
    let row = DbStudentProfile::by_user_id(&state.pool, student_id)
        .await?
        .ok_or_else(|| AppError::not_found("student profile not found"))?;
    row.try_into()
}

async fn ensure_week_available(
    state: &AppState,
    student_id: Uuid,
    week_number: i32,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = match exclude {
        Some(id) => sqlx::query_scalar(
            "SELECT COUNT(1) FROM weekly_reports WHERE student_id = ? AND week_number = ? AND id != ?",
        )
        .bind(student_id.to_string())
        .bind(week_number)
        .bind(id.to_string())
        .fetch_one(&state.pool)
        .await?,
        None => sqlx::query_scalar(
            "SELECT COUNT(1) FROM weekly_reports WHERE student_id = ? AND week_number = ?",
        )
        .bind(student_id.to_string())
        .bind(week_number)
        .fetch_one(&state.pool)
        .await?,
    };

    if count > 0 {
        return Err(AppError::conflict("report for this week already exists"));
    }
    Ok(())
}

async fn persist_report(state: &AppState, report: &WeeklyReport) -> AppResult<()> {
    sqlx::query(
        "UPDATE weekly_reports SET week_number = ?, start_date = ?, end_date = ?, content = ?, \
         status = ?, supervisor_feedback = ?, academic_feedback = ?, academic_comment_date = ?, \
         industrial_supervisor_feedback = ?, industrial_supervisor_id = ?, industrial_comment_date = ?, \
         grade = ?, attachments = ?, submitted_at = ?, reviewed_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(report.week_number)
    .bind(report.start_date)
    .bind(report.end_date)
    .bind(&report.content)
    .bind(report.status.as_str())
    .bind(&report.supervisor_feedback)
    .bind(&report.academic_feedback)
    .bind(report.academic_comment_date)
    .bind(&report.industrial_supervisor_feedback)
    .bind(report.industrial_supervisor_id.map(|id| id.to_string()))
    .bind(report.industrial_comment_date)
    .bind(report.grade.map(|grade| grade.as_str()))
    .bind(encode_json(&report.attachments)?)
    .bind(report.submitted_at)
    .bind(report.reviewed_at)
    .bind(report.updated_at)
    .bind(report.id.to_string())
    .execute(&state.pool)
    .await?;

    Ok(())
}
