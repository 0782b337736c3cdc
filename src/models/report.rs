use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::log_entry::{Attachment, AttachmentUpload};

pub const REPORT_COLUMNS: &str = "id, student_id, week_number, start_date, end_date, content, \
     status, supervisor_feedback, academic_feedback, academic_comment_date, \
     industrial_supervisor_feedback, industrial_supervisor_id, industrial_comment_date, \
     grade, attachments, submitted_at, reviewed_at, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Reviewed,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<ReportStatus> {
        match value {
            "draft" => Some(ReportStatus::Draft),
            "submitted" => Some(ReportStatus::Submitted),
            "reviewed" => Some(ReportStatus::Reviewed),
            "approved" => Some(ReportStatus::Approved),
            "rejected" => Some(ReportStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn parse(value: &str) -> Option<Grade> {
        match value {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }
}

/// Explicit outcome an academic supervisor can attach to a review; a grade
/// implies approval, so the field only matters without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_number: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub content: String,
    pub status: ReportStatus,
    pub supervisor_feedback: Option<String>,
    pub academic_feedback: Option<String>,
    pub academic_comment_date: Option<DateTime<Utc>>,
    pub industrial_supervisor_feedback: Option<String>,
    pub industrial_supervisor_id: Option<Uuid>,
    pub industrial_comment_date: Option<DateTime<Utc>>,
    pub grade: Option<Grade>,
    pub attachments: Vec<Attachment>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbWeeklyReport {
    pub id: String,
    pub student_id: String,
    pub week_number: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub content: String,
    pub status: String,
    pub supervisor_feedback: Option<String>,
    pub academic_feedback: Option<String>,
    pub academic_comment_date: Option<DateTime<Utc>>,
    pub industrial_supervisor_feedback: Option<String>,
    pub industrial_supervisor_id: Option<String>,
    pub industrial_comment_date: Option<DateTime<Utc>>,
    pub grade: Option<String>,
    pub attachments: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbWeeklyReport {
    pub async fn by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DbWeeklyReport>, sqlx::Error> {
        sqlx::query_as::<_, DbWeeklyReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM weekly_reports WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
    }
}

impl TryFrom<DbWeeklyReport> for WeeklyReport {
    type Error = AppError;

    fn try_from(value: DbWeeklyReport) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("malformed report id {}: {err}", value.id)))?;
        let student_id = Uuid::parse_str(&value.student_id).map_err(|err| {
            AppError::internal(format!("malformed student id {}: {err}", value.student_id))
        })?;
        let status = ReportStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown report status {}", value.status)))?;
        let industrial_supervisor_id = value
            .industrial_supervisor_id
            .map(|id| {
                Uuid::parse_str(&id)
                    .map_err(|err| AppError::internal(format!("malformed supervisor id {id}: {err}")))
            })
            .transpose()?;
        let grade = value
            .grade
            .map(|grade| {
                Grade::parse(&grade)
                    .ok_or_else(|| AppError::internal(format!("unknown grade {grade}")))
            })
            .transpose()?;
        let attachments: Vec<Attachment> = serde_json::from_str(&value.attachments)
            .map_err(|err| AppError::internal(format!("malformed attachments json: {err}")))?;

        Ok(WeeklyReport {
            id,
            student_id,
            week_number: value.week_number,
            start_date: value.start_date,
            end_date: value.end_date,
            content: value.content,
            status,
            supervisor_feedback: value.supervisor_feedback,
            academic_feedback: value.academic_feedback,
            academic_comment_date: value.academic_comment_date,
            industrial_supervisor_feedback: value.industrial_supervisor_feedback,
            industrial_supervisor_id,
            industrial_comment_date: value.industrial_comment_date,
            grade,
            attachments,
            submitted_at: value.submitted_at,
            reviewed_at: value.reviewed_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn draft_or_submitted(status: &ReportStatus) -> Result<(), ValidationError> {
    match status {
        ReportStatus::Draft | ReportStatus::Submitted => Ok(()),
        _ => {
            let mut error = ValidationError::new("status");
            error.message = Some("status must be draft or submitted".into());
            Err(error)
        }
    }
}

fn create_dates(request: &ReportCreateRequest) -> Result<(), ValidationError> {
    crate::validate::check_date_range(request.start_date, request.end_date)
}

fn update_dates(request: &ReportUpdateRequest) -> Result<(), ValidationError> {
    // only checkable here when both ends are in the payload; the merged record
    // is re-checked by the lifecycle engine
    if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
        crate::validate::check_date_range(start, end)?;
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = create_dates, skip_on_field_errors = false))]
pub struct ReportCreateRequest {
    #[schema(example = 1)]
    #[validate(range(min = 1, max = 52, message = "week number must be between 1 and 52"))]
    pub week_number: i32,
    #[schema(example = "2026-08-03")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-08-07")]
    pub end_date: NaiveDate,
    #[validate(length(min = 50, max = 10000, message = "content must be 50-10000 characters"))]
    pub content: String,
    /// Only draft or submitted may be set at creation.
    #[validate(custom(function = draft_or_submitted))]
    pub status: Option<ReportStatus>,
    pub attachments: Option<Vec<AttachmentUpload>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = update_dates, skip_on_field_errors = false))]
pub struct ReportUpdateRequest {
    #[validate(range(min = 1, max = 52, message = "week number must be between 1 and 52"))]
    pub week_number: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 50, max = 10000, message = "content must be 50-10000 characters"))]
    pub content: Option<String>,
    #[validate(custom(function = draft_or_submitted))]
    pub status: Option<ReportStatus>,
    pub attachments: Option<Vec<AttachmentUpload>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    #[validate(length(min = 10, max = 2000, message = "feedback must be 10-2000 characters"))]
    pub feedback: String,
    pub grade: Option<Grade>,
    pub decision: Option<ReviewDecision>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IndustrialCommentRequest {
    #[validate(length(min = 10, max = 2000, message = "feedback must be 10-2000 characters"))]
    pub feedback: String,
}
