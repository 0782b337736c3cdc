use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

pub const PROFILE_COLUMNS: &str = "id, user_id, matric_number, department, level, company, \
     academic_supervisor_id, industrial_supervisor_id, start_date, end_date, \
     company_address, company_phone, company_email, is_active, created_at, updated_at";

/// Academic level, stored as its string form ("100".."500").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Level {
    #[serde(rename = "100")]
    L100,
    #[serde(rename = "200")]
    L200,
    #[serde(rename = "300")]
    L300,
    #[serde(rename = "400")]
    L400,
    #[serde(rename = "500")]
    L500,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::L100 => "100",
            Level::L200 => "200",
            Level::L300 => "300",
            Level::L400 => "400",
            Level::L500 => "500",
        }
    }

    pub fn parse(value: &str) -> Option<Level> {
        match value {
            "100" => Some(Level::L100),
            "200" => Some(Level::L200),
            "300" => Some(Level::L300),
            "400" => Some(Level::L400),
            "500" => Some(Level::L500),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub matric_number: String,
    pub department: String,
    pub level: Level,
    pub company: String,
    pub academic_supervisor_id: Option<Uuid>,
    pub industrial_supervisor_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub company_address: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbStudentProfile {
    pub id: String,
    pub user_id: String,
    pub matric_number: String,
    pub department: String,
    pub level: String,
    pub company: String,
    pub academic_supervisor_id: Option<String>,
    pub industrial_supervisor_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub company_address: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbStudentProfile {
    pub async fn by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<DbStudentProfile>, sqlx::Error> {
        sqlx::query_as::<_, DbStudentProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM student_profiles WHERE user_id = ?"
        ))
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|err| AppError::internal(format!("malformed {what} {value}: {err}")))
}

fn parse_optional_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>, AppError> {
    value.map(|value| parse_uuid(&value, what)).transpose()
}

impl TryFrom<DbStudentProfile> for StudentProfile {
    type Error = AppError;

    fn try_from(value: DbStudentProfile) -> Result<Self, Self::Error> {
        let level = Level::parse(&value.level)
            .ok_or_else(|| AppError::internal(format!("unknown level {}", value.level)))?;

        Ok(StudentProfile {
            id: parse_uuid(&value.id, "profile id")?,
            user_id: parse_uuid(&value.user_id, "profile user id")?,
            matric_number: value.matric_number,
            department: value.department,
            level,
            company: value.company,
            academic_supervisor_id: parse_optional_uuid(
                value.academic_supervisor_id,
                "academic supervisor id",
            )?,
            industrial_supervisor_id: parse_optional_uuid(
                value.industrial_supervisor_id,
                "industrial supervisor id",
            )?,
            start_date: value.start_date,
            end_date: value.end_date,
            company_address: value.company_address,
            company_phone: value.company_phone,
            company_email: value.company_email,
            is_active: value.is_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
