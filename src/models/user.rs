use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::authz::Role;
use crate::errors::AppError;
use crate::models::profile::{Level, StudentProfile};

pub const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, profile_image, is_active, last_login_at, created_at, updated_at";

/// API-facing user; the password hash never leaves the row struct.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    pub async fn by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DbUser>, sqlx::Error> {
        sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(pool)
            .await
    }

    /// Emails are stored lowercased; callers must lowercase before lookup.
    pub async fn by_email(pool: &SqlitePool, email: &str) -> Result<Option<DbUser>, sqlx::Error> {
        sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("malformed user id {}: {err}", value.id)))?;
        let role = Role::parse(&value.role)
            .ok_or_else(|| AppError::internal(format!("unknown role {}", value.role)))?;

        Ok(User {
            id,
            name: value.name,
            email: value.email,
            role,
            profile_image: value.profile_image,
            is_active: value.is_active,
            last_login_at: value.last_login_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// User plus the one-to-one student profile, present for students only.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub student_profile: Option<StudentProfile>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "john.doe@example.com")]
    #[validate(email(message = "please provide a valid email"))]
    pub email: String,
    #[schema(example = "student123")]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// When supplied, the login fails unless the account has this role.
    pub expected_role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DemoLoginRequest {
    #[schema(example = "student")]
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "new password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserWithProfile,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserCreateRequest {
    #[schema(example = "Ada Lovelace")]
    #[validate(length(min = 2, max = 100, message = "name must be 2-100 characters"))]
    pub name: String,
    #[schema(example = "ada@example.com")]
    #[validate(email(message = "please provide a valid email"))]
    pub email: String,
    pub role: Role,
    /// Admin-created accounts default to "password123" when omitted.
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(url(message = "profile image must be a valid URL"))]
    pub profile_image: Option<String>,

    // student-only fields, required/used when role == student
    #[validate(length(min = 5, max = 20, message = "matric number must be 5-20 characters"))]
    pub matric_number: Option<String>,
    #[validate(length(min = 2, max = 100, message = "department must be 2-100 characters"))]
    pub department: Option<String>,
    pub level: Option<Level>,
    #[validate(length(min = 2, max = 200, message = "company must be 2-200 characters"))]
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserUpdateRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "please provide a valid email"))]
    pub email: Option<String>,
    #[validate(url(message = "profile image must be a valid URL"))]
    pub profile_image: Option<String>,
    /// Soft-disable switch; admin only.
    pub is_active: Option<bool>,
    /// Student profile fields; supervisor overrides are admin only.
    #[validate(nested)]
    pub student_profile: Option<ProfileUpdateRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 2, max = 100, message = "department must be 2-100 characters"))]
    pub department: Option<String>,
    pub level: Option<Level>,
    #[validate(length(min = 2, max = 200, message = "company must be 2-200 characters"))]
    pub company: Option<String>,
    pub company_address: Option<String>,
    #[validate(length(min = 10, max = 20, message = "company phone must be 10-20 characters"))]
    pub company_phone: Option<String>,
    #[validate(email(message = "company email must be a valid email"))]
    pub company_email: Option<String>,
    pub academic_supervisor_id: Option<Uuid>,
    pub industrial_supervisor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl ProfileUpdateRequest {
    pub fn touches_assignment(&self) -> bool {
        self.academic_supervisor_id.is_some() || self.industrial_supervisor_id.is_some()
    }
}
