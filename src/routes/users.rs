use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::assignment;
use crate::authz::{require_role, Role, ADMIN_OR_SUPERVISOR};
use crate::errors::{AppError, AppResult};
use crate::jwt::Identity;
use crate::models::profile::{DbStudentProfile, Level, StudentProfile};
use crate::models::user::{
    DbUser, User, UserCreateRequest, UserUpdateRequest, UserWithProfile, USER_COLUMNS,
};
use crate::models::{page_window, Pagination};
use crate::notify;
use crate::routes::auth::MessageResponse;
use crate::utils::{default_avatar_url, hash_password, utc_now};
use crate::validate;

/// Admin-created accounts that omit a password get this one; the owner is
/// expected to change it via /auth/change-password.
const DEFAULT_PASSWORD: &str = "password123";
const DEFAULT_DEPARTMENT: &str = "Computer Science";
const DEFAULT_PLACEMENT_DAYS: i64 = 120;

#[derive(Debug, Deserialize, Validate)]
pub struct UserListQuery {
    pub role: Option<Role>,
    #[validate(range(min = 1, message = "page must be a positive integer"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersPage {
    pub users: Vec<UserWithProfile>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersList {
    pub users: Vec<UserWithProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserWithProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserMutationResponse {
    pub success: bool,
    pub message: String,
    pub user: UserWithProfile,
}

/// Attach the one-to-one student profile when the user is a student.
pub(crate) async fn with_profile(pool: &SqlitePool, user: User) -> AppResult<UserWithProfile> {
    let student_profile = if user.role == Role::Student {
        DbStudentProfile::by_user_id(pool, user.id)
            .await?
            .map(StudentProfile::try_from)
            .transpose()?
    } else {
        None
    };

    Ok(UserWithProfile {
        user,
        student_profile,
    })
}

async fn attach_profiles(pool: &SqlitePool, rows: Vec<DbUser>) -> AppResult<Vec<UserWithProfile>> {
    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let user: User = row.try_into()?;
        users.push(with_profile(pool, user).await?);
    }
    Ok(users)
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Paginated user list", body = UsersPage))
)]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<UsersPage>> {
    require_role(&identity, &[Role::Admin])?;
    validate::check(&query)?;

    let (page, limit, offset) = page_window(query.page, query.limit);

    let (total, rows) = match query.role {
        Some(role) => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE role = ?")
                .bind(role.as_str())
                .fetch_one(&state.pool)
                .await?;
            let rows = sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(role.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users")
                .fetch_one(&state.pool)
                .await?;
            let rows = sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;
            (total, rows)
        }
    };

    Ok(Json(UsersPage {
        users: attach_profiles(&state.pool, rows).await?,
        pagination: Pagination::new(total, page, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/users/by-role/{role}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("role" = Role, Path, description = "Role to filter by")),
    responses((status = 200, description = "Active users with the role", body = UsersList))
)]
pub async fn users_by_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(role): Path<Role>,
) -> AppResult<Json<UsersList>> {
    require_role(&identity, ADMIN_OR_SUPERVISOR)?;

    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = ? AND is_active = 1 ORDER BY name ASC"
    ))
    .bind(role.as_str())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(UsersList {
        users: attach_profiles(&state.pool, rows).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = UserEnvelope),
        (status = 403, description = "Not the caller's own profile"),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserEnvelope>> {
    let db_user = DbUser::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if !identity.is_admin() && identity.id != id {
        return Err(AppError::forbidden("access denied"));
    }

    let user: User = db_user.try_into()?;
    Ok(Json(UserEnvelope {
        user: with_profile(&state.pool, user).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserMutationResponse),
        (status = 409, description = "Duplicate email or matric number")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<UserMutationResponse>)> {
    require_role(&identity, &[Role::Admin])?;
    validate::check(&payload)?;

    let email = payload.email.to_lowercase();
    ensure_email_available(&state.pool, &email, None).await?;

    // student-only requirements resolved before any write
    let student_fields = if payload.role == Role::Student {
        let matric_number = payload.matric_number.clone().ok_or_else(|| {
            AppError::validation_single(
                "matric_number",
                "required",
                "matric number is required for students",
            )
        })?;
        ensure_matric_available(&state.pool, &matric_number).await?;

        let start_date = payload.start_date.unwrap_or_else(|| utc_now().date_naive());
        let end_date = payload
            .end_date
            .unwrap_or(start_date + Duration::days(DEFAULT_PLACEMENT_DAYS));
        validate::check_date_range(start_date, end_date).map_err(|_| {
            AppError::validation_single("end_date", "date_range", "end date must be after start date")
        })?;

        Some((matric_number, start_date, end_date))
    } else {
        None
    };

    let password = payload.password.clone().unwrap_or_else(|| DEFAULT_PASSWORD.to_string());
    let password_hash = hash_password(&password)?;
    let profile_image = payload
        .profile_image
        .clone()
        .unwrap_or_else(|| default_avatar_url(&email));

    let user_id = Uuid::new_v4();
    let now = utc_now();

    // user + profile + counter bump commit or roll back together
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, profile_image, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(&payload.name)
    .bind(&email)
    .bind(password_hash)
    .bind(payload.role.as_str())
    .bind(&profile_image)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if let Some((matric_number, start_date, end_date)) = student_fields {
        let academic = assignment::next_supervisor(&mut tx, Role::AcademicSupervisor).await?;
        let industrial = assignment::next_supervisor(&mut tx, Role::IndustrialSupervisor).await?;

        let department = payload
            .department
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string());
        let level = payload.level.unwrap_or(Level::L300);
        let company = payload.company.clone().unwrap_or_else(|| {
            if industrial.is_some() {
                "Company TBD".to_string()
            } else {
                "No Company Assigned".to_string()
            }
        });

        sqlx::query(
            "INSERT INTO student_profiles (id, user_id, matric_number, department, level, company, \
             academic_supervisor_id, industrial_supervisor_id, start_date, end_date, is_active, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(&matric_number)
        .bind(&department)
        .bind(level.as_str())
        .bind(&company)
        .bind(academic.map(|id| id.to_string()))
        .bind(industrial.map(|id| id.to_string()))
        .bind(start_date)
        .bind(end_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    notify::account_created(&state.pool, user_id, &payload.name).await?;

    let db_user = DbUser::by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::internal("created user not found"))?;
    let user: User = db_user.try_into()?;

    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            success: true,
            message: "User created successfully".to_string(),
            user: with_profile(&state.pool, user).await?,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = UserMutationResponse),
        (status = 409, description = "Email already taken")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<UserMutationResponse>> {
    let db_user = DbUser::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if !identity.is_admin() && identity.id != id {
        return Err(AppError::forbidden("access denied"));
    }

    validate::check(&payload)?;

    let mut user: User = db_user.try_into()?;
    let now = utc_now();

    if let Some(name) = payload.name.as_ref() {
        user.name = name.clone();
    }
    if let Some(email) = payload.email.as_ref() {
        let email = email.to_lowercase();
        if email != user.email {
            ensure_email_available(&state.pool, &email, Some(id)).await?;
            user.email = email;
        }
    }
    if payload.profile_image.is_some() {
        user.profile_image = payload.profile_image.clone();
    }
    if let Some(is_active) = payload.is_active {
        if !identity.is_admin() {
            return Err(AppError::forbidden("only admins can change account status"));
        }
        user.is_active = is_active;
    }

    sqlx::query(
        "UPDATE users SET name = ?, email = ?, profile_image = ?, is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.profile_image)
    .bind(user.is_active)
    .bind(now)
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    if let Some(profile_patch) = payload.student_profile.as_ref() {
        update_profile(&state, &identity, &user, profile_patch).await?;
    }

    Ok(Json(UserMutationResponse {
        success: true,
        message: "User updated successfully".to_string(),
        user: with_profile(&state.pool, user).await?,
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 409, description = "Admin accounts cannot be deleted")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    require_role(&identity, &[Role::Admin])?;

    let db_user = DbUser::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if db_user.role == Role::Admin.as_str() {
        return Err(AppError::conflict("cannot delete admin users"));
    }

    // dependent rows (profile, logs, reports, notifications) cascade
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    }))
}

async fn update_profile(
    state: &AppState,
    identity: &Identity,
    user: &User,
    patch: &crate::models::user::ProfileUpdateRequest,
) -> AppResult<()> {
    if user.role != Role::Student {
        return Err(AppError::bad_request("user has no student profile"));
    }
    if patch.touches_assignment() && !identity.is_admin() {
        return Err(AppError::forbidden(
            "only admins can override supervisor assignments",
        ));
    }

    let db_profile = DbStudentProfile::by_user_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("student profile not found"))?;
    let mut profile: StudentProfile = db_profile.try_into()?;

    if let Some(department) = patch.department.as_ref() {
        profile.department = department.clone();
    }
    if let Some(level) = patch.level {
        profile.level = level;
    }
    if let Some(company) = patch.company.as_ref() {
        profile.company = company.clone();
    }
    if patch.company_address.is_some() {
        profile.company_address = patch.company_address.clone();
    }
    if patch.company_phone.is_some() {
        profile.company_phone = patch.company_phone.clone();
    }
    if patch.company_email.is_some() {
        profile.company_email = patch.company_email.clone();
    }
    // admin overrides never re-trigger round-robin
    if let Some(academic) = patch.academic_supervisor_id {
        profile.academic_supervisor_id = Some(academic);
    }
    if let Some(industrial) = patch.industrial_supervisor_id {
        profile.industrial_supervisor_id = Some(industrial);
    }
    if let Some(start_date) = patch.start_date {
        profile.start_date = start_date;
    }
    if let Some(end_date) = patch.end_date {
        profile.end_date = end_date;
    }
    if let Some(is_active) = patch.is_active {
        profile.is_active = is_active;
    }

    validate::check_date_range(profile.start_date, profile.end_date).map_err(|_| {
        AppError::validation_single("end_date", "date_range", "end date must be after start date")
    })?;

    sqlx::query(
        "UPDATE student_profiles SET department = ?, level = ?, company = ?, company_address = ?, \
         company_phone = ?, company_email = ?, academic_supervisor_id = ?, industrial_supervisor_id = ?, \
         start_date = ?, end_date = ?, is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&profile.department)
    .bind(profile.level.as_str())
    .bind(&profile.company)
    .bind(&profile.company_address)
    .bind(&profile.company_phone)
    .bind(&profile.company_email)
    .bind(profile.academic_supervisor_id.map(|id| id.to_string()))
    .bind(profile.industrial_supervisor_id.map(|id| id.to_string()))
    .bind(profile.start_date)
    .bind(profile.end_date)
    .bind(profile.is_active)
    .bind(utc_now())
    .bind(profile.id.to_string())
    .execute(&state.pool)
    .await?;

    Ok(())
}

async fn ensure_email_available(
    pool: &SqlitePool,
    email: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = match exclude {
        Some(id) => {
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(id.to_string())
                .fetch_one(pool)
                .await?
        }
        None => sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await?,
    };

    if count > 0 {
        return Err(AppError::conflict("user with this email already exists"));
    }
    Ok(())
}

async fn ensure_matric_available(pool: &SqlitePool, matric_number: &str) -> AppResult<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM student_profiles WHERE matric_number = ?")
            .bind(matric_number)
            .fetch_one(pool)
            .await?;

    if count > 0 {
        return Err(AppError::conflict(
            "student with this matric number already exists",
        ));
    }
    Ok(())
}
