use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::Identity;
use crate::models::user::{
    AuthResponse, ChangePasswordRequest, DbUser, DemoLoginRequest, LoginRequest, User,
    UserWithProfile, USER_COLUMNS,
};
use crate::routes::users::with_profile;
use crate::utils::{hash_password, utc_now, verify_password};
use crate::validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserWithProfile,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials, deactivated account or role mismatch")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    validate::check(&payload)?;

    let email = payload.email.to_lowercase();
    let db_user = DbUser::by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !db_user.is_active {
        return Err(AppError::unauthorized("account is deactivated"));
    }

    if !verify_password(&payload.password, &db_user.password_hash)? {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;

    if let Some(expected) = payload.expected_role {
        if user.role != expected {
            return Err(AppError::unauthorized(format!(
                "this account is not registered as a {}",
                expected.readable()
            )));
        }
    }

    touch_last_login(&state, &user).await?;

    let token = state.jwt.encode(user.id, &user.email, user.role)?;
    let user = with_profile(&state.pool, user).await?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/demo-login",
    tag = "Auth",
    request_body = DemoLoginRequest,
    responses(
        (status = 200, description = "Logged in as the first active user of the role", body = AuthResponse),
        (status = 403, description = "Demo login disabled"),
        (status = 404, description = "No active user with the role")
    )
)]
pub async fn demo_login(
    State(state): State<AppState>,
    Json(payload): Json<DemoLoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    if !state.demo_login {
        return Err(AppError::forbidden("demo login is disabled"));
    }

    let db_user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = ? AND is_active = 1 ORDER BY created_at ASC LIMIT 1"
    ))
    .bind(payload.role.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("no {} user found", payload.role.readable())))?;

    let user: User = db_user.try_into()?;
    touch_last_login(&state, &user).await?;

    let token = state.jwt.encode(user.id, &user.email, user.role)?;
    let user = with_profile(&state.pool, user).await?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Current user", body = MeResponse))
)]
pub async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<MeResponse>> {
    let db_user = DbUser::by_id(&state.pool, identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let user: User = db_user.try_into()?;
    let user = with_profile(&state.pool, user).await?;

    Ok(Json(MeResponse { user }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Logout acknowledged", body = MessageResponse))
)]
pub async fn logout(_identity: Identity) -> AppResult<Json<MessageResponse>> {
    // stateless tokens: logout is client-side discard
    Ok(Json(MessageResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/auth/change-password",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password incorrect")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate::check(&payload)?;

    let db_user = DbUser::by_id(&state.pool, identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if !verify_password(&payload.current_password, &db_user.password_hash)? {
        return Err(AppError::bad_request("current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(utc_now())
        .bind(identity.id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Password changed successfully".to_string(),
    }))
}

async fn touch_last_login(state: &AppState, user: &User) -> AppResult<()> {
    let now = utc_now();
    sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(user.id.to_string())
        .execute(&state.pool)
        .await?;
    Ok(())
}
