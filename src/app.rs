use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, health, log_entries, notifications, users, weekly_reports};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    /// Password-less demo login; off in production unless DEMO_LOGIN overrides.
    pub demo_login: bool,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, demo_login: bool) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            demo_login,
        }
    }
}

fn demo_login_enabled() -> bool {
    match std::env::var("DEMO_LOGIN") {
        Ok(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        Err(_) => std::env::var("APP_ENV")
            .map(|env| env != "production")
            .unwrap_or(true),
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config, demo_login_enabled());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/demo-login", post(auth::demo_login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/change-password", put(auth::change_password));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/by-role/:role", get(users::users_by_role))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let log_entry_routes = Router::new()
        .route(
            "/",
            get(log_entries::list_log_entries).post(log_entries::create_log_entry),
        )
        .route("/student/:student_id", get(log_entries::student_log_entries))
        .route(
            "/:id",
            get(log_entries::get_log_entry)
                .put(log_entries::update_log_entry)
                .delete(log_entries::delete_log_entry),
        );

    let report_routes = Router::new()
        .route(
            "/",
            get(weekly_reports::list_reports).post(weekly_reports::create_report),
        )
        .route("/pending", get(weekly_reports::pending_reports))
        .route("/student/:student_id", get(weekly_reports::student_reports))
        .route(
            "/:id",
            get(weekly_reports::get_report)
                .put(weekly_reports::update_report)
                .delete(weekly_reports::delete_report),
        )
        .route("/:id/review", put(weekly_reports::review_report))
        .route(
            "/:id/industrial-comment",
            put(weekly_reports::industrial_comment),
        );

    let notification_routes = Router::new()
        .route(
            "/",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/unread-count", get(notifications::unread_count))
        .route("/mark-all-read", put(notifications::mark_all_read))
        .route(
            "/:id",
            get(notifications::get_notification).delete(notifications::delete_notification),
        )
        .route("/:id/read", put(notifications::mark_read));

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/log-entries", log_entry_routes)
        .nest("/weekly-reports", report_routes)
        .nest("/notifications", notification_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
