use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::login,
        routes::auth::demo_login,
        routes::auth::me,
        routes::auth::logout,
        routes::auth::change_password,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::users_by_role,
        routes::users::get_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::log_entries::list_log_entries,
        routes::log_entries::student_log_entries,
        routes::log_entries::get_log_entry,
        routes::log_entries::create_log_entry,
        routes::log_entries::update_log_entry,
        routes::log_entries::delete_log_entry,
        routes::weekly_reports::list_reports,
        routes::weekly_reports::pending_reports,
        routes::weekly_reports::student_reports,
        routes::weekly_reports::get_report,
        routes::weekly_reports::create_report,
        routes::weekly_reports::update_report,
        routes::weekly_reports::review_report,
        routes::weekly_reports::industrial_comment,
        routes::weekly_reports::delete_report,
        routes::notifications::list_notifications,
        routes::notifications::unread_count,
        routes::notifications::get_notification,
        routes::notifications::create_notification,
        routes::notifications::mark_read,
        routes::notifications::mark_all_read,
        routes::notifications::delete_notification,
        routes::health::health,
    ),
    components(
        schemas(
            crate::authz::Role,
            crate::errors::FieldError,
            models::Pagination,
            models::user::User,
            models::user::UserWithProfile,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::DemoLoginRequest,
            models::user::ChangePasswordRequest,
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::user::ProfileUpdateRequest,
            models::profile::Level,
            models::profile::StudentProfile,
            models::log_entry::Mood,
            models::log_entry::LogType,
            models::log_entry::Attachment,
            models::log_entry::AttachmentUpload,
            models::log_entry::LogEntry,
            models::log_entry::LogEntryCreateRequest,
            models::log_entry::LogEntryUpdateRequest,
            models::report::ReportStatus,
            models::report::Grade,
            models::report::ReviewDecision,
            models::report::WeeklyReport,
            models::report::ReportCreateRequest,
            models::report::ReportUpdateRequest,
            models::report::ReviewRequest,
            models::report::IndustrialCommentRequest,
            models::notification::NotificationType,
            models::notification::Priority,
            models::notification::RelatedEntityType,
            models::notification::Notification,
            models::notification::NotificationCreateRequest,
            routes::auth::MessageResponse,
            routes::auth::MeResponse,
            routes::users::UsersPage,
            routes::users::UsersList,
            routes::users::UserEnvelope,
            routes::users::UserMutationResponse,
            routes::log_entries::LogEntriesPage,
            routes::log_entries::LogEntriesList,
            routes::log_entries::LogEntryEnvelope,
            routes::log_entries::LogEntryMutationResponse,
            routes::weekly_reports::ReportsPage,
            routes::weekly_reports::ReportsList,
            routes::weekly_reports::ReportEnvelope,
            routes::weekly_reports::ReportMutationResponse,
            routes::notifications::NotificationsPage,
            routes::notifications::NotificationEnvelope,
            routes::notifications::UnreadCountResponse,
            routes::notifications::NotificationMutationResponse,
            routes::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication and session endpoints"),
        (name = "Users", description = "User administration"),
        (name = "LogEntries", description = "Daily activity logs"),
        (name = "WeeklyReports", description = "Weekly reports and review workflow"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_routes() -> Router {
    let config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);

    Router::new().merge(
        SwaggerUi::new("/docs")
            .url("/api-docs/openapi.json", ApiDoc::openapi())
            .config(config),
    )
}
