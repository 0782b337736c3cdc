pub mod auth;
pub mod health;
pub mod log_entries;
pub mod notifications;
pub mod users;
pub mod weekly_reports;
