use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;
use uuid::Uuid;

use siwes_logbook::create_app;
use siwes_logbook::utils::hash_password;

async fn setup() -> Result<(SqlitePool, Router, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_logs.db");
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((pool, app, dir))
}

async fn insert_user(pool: &SqlitePool, name: &str, email: &str, role: &str) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(hash_password("password123").map_err(|err| anyhow::anyhow!("{err}"))?)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(request).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

async fn login(app: &Router, email: &str) -> Result<String> {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": email, "password": "password123"})),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed for {email}: {body}");
    Ok(body["token"].as_str().context("missing token")?.to_string())
}

#[tokio::test]
async fn validation_violations_are_collected() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "John Doe", "student@example.com", "student").await?;
    let token = login(&app, "student@example.com").await?;

    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/log-entries",
        Some(&token),
        Some(json!({
            "date": tomorrow,
            "content": "short",
            "hours_worked": 30.0
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");

    let details = body["details"].as_array().context("missing details")?;
    assert_eq!(details.len(), 3, "all three violations reported: {details:?}");
    assert!(details.iter().any(|d| d["field"] == "date" && d["rule"] == "not_future"));
    assert!(details.iter().any(|d| d["field"] == "content" && d["rule"] == "length"));
    assert!(details.iter().any(|d| d["field"] == "hours_worked" && d["rule"] == "range"));

    Ok(())
}

#[tokio::test]
async fn students_are_scoped_to_their_own_entries() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "John Doe", "john@example.com", "student").await?;
    insert_user(&pool, "Mary Major", "mary@example.com", "student").await?;
    insert_user(&pool, "Root Admin", "admin@example.com", "admin").await?;

    let john = login(&app, "john@example.com").await?;
    let mary = login(&app, "mary@example.com").await?;
    let admin = login(&app, "admin@example.com").await?;

    let today = Utc::now().date_naive().to_string();
    let (status, created) = send(
        &app,
        "POST",
        "/log-entries",
        Some(&john),
        Some(json!({"date": today, "content": "worked on the data import scripts"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let entry_id = created["log_entry"]["id"].as_str().context("id")?.to_string();

    // mary's listing is empty; john's has one entry
    let (_, listing) = send(&app, "GET", "/log-entries", Some(&mary), None).await?;
    assert_eq!(listing["log_entries"].as_array().map(Vec::len), Some(0));
    let (_, listing) = send(&app, "GET", "/log-entries", Some(&john), None).await?;
    assert_eq!(listing["log_entries"].as_array().map(Vec::len), Some(1));
    assert_eq!(listing["pagination"]["total"], 1);

    // mary cannot read, update or delete john's entry
    let (status, _) = send(&app, "GET", &format!("/log-entries/{entry_id}"), Some(&mary), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/log-entries/{entry_id}"),
        Some(&mary),
        Some(json!({"content": "rewriting someone else's log"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/log-entries/{entry_id}"), Some(&mary), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // admin can delete
    let (status, _) = send(&app, "DELETE", &format!("/log-entries/{entry_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn only_students_create_entries() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "Dr. Jane Smith", "academic@example.com", "academic_supervisor").await?;
    let token = login(&app, "academic@example.com").await?;

    let today = Utc::now().date_naive().to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/log-entries",
        Some(&token),
        Some(json!({"date": today, "content": "a supervisor trying to write a log"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["user_role"], "academic_supervisor");

    Ok(())
}

#[tokio::test]
async fn attachments_round_trip_with_upload_timestamps() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "John Doe", "student@example.com", "student").await?;
    let token = login(&app, "student@example.com").await?;

    let today = Utc::now().date_naive().to_string();
    let (status, created) = send(
        &app,
        "POST",
        "/log-entries",
        Some(&token),
        Some(json!({
            "date": today,
            "content": "captured the network diagram for the report",
            "attachments": [{"filename": "diagram-1a2b.png", "original_name": "diagram.png", "size": 20480}],
            "tags": ["networking", "documentation"],
            "mood": "good",
            "hours_worked": 7.5
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    let entry = &created["log_entry"];
    assert_eq!(entry["attachments"][0]["original_name"], "diagram.png");
    assert!(entry["attachments"][0]["uploaded_at"].is_string());
    assert_eq!(entry["tags"], json!(["networking", "documentation"]));
    assert_eq!(entry["mood"], "good");
    assert_eq!(entry["type"], "regular");

    Ok(())
}
