use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;
use uuid::Uuid;

use siwes_logbook::create_app;
use siwes_logbook::utils::hash_password;

async fn setup() -> Result<(SqlitePool, Router, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_users.db");
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
async fn user_listing_is_admin_only() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "Root Admin", "admin@example.com", "admin").await?;
    insert_user(&pool, "John Doe", "student@example.com", "student").await?;

    let admin = login(&app, "admin@example.com").await?;
    let student = login(&app, "student@example.com").await?;

    let (status, body) = send(&app, "GET", "/users", Some(&student), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["user_role"], "student");
    assert_eq!(body["required_roles"], json!(["admin"]));

    let (status, body) = send(&app, "GET", "/users", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    // role filter
    let (status, body) = send(&app, "GET", "/users?role=student", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn duplicate_email_and_matric_are_conflicts() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "Root Admin", "admin@example.com", "admin").await?;
    let admin = login(&app, "admin@example.com").await?;

    let student = json!({
        "name": "John Doe",
        "email": "john@example.com",
        "role": "student",
        "password": "password123",
        "matric_number": "MAT12345"
    });
    let (status, _) = send(&app, "POST", "/users", Some(&admin), Some(student)).await?;
    assert_eq!(status, StatusCode::CREATED);

    // same email, case-insensitively
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(&admin),
        Some(json!({
            "name": "John Clone",
            "email": "John@Example.com",
            "role": "student",
            "password": "password123",
            "matric_number": "MAT99999"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // same matric number
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(&admin),
        Some(json!({
            "name": "Jane Roe",
            "email": "jane@example.com",
            "role": "student",
            "password": "password123",
            "matric_number": "MAT12345"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // students without a matric number are a validation error
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(&admin),
        Some(json!({
            "name": "No Matric",
            "email": "nomatric@example.com",
            "role": "student",
            "password": "password123"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "matric_number");

    Ok(())
}

#[tokio::test]
async fn admin_accounts_cannot_be_deleted() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "Root Admin", "admin@example.com", "admin").await?;
    let second_admin = insert_user(&pool, "Other Admin", "admin2@example.com", "admin").await?;
    let student_id = insert_user(&pool, "John Doe", "student@example.com", "student").await?;

    let admin = login(&app, "admin@example.com").await?;

    let (status, _) = send(&app, "DELETE", &format!("/users/{second_admin}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/users/{student_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/users/{student_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn users_see_their_own_profile_only() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    let john_id = insert_user(&pool, "John Doe", "john@example.com", "student").await?;
    let mary_id = insert_user(&pool, "Mary Major", "mary@example.com", "student").await?;

    let john = login(&app, "john@example.com").await?;

    let (status, body) = send(&app, "GET", &format!("/users/{john_id}"), Some(&john), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "john@example.com");

    let (status, _) = send(&app, "GET", &format!("/users/{mary_id}"), Some(&john), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn deactivation_invalidates_existing_tokens() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    insert_user(&pool, "Root Admin", "admin@example.com", "admin").await?;
    let student_id = insert_user(&pool, "John Doe", "student@example.com", "student").await?;

    let admin = login(&app, "admin@example.com").await?;
    let student = login(&app, "student@example.com").await?;

    // token works before deactivation
    let (status, _) = send(&app, "GET", "/auth/me", Some(&student), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{student_id}"),
        Some(&admin),
        Some(json!({"is_active": false})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // the still-valid token is now refused because the account is inactive
    let (status, body) = send(&app, "GET", "/auth/me", Some(&student), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap_or_default().contains("deactivated"));

    // students cannot flip the switch back themselves
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{student_id}"),
        Some(&student),
        Some(json!({"is_active": true})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn email_change_checks_uniqueness_excluding_self() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    let john_id = insert_user(&pool, "John Doe", "john@example.com", "student").await?;
    insert_user(&pool, "Mary Major", "mary@example.com", "student").await?;

    let john = login(&app, "john@example.com").await?;

    // unchanged email on self-update is fine
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{john_id}"),
        Some(&john),
        Some(json!({"name": "John A. Doe", "email": "john@example.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // taking mary's email is not
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{john_id}"),
        Some(&john),
        Some(json!({"email": "mary@example.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}
