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
    let db_path = dir.path().join("test_assignment.db");
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

async fn admin_token(pool: &SqlitePool, app: &Router) -> Result<String> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?, 'Root Admin', 'admin@example.com', ?, 'admin', 1, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(hash_password("admin123").map_err(|err| anyhow::anyhow!("{err}"))?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"email": "admin@example.com", "password": "admin123"})),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "admin login failed: {body}");
    Ok(body["token"].as_str().context("missing token")?.to_string())
}

/// Round-robin law: with N active supervisors of a role and N*k serialized
/// student creations, every supervisor ends up with exactly k students.
#[tokio::test]
async fn round_robin_distributes_students_evenly() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    let token = admin_token(&pool, &app).await?;

    // 3 academic supervisors, 2 industrial supervisors
    for i in 0..3 {
        let (status, _) = send(
            &app,
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "name": format!("Academic Supervisor {i}"),
                "email": format!("academic{i}@example.com"),
                "role": "academic_supervisor",
                "password": "password123"
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    for i in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "name": format!("Industrial Supervisor {i}"),
                "email": format!("industrial{i}@example.com"),
                "role": "industrial_supervisor",
                "password": "password123"
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    // 6 students, created one after another
    for i in 0..6 {
        let (status, body) = send(
            &app,
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "name": format!("Student {i}"),
                "email": format!("student{i}@example.com"),
                "role": "student",
                "password": "password123",
                "matric_number": format!("MAT1000{i}")
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED, "student {i} creation failed: {body}");
        assert!(body["user"]["student_profile"]["academic_supervisor_id"].is_string());
        assert!(body["user"]["student_profile"]["industrial_supervisor_id"].is_string());
    }

    // 6 students over 3 academic supervisors -> 2 each
    let academic_counts: Vec<i64> = sqlx::query_scalar(
        "SELECT COUNT(1) FROM student_profiles GROUP BY academic_supervisor_id",
    )
    .fetch_all(&pool)
    .await?;
    assert_eq!(academic_counts.len(), 3);
    assert!(academic_counts.iter().all(|count| *count == 2));

    // 6 students over 2 industrial supervisors -> 3 each
    let industrial_counts: Vec<i64> = sqlx::query_scalar(
        "SELECT COUNT(1) FROM student_profiles GROUP BY industrial_supervisor_id",
    )
    .fetch_all(&pool)
    .await?;
    assert_eq!(industrial_counts.len(), 2);
    assert!(industrial_counts.iter().all(|count| *count == 3));

    Ok(())
}

#[tokio::test]
async fn no_supervisors_means_no_assignment() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    let token = admin_token(&pool, &app).await?;

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(&token),
        Some(json!({
            "name": "Lone Student",
            "email": "lone@example.com",
            "role": "student",
            "password": "password123",
            "matric_number": "MAT99999"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user"]["student_profile"]["academic_supervisor_id"].is_null());
    assert!(body["user"]["student_profile"]["industrial_supervisor_id"].is_null());
    assert_eq!(body["user"]["student_profile"]["company"], "No Company Assigned");

    Ok(())
}

#[tokio::test]
async fn admin_override_does_not_advance_the_rotation() -> Result<()> {
    let (pool, app, _dir) = setup().await?;
    let token = admin_token(&pool, &app).await?;

    let mut supervisor_ids = Vec::new();
    for i in 0..2 {
        let (_, body) = send(
            &app,
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "name": format!("Academic Supervisor {i}"),
                "email": format!("academic{i}@example.com"),
                "role": "academic_supervisor",
                "password": "password123"
            })),
        )
        .await?;
        supervisor_ids.push(body["user"]["id"].as_str().context("id")?.to_string());
    }

    let (_, first) = send(
        &app,
        "POST",
        "/users",
        Some(&token),
        Some(json!({
            "name": "Student A",
            "email": "studenta@example.com",
            "role": "student",
            "password": "password123",
            "matric_number": "MAT20001"
        })),
    )
    .await?;
    let first_id = first["user"]["id"].as_str().context("id")?.to_string();
    let first_assigned = first["user"]["student_profile"]["academic_supervisor_id"]
        .as_str()
        .context("assignment")?
        .to_string();

    // override to the other supervisor
    let other = supervisor_ids
        .iter()
        .find(|id| **id != first_assigned)
        .context("other supervisor")?
        .clone();
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{first_id}"),
        Some(&token),
        Some(json!({"student_profile": {"academic_supervisor_id": other}})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // the next student still gets the next slot in the original rotation
    let (_, second) = send(
        &app,
        "POST",
        "/users",
        Some(&token),
        Some(json!({
            "name": "Student B",
            "email": "studentb@example.com",
            "role": "student",
            "password": "password123",
            "matric_number": "MAT20002"
        })),
    )
    .await?;
    let second_assigned = second["user"]["student_profile"]["academic_supervisor_id"]
        .as_str()
        .context("assignment")?;
    assert_ne!(second_assigned, first_assigned, "rotation should move to the other supervisor");

    Ok(())
}
