use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use siwes_logbook::authz::Role;
use siwes_logbook::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "siwes-logbook migration and seed tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Populate the database with demo users, a student profile and sample records
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator
                .undo(&pool, 1)
                .await
                .context("no migrations were rolled back")?;
            println!("Rolled back last migration");
        }
        Commands::Seed => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            seed(&pool).await?;
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let table_exists = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    let applied_versions: HashSet<i64> = if table_exists.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter()
            .filter_map(|row| row.try_get::<i64, _>("version").ok())
            .collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) {
            "applied"
        } else {
            "pending"
        };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() { desc } else { "unknown" };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Try local ./migrations first (when running from repo root). If that
    // doesn't exist (common in containers where CWD differs), fall back to
    // the crate-local migrations folder determined by CARGO_MANIFEST_DIR.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}

async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    profile_image: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let password_hash =
        hash_password(password).map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, profile_image, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(profile_image)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        anyhow::bail!("database is not empty, refusing to seed");
    }

    println!("Seeding demo data...");

    let student = insert_user(
        pool,
        "John Doe",
        "john.doe@example.com",
        "student123",
        Role::Student,
        "https://randomuser.me/api/portraits/men/1.jpg",
    )
    .await?;
    let academic = insert_user(
        pool,
        "Dr. Jane Smith",
        "jane.smith@example.com",
        "academic123",
        Role::AcademicSupervisor,
        "https://randomuser.me/api/portraits/women/1.jpg",
    )
    .await?;
    let _admin = insert_user(
        pool,
        "Admin User",
        "admin@example.com",
        "admin123",
        Role::Admin,
        "https://randomuser.me/api/portraits/men/2.jpg",
    )
    .await?;
    let industrial = insert_user(
        pool,
        "Mr. Robert Johnson",
        "robert.johnson@techsolutions.com",
        "industrial123",
        Role::IndustrialSupervisor,
        "https://randomuser.me/api/portraits/men/3.jpg",
    )
    .await?;

    let today = Utc::now().date_naive();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO student_profiles (id, user_id, matric_number, department, level, company, \
         academic_supervisor_id, industrial_supervisor_id, start_date, end_date, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student.to_string())
    .bind("MAT12345")
    .bind("Computer Science")
    .bind("300")
    .bind("Tech Solutions Ltd")
    .bind(academic.to_string())
    .bind(industrial.to_string())
    .bind(today - Duration::days(30))
    .bind(today + Duration::days(60))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let log_entries = [
        (
            today - Duration::days(2),
            "Attended orientation and was introduced to the company structure. Met the development team and set up my workstation.",
        ),
        (
            today - Duration::days(1),
            "Shadowed a senior developer through the deployment pipeline and documented the steps for the team wiki.",
        ),
    ];
    for (date, content) in log_entries {
        sqlx::query(
            "INSERT INTO log_entries (id, student_id, date, content, attachments, tags, log_type, is_private, created_at, updated_at) \
             VALUES (?, ?, ?, ?, '[]', '[]', 'regular', 0, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(student.to_string())
        .bind(date)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "INSERT INTO weekly_reports (id, student_id, week_number, start_date, end_date, content, \
         status, attachments, submitted_at, created_at, updated_at) \
         VALUES (?, ?, 1, ?, ?, ?, 'submitted', '[]', ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student.to_string())
    .bind(today - Duration::days(7))
    .bind(today - Duration::days(1))
    .bind(
        "First week at the placement: completed onboarding, set up the development environment, \
         and delivered a small fix to the internal dashboard under supervision.",
    )
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    println!("Seeded 4 users, 1 student profile, 2 log entries, 1 weekly report");
    println!("Logins: john.doe@example.com/student123, jane.smith@example.com/academic123,");
    println!("        robert.johnson@techsolutions.com/industrial123, admin@example.com/admin123");

    Ok(())
}
