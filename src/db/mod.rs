//! Database access layer
//!
//! SQLite via sqlx. The schema is created idempotently at startup; every
//! `create_*_table` uses CREATE TABLE IF NOT EXISTS so repeated startups are
//! safe.

use crate::error::ApiResult;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub mod goals;
pub mod sessions;
pub mod soap_notes;
pub mod students;
pub mod users;

/// Open (or create) the database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> ApiResult<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| crate::error::ApiError::Internal(format!("create data dir: {}", e)))?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database for tests
pub async fn init_memory_database() -> ApiResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    // WAL allows concurrent readers while a request writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;
    Ok(())
}

/// Run all idempotent schema statements
pub async fn create_schema(pool: &SqlitePool) -> ApiResult<()> {
    create_students_table(pool).await?;
    create_goals_table(pool).await?;
    create_sessions_table(pool).await?;
    create_soap_notes_table(pool).await?;
    create_users_table(pool).await?;
    create_auth_tokens_table(pool).await?;
    Ok(())
}

async fn create_students_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            preferred_name TEXT,
            pronouns TEXT,
            grade_level TEXT,
            monthly_services INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            anonymized INTEGER NOT NULL DEFAULT 0,
            anonymized_at TEXT,
            anonymous_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_goals_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS goals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            completion_criteria TEXT,
            target_date TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            session_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            event_type TEXT NOT NULL DEFAULT 'Session',
            session_type TEXT NOT NULL DEFAULT 'Individual',
            status TEXT NOT NULL DEFAULT 'Scheduled',
            location TEXT,
            notes TEXT,
            plan_notes TEXT,
            is_makeup INTEGER NOT NULL DEFAULT 0,
            makeup_for_session_id INTEGER REFERENCES sessions(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_student_date
         ON sessions(student_id, session_date)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_soap_notes_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS soap_notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            session_id INTEGER REFERENCES sessions(id),
            session_date TEXT NOT NULL,
            subjective TEXT,
            objective TEXT,
            assessment TEXT,
            plan TEXT,
            clinician_signature TEXT,
            anonymized INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_soap_notes_student_date
         ON soap_notes(student_id, session_date)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'clinician',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_auth_tokens_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
