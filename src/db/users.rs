//! User account and bearer token queries

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User};

/// Bearer token lifetime
pub const TOKEN_TTL_HOURS: i64 = 8;

pub async fn insert(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> ApiResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, role, active, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Conflict("username or email already in use".to_string())
        }
        other => other.into(),
    })?;
    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? AND active = 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn insert_token(pool: &SqlitePool, token: &str, user_id: i64) -> ApiResult<DateTime<Utc>> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);
    sqlx::query("INSERT INTO auth_tokens (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(expires_at)
}

/// Resolve a bearer token to its user. Expired tokens are deleted on sight.
pub async fn find_user_by_token(pool: &SqlitePool, token: &str) -> ApiResult<Option<User>> {
    let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        "SELECT user_id, expires_at FROM auth_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at <= Utc::now() {
        delete_token(pool, token).await?;
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND active = 1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn delete_token(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
