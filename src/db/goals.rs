//! Goal queries (subresource of students)

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::ApiResult;
use crate::models::Goal;

/// Payload for POST /api/students/:id/goals
#[derive(Debug, Deserialize)]
pub struct NewGoal {
    pub description: String,
    pub completion_criteria: Option<String>,
    pub target_date: Option<NaiveDate>,
}

pub async fn list_for_student(
    pool: &SqlitePool,
    student_id: i64,
    active_only: bool,
) -> ApiResult<Vec<Goal>> {
    let sql = if active_only {
        "SELECT * FROM goals WHERE student_id = ? AND active = 1 ORDER BY created_at DESC"
    } else {
        "SELECT * FROM goals WHERE student_id = ? ORDER BY created_at DESC"
    };
    let goals = sqlx::query_as::<_, Goal>(sql)
        .bind(student_id)
        .fetch_all(pool)
        .await?;
    Ok(goals)
}

pub async fn insert(pool: &SqlitePool, student_id: i64, new: &NewGoal) -> ApiResult<Goal> {
    let now = Utc::now();
    let goal = sqlx::query_as::<_, Goal>(
        r#"
        INSERT INTO goals (student_id, description, completion_criteria, target_date,
                           active, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(student_id)
    .bind(&new.description)
    .bind(&new.completion_criteria)
    .bind(new.target_date)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(goal)
}

pub async fn count_active_for_student(pool: &SqlitePool, student_id: i64) -> ApiResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM goals WHERE student_id = ? AND active = 1")
            .bind(student_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
