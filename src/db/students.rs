//! Student queries

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Student;
use crate::pagination::Pagination;

/// Payload for POST /api/students
#[derive(Debug, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub pronouns: Option<String>,
    pub grade_level: Option<String>,
    #[serde(default)]
    pub monthly_services: i64,
}

/// Partial payload for PUT /api/students/:id; absent fields are unchanged
#[derive(Debug, Default, Deserialize)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_name: Option<String>,
    pub pronouns: Option<String>,
    pub grade_level: Option<String>,
    pub monthly_services: Option<i64>,
    pub active: Option<bool>,
}

/// List filters for GET /api/students
#[derive(Debug)]
pub struct StudentListFilter<'a> {
    pub active_only: bool,
    pub search: Option<&'a str>,
    pub grade: Option<&'a str>,
}

fn push_filters(qb: &mut QueryBuilder<'_, sqlx::Sqlite>, filter: &StudentListFilter<'_>) {
    if filter.active_only {
        qb.push(" AND active = 1");
    }
    if let Some(search) = filter.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR preferred_name LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(grade) = filter.grade {
        qb.push(" AND grade_level = ").push_bind(grade.to_string());
    }
}

pub async fn count(pool: &SqlitePool, filter: &StudentListFilter<'_>) -> ApiResult<i64> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM students WHERE 1=1");
    push_filters(&mut qb, filter);
    let total: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(total)
}

pub async fn list(
    pool: &SqlitePool,
    filter: &StudentListFilter<'_>,
    page: &Pagination,
) -> ApiResult<Vec<Student>> {
    let mut qb = QueryBuilder::new("SELECT * FROM students WHERE 1=1");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY last_name, first_name LIMIT ")
        .push_bind(page.per_page)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let students = qb.build_query_as::<Student>().fetch_all(pool).await?;
    Ok(students)
}

/// All active students, in caseload order (used by bulk scheduling)
pub async fn list_active(pool: &SqlitePool) -> ApiResult<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE active = 1 ORDER BY last_name, first_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(students)
}

pub async fn get(pool: &SqlitePool, id: i64) -> ApiResult<Student> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("student {} not found", id)))
}

pub async fn insert(pool: &SqlitePool, new: &NewStudent) -> ApiResult<Student> {
    let now = Utc::now();
    let anonymous_id = Uuid::new_v4().simple().to_string();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO students (
            first_name, last_name, preferred_name, pronouns, grade_level,
            monthly_services, active, anonymized, anonymous_id, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, 1, 0, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.preferred_name)
    .bind(&new.pronouns)
    .bind(&new.grade_level)
    .bind(new.monthly_services)
    .bind(&anonymous_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get(pool, id).await
}

pub async fn update(pool: &SqlitePool, id: i64, patch: &StudentPatch) -> ApiResult<Student> {
    let current = get(pool, id).await?;

    let first_name = patch.first_name.as_ref().unwrap_or(&current.first_name);
    let last_name = patch.last_name.as_ref().unwrap_or(&current.last_name);
    let preferred_name = patch.preferred_name.as_ref().or(current.preferred_name.as_ref());
    let pronouns = patch.pronouns.as_ref().or(current.pronouns.as_ref());
    let grade_level = patch.grade_level.as_ref().or(current.grade_level.as_ref());
    let monthly_services = patch.monthly_services.unwrap_or(current.monthly_services);
    let active = patch.active.unwrap_or(current.active);

    sqlx::query(
        r#"
        UPDATE students
        SET first_name = ?, last_name = ?, preferred_name = ?, pronouns = ?,
            grade_level = ?, monthly_services = ?, active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(preferred_name)
    .bind(pronouns)
    .bind(grade_level)
    .bind(monthly_services)
    .bind(active)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// Soft delete: the record stays for reporting, children stay linked
pub async fn deactivate(pool: &SqlitePool, id: i64) -> ApiResult<()> {
    let result = sqlx::query("UPDATE students SET active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("student {} not found", id)));
    }
    Ok(())
}

/// Scrub name fields in place; the anonymous_id keeps analytics stable
pub async fn anonymize(pool: &SqlitePool, id: i64) -> ApiResult<Student> {
    let current = get(pool, id).await?;
    if current.anonymized {
        return Ok(current);
    }

    let masked_last = current.anonymous_id[..8].to_string();
    sqlx::query(
        r#"
        UPDATE students
        SET first_name = 'Student', last_name = ?, preferred_name = NULL,
            anonymized = 1, anonymized_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(masked_last)
    .bind(Utc::now())
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// Caseload-wide counters for GET /api/students/stats
#[derive(Debug, serde::Serialize)]
pub struct StudentStats {
    pub total_students: i64,
    pub active_students: i64,
    pub inactive_students: i64,
    pub anonymized_students: i64,
    pub grade_distribution: std::collections::BTreeMap<String, i64>,
}

pub async fn stats(pool: &SqlitePool) -> ApiResult<StudentStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await?;
    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE active = 1")
        .fetch_one(pool)
        .await?;
    let anonymized: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE anonymized = 1")
        .fetch_one(pool)
        .await?;

    let grades: Vec<(String, i64)> = sqlx::query_as(
        "SELECT grade_level, COUNT(*) FROM students
         WHERE active = 1 AND grade_level IS NOT NULL
         GROUP BY grade_level",
    )
    .fetch_all(pool)
    .await?;

    Ok(StudentStats {
        total_students: total,
        active_students: active,
        inactive_students: total - active,
        anonymized_students: anonymized,
        grade_distribution: grades.into_iter().collect(),
    })
}
