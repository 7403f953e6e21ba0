//! Session queries
//!
//! Sessions are the single source of truth for the calendar: the calendar
//! endpoints read and write this table with an event-shaped payload.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, QueryBuilder, SqlitePool};

use crate::error::{ApiError, ApiResult};
use crate::models::session::hhmm;
use crate::models::{EventType, Session, SessionStatus, SessionType};

/// Payload for POST /api/sessions and POST /api/calendar/events
#[derive(Debug, Deserialize)]
pub struct NewSession {
    pub student_id: i64,
    pub session_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub status: SessionStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub plan_notes: Option<String>,
}

/// Partial payload for PUT /api/sessions/:id and PUT /api/calendar/events/:id
#[derive(Debug, Default, Deserialize)]
pub struct SessionPatch {
    pub session_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    pub end_time: Option<NaiveTime>,
    pub event_type: Option<EventType>,
    pub session_type: Option<SessionType>,
    pub status: Option<SessionStatus>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub plan_notes: Option<String>,
}

/// List filters for GET /api/sessions
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub student_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub event_type: Option<EventType>,
}

/// Session joined with the owning student's naming fields, for calendar views
#[derive(Debug, FromRow)]
pub struct SessionWithStudent {
    #[sqlx(flatten)]
    pub session: Session,
    pub first_name: String,
    pub last_name: String,
    pub student_anonymized: bool,
    pub anonymous_id: String,
}

impl SessionWithStudent {
    pub fn student_display_name(&self) -> String {
        if self.student_anonymized {
            format!("Student {}", &self.anonymous_id[..8])
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

pub async fn list(pool: &SqlitePool, filter: &SessionFilter) -> ApiResult<Vec<Session>> {
    let mut qb = QueryBuilder::new("SELECT * FROM sessions WHERE 1=1");
    if let Some(student_id) = filter.student_id {
        qb.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND session_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND session_date <= ").push_bind(end);
    }
    if let Some(event_type) = filter.event_type {
        qb.push(" AND event_type = ").push_bind(event_type);
    }
    qb.push(" ORDER BY session_date, start_time");
    let sessions = qb.build_query_as::<Session>().fetch_all(pool).await?;
    Ok(sessions)
}

/// Calendar range query with student names resolved in one pass
pub async fn list_with_students(
    pool: &SqlitePool,
    filter: &SessionFilter,
) -> ApiResult<Vec<SessionWithStudent>> {
    let mut qb = QueryBuilder::new(
        "SELECT s.*, st.first_name, st.last_name,
                st.anonymized AS student_anonymized, st.anonymous_id
         FROM sessions s JOIN students st ON st.id = s.student_id
         WHERE 1=1",
    );
    if let Some(student_id) = filter.student_id {
        qb.push(" AND s.student_id = ").push_bind(student_id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND s.session_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND s.session_date <= ").push_bind(end);
    }
    if let Some(event_type) = filter.event_type {
        qb.push(" AND s.event_type = ").push_bind(event_type);
    }
    qb.push(" ORDER BY s.session_date, s.start_time");
    let rows = qb
        .build_query_as::<SessionWithStudent>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Single session with the owning student's naming fields
pub async fn get_with_student(pool: &SqlitePool, id: i64) -> ApiResult<SessionWithStudent> {
    sqlx::query_as::<_, SessionWithStudent>(
        r#"
        SELECT s.*, st.first_name, st.last_name,
               st.anonymized AS student_anonymized, st.anonymous_id
        FROM sessions s JOIN students st ON st.id = s.student_id
        WHERE s.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("session {} not found", id)))
}

pub async fn get(pool: &SqlitePool, id: i64) -> ApiResult<Session> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", id)))
}

pub async fn insert(pool: &SqlitePool, new: &NewSession) -> ApiResult<Session> {
    insert_inner(pool, new, false, None).await
}

/// Insert a makeup session linked to the one it replaces
pub async fn insert_makeup(
    pool: &SqlitePool,
    new: &NewSession,
    original_id: i64,
) -> ApiResult<Session> {
    insert_inner(pool, new, true, Some(original_id)).await
}

async fn insert_inner(
    pool: &SqlitePool,
    new: &NewSession,
    is_makeup: bool,
    makeup_for: Option<i64>,
) -> ApiResult<Session> {
    let now = Utc::now();
    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (
            student_id, session_date, start_time, end_time, event_type,
            session_type, status, location, notes, plan_notes,
            is_makeup, makeup_for_session_id, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.student_id)
    .bind(new.session_date)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.event_type)
    .bind(new.session_type)
    .bind(new.status)
    .bind(&new.location)
    .bind(&new.notes)
    .bind(&new.plan_notes)
    .bind(is_makeup)
    .bind(makeup_for)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(session)
}

pub async fn update(pool: &SqlitePool, id: i64, patch: &SessionPatch) -> ApiResult<Session> {
    let current = get(pool, id).await?;

    let session_date = patch.session_date.unwrap_or(current.session_date);
    let start_time = patch.start_time.unwrap_or(current.start_time);
    let end_time = patch.end_time.unwrap_or(current.end_time);
    let event_type = patch.event_type.unwrap_or(current.event_type);
    let session_type = patch.session_type.unwrap_or(current.session_type);
    let status = patch.status.unwrap_or(current.status);
    let location = patch.location.as_ref().or(current.location.as_ref());
    let notes = patch.notes.as_ref().or(current.notes.as_ref());
    let plan_notes = patch.plan_notes.as_ref().or(current.plan_notes.as_ref());

    sqlx::query(
        r#"
        UPDATE sessions
        SET session_date = ?, start_time = ?, end_time = ?, event_type = ?,
            session_type = ?, status = ?, location = ?, notes = ?, plan_notes = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(session_date)
    .bind(start_time)
    .bind(end_time)
    .bind(event_type)
    .bind(session_type)
    .bind(status)
    .bind(location)
    .bind(notes)
    .bind(plan_notes)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("session {} not found", id)));
    }
    Ok(())
}

/// Whether the student already has any session on the given day
pub async fn exists_for_student_on(
    pool: &SqlitePool,
    student_id: i64,
    date: NaiveDate,
) -> ApiResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sessions WHERE student_id = ? AND session_date = ?)",
    )
    .bind(student_id)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// First scheduled/completed session overlapping the given window, if any
pub async fn find_conflict(
    pool: &SqlitePool,
    student_id: i64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> ApiResult<Option<Session>> {
    let conflict = sqlx::query_as::<_, Session>(
        r#"
        SELECT * FROM sessions
        WHERE student_id = ? AND session_date = ?
          AND start_time < ? AND end_time > ?
          AND status IN ('Scheduled', 'Completed')
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(date)
    .bind(end)
    .bind(start)
    .fetch_optional(pool)
    .await?;
    Ok(conflict)
}

/// All scheduled/completed sessions on a day, ordered for overlap scanning
pub async fn list_for_day(pool: &SqlitePool, date: NaiveDate) -> ApiResult<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(
        r#"
        SELECT * FROM sessions
        WHERE session_date = ? AND status IN ('Scheduled', 'Completed')
        ORDER BY start_time
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(sessions)
}
