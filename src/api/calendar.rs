//! Calendar endpoints
//!
//! The calendar is a view over the sessions table. Responses use the
//! FullCalendar event shape (camelCase keys, ISO start/end) so the web
//! client can render them directly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::auth::{require_write, CurrentUser};
use crate::api::sessions::validate_new_session;
use crate::db::sessions::{self, NewSession, SessionFilter, SessionPatch, SessionWithStudent};
use crate::db::students;
use crate::error::{ApiError, ApiResult};
use crate::models::session::hhmm;
use crate::models::{Session, SessionStatus};
use crate::validate;
use crate::AppState;

/// FullCalendar-shaped event
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: String,
    pub end: String,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub text_color: &'static str,
    pub extended_props: ExtendedProps,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProps {
    pub student_id: i64,
    pub student_name: String,
    pub event_type: crate::models::EventType,
    pub session_type: crate::models::SessionType,
    pub status: SessionStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub plan_notes: Option<String>,
    pub is_makeup: bool,
}

impl CalendarEvent {
    fn from_row(row: &SessionWithStudent) -> Self {
        let s = &row.session;
        let color = s.status.color();
        CalendarEvent {
            id: s.id,
            title: format!("{} - {:?}", row.student_display_name(), s.session_type),
            start: format!("{}T{}", s.session_date, s.start_time.format("%H:%M")),
            end: format!("{}T{}", s.session_date, s.end_time.format("%H:%M")),
            background_color: color,
            border_color: color,
            text_color: "#ffffff",
            extended_props: ExtendedProps {
                student_id: s.student_id,
                student_name: row.student_display_name(),
                event_type: s.event_type,
                session_type: s.session_type,
                status: s.status,
                location: s.location.clone(),
                notes: s.notes.clone(),
                plan_notes: s.plan_notes.clone(),
                is_makeup: s.is_makeup,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub student_id: Option<i64>,
    pub event_type: Option<crate::models::EventType>,
}

/// First and last day of the current month, the default calendar window
fn current_month_range() -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let first = today.with_day(1).expect("day 1 is always valid");
    let next_month = first + Duration::days(32);
    let last = next_month.with_day(1).expect("day 1 is always valid") - Duration::days(1);
    (first, last)
}

/// GET /api/calendar/events
pub async fn get_calendar_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let (start, end) = match (query.start, query.end) {
        (Some(start), Some(end)) => (start, end),
        _ => current_month_range(),
    };

    let filter = SessionFilter {
        student_id: query.student_id,
        start_date: Some(start),
        end_date: Some(end),
        event_type: query.event_type,
    };
    let rows = sessions::list_with_students(&state.db, &filter).await?;
    let events: Vec<CalendarEvent> = rows.iter().map(CalendarEvent::from_row).collect();

    info!("Retrieved {} calendar events", events.len());
    Ok(Json(events))
}

async fn event_with_student(state: &AppState, id: i64) -> ApiResult<CalendarEvent> {
    let row = sessions::get_with_student(&state.db, id).await?;
    Ok(CalendarEvent::from_row(&row))
}

/// POST /api/calendar/events
///
/// Rejects windows that overlap an existing scheduled or completed session
/// for the same student (409).
pub async fn create_calendar_event(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewSession>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    require_write(&current)?;
    validate_new_session(&payload)?;

    let student = students::get(&state.db, payload.student_id).await?;

    // 409 carries the conflicting session so the client can show it
    if let Some(conflict) = sessions::find_conflict(
        &state.db,
        payload.student_id,
        payload.session_date,
        payload.start_time,
        payload.end_time,
    )
    .await?
    {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": {
                    "code": "CONFLICT",
                    "message": format!(
                        "time conflict with session {} ({} {}-{})",
                        conflict.id,
                        conflict.session_date,
                        conflict.start_time.format("%H:%M"),
                        conflict.end_time.format("%H:%M"),
                    ),
                },
                "conflicting_session": conflict,
            })),
        ));
    }

    let session = sessions::insert(&state.db, &payload).await?;
    info!("Created calendar event for {}", student.display_name());

    let event = event_with_student(&state, session.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "event created", "event": event })),
    ))
}

/// PUT /api/calendar/events/:id
pub async fn update_calendar_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<SessionPatch>,
) -> ApiResult<Json<serde_json::Value>> {
    require_write(&current)?;
    if let (Some(start), Some(end)) = (payload.start_time, payload.end_time) {
        validate::time_order(start, end)?;
    }

    sessions::update(&state.db, id, &payload).await?;
    info!("Updated calendar event {}", id);

    let event = event_with_student(&state, id).await?;
    Ok(Json(json!({ "message": "event updated", "event": event })))
}

/// DELETE /api/calendar/events/:id
pub async fn delete_calendar_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_write(&current)?;
    sessions::delete(&state.db, id).await?;
    info!("Deleted calendar event {}", id);
    Ok(Json(json!({ "message": "event deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct MakeupRequest {
    pub session_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

/// POST /api/calendar/events/:id/create-makeup
///
/// Only sessions in Makeup Needed or No Show status can receive a makeup.
pub async fn create_makeup_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<MakeupRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    require_write(&current)?;
    validate::time_order(payload.start_time, payload.end_time)?;

    let original = sessions::get(&state.db, id).await?;
    if !matches!(
        original.status,
        SessionStatus::MakeupNeeded | SessionStatus::NoShow
    ) {
        return Err(ApiError::Validation(
            "only sessions marked 'Makeup Needed' or 'No Show' can have makeups".to_string(),
        ));
    }

    let makeup = NewSession {
        student_id: original.student_id,
        session_date: payload.session_date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        event_type: original.event_type,
        session_type: original.session_type,
        status: SessionStatus::Scheduled,
        location: payload.location.or(original.location.clone()),
        notes: Some(format!(
            "Makeup for {} session",
            original.session_date.format("%m/%d/%Y")
        )),
        plan_notes: None,
    };
    let session = sessions::insert_makeup(&state.db, &makeup, original.id).await?;
    info!("Created makeup session {} for session {}", session.id, id);

    let event = event_with_student(&state, session.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "makeup session created", "makeup_session": event })),
    ))
}

fn default_bulk_duration() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct BulkSessionsRequest {
    pub session_date: NaiveDate,
    #[serde(default = "default_bulk_duration")]
    pub duration_minutes: i64,
}

/// POST /api/calendar/bulk-sessions
///
/// Schedules one session per active student on the given day, back to back
/// from 09:00. Students who already have a session that day are skipped;
/// scheduling stops once a slot would start at or after 17:00.
pub async fn create_bulk_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<BulkSessionsRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    require_write(&current)?;
    if !(5..=240).contains(&payload.duration_minutes) {
        return Err(ApiError::Validation(
            "duration_minutes must be between 5-240".to_string(),
        ));
    }

    let students = students::list_active(&state.db).await?;
    let day_start = NaiveTime::from_hms_opt(9, 0, 0).expect("valid clock time");
    let day_end = NaiveTime::from_hms_opt(17, 0, 0).expect("valid clock time");

    let mut events: Vec<CalendarEvent> = Vec::new();
    for student in &students {
        if sessions::exists_for_student_on(&state.db, student.id, payload.session_date).await? {
            continue;
        }

        let start = day_start + Duration::minutes(events.len() as i64 * payload.duration_minutes);
        if start >= day_end {
            break;
        }

        let new = NewSession {
            student_id: student.id,
            session_date: payload.session_date,
            start_time: start,
            end_time: start + Duration::minutes(payload.duration_minutes),
            event_type: Default::default(),
            session_type: Default::default(),
            status: SessionStatus::Scheduled,
            location: None,
            notes: None,
            plan_notes: None,
        };
        let session = sessions::insert(&state.db, &new).await?;
        events.push(event_with_student(&state, session.id).await?);
    }

    info!(
        "Bulk-created {} sessions on {}",
        events.len(),
        payload.session_date
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("created {} sessions", events.len()),
            "sessions": events,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ConflictsQuery {
    pub date: NaiveDate,
}

/// GET /api/calendar/conflicts?date=YYYY-MM-DD
///
/// Pairwise overlap scan across all scheduled/completed sessions on a day.
pub async fn check_conflicts(
    State(state): State<AppState>,
    Query(query): Query<ConflictsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let day = sessions::list_for_day(&state.db, query.date).await?;

    let mut conflicts: Vec<serde_json::Value> = Vec::new();
    for (i, a) in day.iter().enumerate() {
        for b in &day[i + 1..] {
            if overlaps(a, b) {
                conflicts.push(json!({
                    "session1": a,
                    "session2": b,
                    "type": "time_overlap",
                }));
            }
        }
    }

    Ok(Json(json!({
        "date": query.date,
        "conflicts": conflicts,
        "total_sessions": day.len(),
    })))
}

fn overlaps(a: &Session, b: &Session) -> bool {
    a.start_time < b.end_time && a.end_time > b.start_time
}
