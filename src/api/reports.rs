//! On-demand reports
//!
//! Reports are computed from the live tables at request time and never
//! persisted. A student with no sessions in the window gets zeroed
//! aggregates rather than an error.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::sessions::{self, SessionFilter, SessionWithStudent};
use crate::db::{goals, students};
use crate::error::ApiResult;
use crate::models::{Session, SessionStatus};
use crate::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RangeQuery {
    /// Resolve to a concrete window, defaulting to the last 90 days
    fn resolve(&self) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        let start = self
            .start_date
            .unwrap_or(end - Duration::days(DEFAULT_WINDOW_DAYS));
        (start, end)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SessionAggregates {
    pub total_sessions: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_shows: i64,
    pub attendance_rate: f64,
    pub average_duration_minutes: f64,
    pub by_type: BTreeMap<String, i64>,
}

fn aggregate_sessions(sessions: &[Session]) -> SessionAggregates {
    let mut agg = SessionAggregates {
        total_sessions: sessions.len() as i64,
        ..Default::default()
    };
    let mut total_minutes: i64 = 0;
    for s in sessions {
        match s.status {
            SessionStatus::Completed => agg.completed += 1,
            SessionStatus::Cancelled => agg.cancelled += 1,
            SessionStatus::NoShow => agg.no_shows += 1,
            _ => {}
        }
        total_minutes += s.duration_minutes();
        *agg.by_type
            .entry(format!("{:?}", s.session_type))
            .or_insert(0) += 1;
    }
    // attendance counts completed against everything that was held or missed
    let attended_or_missed = agg.completed + agg.no_shows;
    if attended_or_missed > 0 {
        agg.attendance_rate =
            round2(agg.completed as f64 / attended_or_missed as f64 * 100.0);
    }
    if !sessions.is_empty() {
        agg.average_duration_minutes =
            round2(total_minutes as f64 / sessions.len() as f64);
    }
    agg
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn count_soap_notes(
    pool: &SqlitePool,
    student_id: Option<i64>,
    start: NaiveDate,
    end: NaiveDate,
) -> ApiResult<i64> {
    let count: i64 = match student_id {
        Some(id) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM soap_notes
                 WHERE student_id = ? AND session_date BETWEEN ? AND ?",
            )
            .bind(id)
            .bind(start)
            .bind(end)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM soap_notes WHERE session_date BETWEEN ? AND ?",
            )
            .bind(start)
            .bind(end)
            .fetch_one(pool)
            .await?
        }
    };
    Ok(count)
}

/// GET /api/reports/student/:id/progress
pub async fn student_progress_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (start, end) = query.resolve();
    let student = students::get(&state.db, id).await?;

    let filter = SessionFilter {
        student_id: Some(id),
        start_date: Some(start),
        end_date: Some(end),
        event_type: None,
    };
    let sessions = sessions::list(&state.db, &filter).await?;
    let aggregates = aggregate_sessions(&sessions);

    let goals = goals::list_for_student(&state.db, id, true).await?;
    let soap_note_count = count_soap_notes(&state.db, Some(id), start, end).await?;

    Ok(Json(json!({
        "student_id": id,
        "student_name": student.display_name(),
        "period": { "start_date": start, "end_date": end },
        "goals": goals,
        "sessions": aggregates,
        "soap_note_count": soap_note_count,
    })))
}

#[derive(Debug, Serialize)]
struct AttendanceRow {
    student_id: i64,
    student_name: String,
    scheduled: i64,
    completed: i64,
    cancelled: i64,
    no_shows: i64,
    attendance_rate: f64,
    service_minutes: i64,
}

/// GET /api/reports/attendance
pub async fn attendance_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (start, end) = query.resolve();

    let filter = SessionFilter {
        student_id: None,
        start_date: Some(start),
        end_date: Some(end),
        event_type: None,
    };
    let rows = sessions::list_with_students(&state.db, &filter).await?;

    let mut per_student: BTreeMap<i64, (String, Vec<&SessionWithStudent>)> = BTreeMap::new();
    for row in &rows {
        per_student
            .entry(row.session.student_id)
            .or_insert_with(|| (row.student_display_name(), Vec::new()))
            .1
            .push(row);
    }

    let mut students_out = Vec::with_capacity(per_student.len());
    let mut total_completed: i64 = 0;
    let mut total_no_shows: i64 = 0;
    for (student_id, (name, rows)) in per_student {
        let mut out = AttendanceRow {
            student_id,
            student_name: name,
            scheduled: 0,
            completed: 0,
            cancelled: 0,
            no_shows: 0,
            attendance_rate: 0.0,
            service_minutes: 0,
        };
        for row in rows {
            let s = &row.session;
            match s.status {
                SessionStatus::Scheduled => out.scheduled += 1,
                SessionStatus::Completed => {
                    out.completed += 1;
                    out.service_minutes += s.duration_minutes();
                }
                SessionStatus::Cancelled | SessionStatus::ExcusedAbsence => out.cancelled += 1,
                SessionStatus::NoShow => out.no_shows += 1,
                SessionStatus::MakeupNeeded => {}
            }
        }
        let held = out.completed + out.no_shows;
        if held > 0 {
            out.attendance_rate = round2(out.completed as f64 / held as f64 * 100.0);
        }
        total_completed += out.completed;
        total_no_shows += out.no_shows;
        students_out.push(out);
    }

    let overall_held = total_completed + total_no_shows;
    let overall_rate = if overall_held > 0 {
        round2(total_completed as f64 / overall_held as f64 * 100.0)
    } else {
        0.0
    };

    Ok(Json(json!({
        "period": { "start_date": start, "end_date": end },
        "students": students_out,
        "totals": {
            "total_sessions": rows.len(),
            "completed": total_completed,
            "no_shows": total_no_shows,
            "attendance_rate": overall_rate,
        },
    })))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct LabelCount {
    label: String,
    count: i64,
}

/// GET /api/reports/analytics/overview
pub async fn analytics_overview(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (start, end) = query.resolve();

    let student_stats = students::stats(&state.db).await?;

    let by_type = sqlx::query_as::<_, LabelCount>(
        "SELECT session_type AS label, COUNT(*) AS count FROM sessions
         WHERE session_date BETWEEN ? AND ?
         GROUP BY session_type ORDER BY session_type",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let monthly = sqlx::query_as::<_, LabelCount>(
        "SELECT strftime('%Y-%m', session_date) AS label, COUNT(*) AS count
         FROM sessions WHERE session_date BETWEEN ? AND ?
         GROUP BY label ORDER BY label",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let soap_note_count = count_soap_notes(&state.db, None, start, end).await?;

    Ok(Json(json!({
        "period": { "start_date": start, "end_date": end },
        "students": student_stats,
        "sessions_by_type": by_type,
        "monthly_sessions": monthly,
        "soap_note_count": soap_note_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, SessionType};
    use chrono::{NaiveTime, Utc};

    fn session(status: SessionStatus, minutes: i64) -> Session {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        Session {
            id: 0,
            student_id: 1,
            session_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            event_type: EventType::Session,
            session_type: SessionType::Individual,
            status,
            location: None,
            notes: None,
            plan_notes: None,
            is_makeup: false,
            makeup_for_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_session_list_yields_zero_aggregates() {
        let agg = aggregate_sessions(&[]);
        assert_eq!(agg.total_sessions, 0);
        assert_eq!(agg.attendance_rate, 0.0);
        assert_eq!(agg.average_duration_minutes, 0.0);
        assert!(agg.by_type.is_empty());
    }

    #[test]
    fn attendance_rate_ignores_cancellations() {
        let sessions = vec![
            session(SessionStatus::Completed, 30),
            session(SessionStatus::Completed, 30),
            session(SessionStatus::NoShow, 30),
            session(SessionStatus::Cancelled, 30),
        ];
        let agg = aggregate_sessions(&sessions);
        assert_eq!(agg.completed, 2);
        assert_eq!(agg.no_shows, 1);
        assert_eq!(agg.cancelled, 1);
        assert_eq!(agg.attendance_rate, 66.67);
    }

    #[test]
    fn average_duration_covers_all_sessions() {
        let sessions = vec![
            session(SessionStatus::Completed, 30),
            session(SessionStatus::Completed, 60),
        ];
        let agg = aggregate_sessions(&sessions);
        assert_eq!(agg.average_duration_minutes, 45.0);
    }

    #[test]
    fn default_window_is_ninety_days() {
        let query = RangeQuery {
            start_date: None,
            end_date: Some(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
        };
        let (start, end) = query.resolve();
        assert_eq!(end - start, Duration::days(90));
    }
}
