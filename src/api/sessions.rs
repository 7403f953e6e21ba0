//! Session tracking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::auth::{require_write, CurrentUser};
use crate::db::sessions::{self, NewSession, SessionFilter, SessionPatch};
use crate::db::students;
use crate::error::ApiResult;
use crate::models::Session;
use crate::validate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub student_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Json<Vec<Session>>> {
    let filter = SessionFilter {
        student_id: query.student_id,
        start_date: query.start_date,
        end_date: query.end_date,
        event_type: None,
    };
    Ok(Json(sessions::list(&state.db, &filter).await?))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Session>> {
    Ok(Json(sessions::get(&state.db, id).await?))
}

pub(crate) fn validate_new_session(new: &NewSession) -> ApiResult<()> {
    validate::time_order(new.start_time, new.end_time)?;
    validate::text_limit("location", new.location.as_deref(), 100)?;
    validate::text_limit("notes", new.notes.as_deref(), 5000)?;
    validate::text_limit("plan_notes", new.plan_notes.as_deref(), 5000)?;
    Ok(())
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewSession>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    require_write(&current)?;
    validate_new_session(&payload)?;

    // The referenced student must exist at creation time
    students::get(&state.db, payload.student_id).await?;

    let session = sessions::insert(&state.db, &payload).await?;
    info!("Created session {} for student {}", session.id, session.student_id);
    Ok((StatusCode::CREATED, Json(session)))
}

/// PUT /api/sessions/:id
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<SessionPatch>,
) -> ApiResult<Json<Session>> {
    require_write(&current)?;
    validate::text_limit("location", payload.location.as_deref(), 100)?;
    validate::text_limit("notes", payload.notes.as_deref(), 5000)?;
    validate::text_limit("plan_notes", payload.plan_notes.as_deref(), 5000)?;
    if let (Some(start), Some(end)) = (payload.start_time, payload.end_time) {
        validate::time_order(start, end)?;
    }

    let session = sessions::update(&state.db, id, &payload).await?;
    info!("Updated session {}", id);
    Ok(Json(session))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_write(&current)?;
    sessions::delete(&state.db, id).await?;
    info!("Deleted session {}", id);
    Ok(Json(json!({ "message": "session deleted" })))
}
