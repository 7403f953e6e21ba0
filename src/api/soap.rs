//! SOAP note endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::auth::{require_admin, require_write, CurrentUser};
use crate::db::soap_notes::{self, NewSoapNote, SoapNoteFilter, SoapNotePatch};
use crate::db::{sessions, students};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, DEFAULT_PER_PAGE};
use crate::validate;
use crate::AppState;

const SECTION_MAX: usize = 10_000;

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SoapListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    /// When false, section bodies are withheld from the response
    #[serde(default = "default_true")]
    pub include_content: bool,
    pub student_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub anonymized: Option<bool>,
}

/// GET /api/soap
pub async fn list_soap_notes(
    State(state): State<AppState>,
    Query(query): Query<SoapListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = SoapNoteFilter {
        student_id: query.student_id,
        start_date: query.start_date,
        end_date: query.end_date,
        anonymized: query.anonymized,
    };

    let total = soap_notes::count(&state.db, &filter).await?;
    let page = calculate_pagination(total, query.page, query.per_page);
    let notes = soap_notes::list(&state.db, &filter, &page).await?;

    Ok(Json(json!({
        "soap_notes": notes
            .iter()
            .map(|n| n.to_json(query.include_content))
            .collect::<Vec<_>>(),
        "pagination": page,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SoapGetQuery {
    #[serde(default = "default_true")]
    pub include_content: bool,
}

/// GET /api/soap/:id
pub async fn get_soap_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<SoapGetQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let note = soap_notes::get(&state.db, id).await?;
    Ok(Json(note.to_json(query.include_content)))
}

fn validate_sections(
    subjective: Option<&str>,
    objective: Option<&str>,
    assessment: Option<&str>,
    plan: Option<&str>,
) -> ApiResult<()> {
    validate::text_limit("subjective", subjective, SECTION_MAX)?;
    validate::text_limit("objective", objective, SECTION_MAX)?;
    validate::text_limit("assessment", assessment, SECTION_MAX)?;
    validate::text_limit("plan", plan, SECTION_MAX)?;
    Ok(())
}

/// The linked session, when present, must belong to the note's student
async fn check_session_ownership(
    state: &AppState,
    session_id: i64,
    student_id: i64,
) -> ApiResult<()> {
    let session = sessions::get(&state.db, session_id).await?;
    if session.student_id != student_id {
        return Err(ApiError::Validation(
            "session does not belong to the specified student".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/soap
pub async fn create_soap_note(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewSoapNote>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    require_write(&current)?;
    validate_sections(
        payload.subjective.as_deref(),
        payload.objective.as_deref(),
        payload.assessment.as_deref(),
        payload.plan.as_deref(),
    )?;

    let student = students::get(&state.db, payload.student_id).await?;
    if let Some(session_id) = payload.session_id {
        check_session_ownership(&state, session_id, payload.student_id).await?;
    }

    let note = soap_notes::insert(&state.db, &payload).await?;
    info!(
        "Created SOAP note for student {} on {}",
        student.display_name(),
        note.session_date
    );
    Ok((StatusCode::CREATED, Json(note.to_json(true))))
}

/// PUT /api/soap/:id
pub async fn update_soap_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<SoapNotePatch>,
) -> ApiResult<Json<serde_json::Value>> {
    require_write(&current)?;

    let existing = soap_notes::get(&state.db, id).await?;
    if existing.anonymized {
        return Err(ApiError::Validation(
            "cannot edit an anonymized SOAP note".to_string(),
        ));
    }

    validate_sections(
        payload.subjective.as_deref(),
        payload.objective.as_deref(),
        payload.assessment.as_deref(),
        payload.plan.as_deref(),
    )?;
    if let Some(session_id) = payload.session_id {
        check_session_ownership(&state, session_id, existing.student_id).await?;
    }

    let note = soap_notes::update(&state.db, id, &payload).await?;
    info!("Updated SOAP note {}", id);
    Ok(Json(note.to_json(true)))
}

/// DELETE /api/soap/:id (admin only)
pub async fn delete_soap_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&current)?;
    soap_notes::delete(&state.db, id).await?;
    info!("Deleted SOAP note {}", id);
    Ok(Json(json!({ "message": "SOAP note deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct StudentSoapQuery {
    #[serde(default = "default_true")]
    pub include_content: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /api/soap/student/:id
pub async fn list_student_soap_notes(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    Query(query): Query<StudentSoapQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let student = students::get(&state.db, student_id).await?;
    let notes =
        soap_notes::list_for_student(&state.db, student_id, query.start_date, query.end_date)
            .await?;

    Ok(Json(json!({
        "student_id": student_id,
        "student_name": student.display_name(),
        "soap_notes": notes
            .iter()
            .map(|n| n.to_json(query.include_content))
            .collect::<Vec<_>>(),
    })))
}

/// GET /api/soap/templates
///
/// Canned section prompts to keep documentation consistent across
/// disciplines. Static content, no database access.
pub async fn soap_templates() -> Json<serde_json::Value> {
    Json(json!({
        "templates": {
            "speech_language": {
                "name": "Speech-Language Pathology",
                "template": {
                    "subjective": "Client/caregiver reports: [mood, behavior, concerns, home practice]",
                    "objective": "Therapeutic activities: [tasks, materials, cueing levels]\nPerformance data: [accuracy, trials, support levels]",
                    "assessment": "Progress toward goals: [goal progress]\nStrengths: [areas of success]\nChallenges: [areas needing support]",
                    "plan": "Continue: [successful interventions]\nModify: [adjustments needed]\nNext session: [upcoming focus areas]",
                },
            },
            "occupational_therapy": {
                "name": "Occupational Therapy",
                "template": {
                    "subjective": "Client/caregiver reports: [functional concerns, daily activities, participation]",
                    "objective": "Activities completed: [therapeutic tasks, adaptive equipment]\nAssistance levels: [independence, cueing, physical support]",
                    "assessment": "Functional progress: [ADL skills, academic tasks]\nBarriers: [environmental, physical, cognitive factors]",
                    "plan": "Treatment focus: [priority areas]\nStrategies: [approaches, accommodations]\nCaregiver education: [home strategies]",
                },
            },
            "physical_therapy": {
                "name": "Physical Therapy",
                "template": {
                    "subjective": "Client/caregiver reports: [pain levels, functional mobility, activity tolerance]",
                    "objective": "Therapeutic exercises: [activities, repetitions, resistance]\nMobility assessment: [transfers, ambulation, assistive devices]",
                    "assessment": "Functional mobility progress: [improvements, limitations]\nSafety awareness: [fall risk, precautions]",
                    "plan": "Exercise progression: [modifications, advancement]\nEquipment needs: [assistive devices, modifications]",
                },
            },
            "general": {
                "name": "General Template",
                "template": {
                    "subjective": "Client/caregiver reports and observations",
                    "objective": "Measurable observations, data, and performance during session",
                    "assessment": "Professional analysis of progress, strengths, and areas for improvement",
                    "plan": "Treatment modifications, goals, and recommendations moving forward",
                },
            },
        },
    }))
}

/// GET /api/soap/stats
pub async fn soap_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<crate::db::soap_notes::SoapStats>> {
    Ok(Json(soap_notes::stats(&state.db).await?))
}

/// POST /api/soap/:id/anonymize (admin only, idempotent)
pub async fn anonymize_soap_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&current)?;
    let note = soap_notes::anonymize(&state.db, id).await?;
    info!("Anonymized SOAP note {}", id);
    Ok(Json(json!({
        "message": "SOAP note anonymized",
        "soap_note": note.to_redacted_json(),
    })))
}
