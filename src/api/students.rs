//! Student management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::auth::{require_admin, require_write, CurrentUser};
use crate::db::goals::{self, NewGoal};
use crate::db::students::{self, NewStudent, StudentListFilter, StudentPatch, StudentStats};
use crate::error::ApiResult;
use crate::models::Student;
use crate::pagination::{calculate_pagination, DEFAULT_PER_PAGE};
use crate::validate;
use crate::AppState;

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
pub struct StudentListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    /// Restrict to active students (default true)
    #[serde(default = "default_true")]
    pub active: bool,
    /// Substring match on first/last/preferred name
    pub search: Option<String>,
    pub grade: Option<String>,
}

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = StudentListFilter {
        active_only: query.active,
        search: query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        grade: query.grade.as_deref(),
    };

    let total = students::count(&state.db, &filter).await?;
    let page = calculate_pagination(total, query.page, query.per_page);
    let students = students::list(&state.db, &filter, &page).await?;

    Ok(Json(json!({
        "students": students,
        "pagination": page,
    })))
}

/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let student = students::get(&state.db, id).await?;
    let goals_count = goals::count_active_for_student(&state.db, id).await?;
    Ok(Json(student_json(&student, Some(goals_count))))
}

fn validate_new_student(new: &NewStudent) -> ApiResult<()> {
    validate::name("first_name", &new.first_name)?;
    validate::name("last_name", &new.last_name)?;
    validate::optional_name("preferred_name", new.preferred_name.as_deref())?;
    validate::pronouns(new.pronouns.as_deref())?;
    validate::grade_level(new.grade_level.as_deref())?;
    validate::monthly_services(new.monthly_services)?;
    Ok(())
}

fn validate_student_patch(patch: &StudentPatch) -> ApiResult<()> {
    validate::optional_name("first_name", patch.first_name.as_deref())?;
    validate::optional_name("last_name", patch.last_name.as_deref())?;
    validate::optional_name("preferred_name", patch.preferred_name.as_deref())?;
    validate::pronouns(patch.pronouns.as_deref())?;
    validate::grade_level(patch.grade_level.as_deref())?;
    if let Some(services) = patch.monthly_services {
        validate::monthly_services(services)?;
    }
    Ok(())
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewStudent>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    require_write(&current)?;
    validate_new_student(&payload)?;

    let student = students::insert(&state.db, &payload).await?;
    info!("Created student {} (id {})", student.display_name(), student.id);
    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<StudentPatch>,
) -> ApiResult<Json<Student>> {
    require_write(&current)?;
    validate_student_patch(&payload)?;

    let student = students::update(&state.db, id, &payload).await?;
    info!("Updated student {} (id {})", student.display_name(), student.id);
    Ok(Json(student))
}

/// DELETE /api/students/:id (soft delete)
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&current)?;
    students::deactivate(&state.db, id).await?;
    info!("Deactivated student {}", id);
    Ok(Json(json!({ "message": "student deactivated" })))
}

#[derive(Debug, Deserialize)]
pub struct GoalsQuery {
    #[serde(default = "default_true")]
    pub active: bool,
}

/// GET /api/students/:id/goals
pub async fn list_student_goals(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<GoalsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let student = students::get(&state.db, id).await?;
    let goals = goals::list_for_student(&state.db, id, query.active).await?;
    Ok(Json(json!({
        "student_id": id,
        "student_name": student.display_name(),
        "goals": goals,
    })))
}

/// POST /api/students/:id/goals
pub async fn create_student_goal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewGoal>,
) -> ApiResult<(StatusCode, Json<crate::models::Goal>)> {
    require_write(&current)?;
    validate::required_text("description", &payload.description, 1000)?;
    validate::text_limit("completion_criteria", payload.completion_criteria.as_deref(), 1000)?;

    let student = students::get(&state.db, id).await?;
    let goal = goals::insert(&state.db, id, &payload).await?;
    info!("Created goal for student {}", student.display_name());
    Ok((StatusCode::CREATED, Json(goal)))
}

/// POST /api/students/:id/anonymize
///
/// Idempotent: an already-anonymized student is returned unchanged.
pub async fn anonymize_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&current)?;
    let student = students::anonymize(&state.db, id).await?;
    info!("Anonymized student {}", id);
    Ok(Json(json!({
        "message": "student data anonymized",
        "student": student_json(&student, None),
    })))
}

/// GET /api/students/stats
pub async fn student_stats(State(state): State<AppState>) -> ApiResult<Json<StudentStats>> {
    Ok(Json(students::stats(&state.db).await?))
}

fn student_json(student: &Student, goals_count: Option<i64>) -> serde_json::Value {
    let mut value = serde_json::to_value(student).expect("Student serializes");
    if let Some(map) = value.as_object_mut() {
        map.insert("display_name".to_string(), json!(student.display_name()));
        if let Some(count) = goals_count {
            map.insert("goals_count".to_string(), json!(count));
        }
    }
    value
}
