//! Caseload: student therapy caseload service
//!
//! Single-binary HTTP service over SQLite. Students, sessions (which double
//! as calendar events), SOAP notes, goals, and on-demand reports.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod validate;

/// Shared state for all handlers
///
/// `auth_disabled` is resolved once at startup; nothing re-reads the
/// environment per request.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth_disabled: bool,
}

impl AppState {
    pub fn new(db: SqlitePool, auth_disabled: bool) -> Self {
        AppState { db, auth_disabled }
    }
}

/// Build the complete routing table
///
/// Constructed once at startup. Everything under /api except login sits
/// behind the bearer-token guard; `GET /` and `GET /health` are public.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        // auth
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        // students
        .route(
            "/api/students",
            get(api::students::list_students).post(api::students::create_student),
        )
        .route("/api/students/stats", get(api::students::student_stats))
        .route(
            "/api/students/:id",
            get(api::students::get_student)
                .put(api::students::update_student)
                .delete(api::students::delete_student),
        )
        .route(
            "/api/students/:id/goals",
            get(api::students::list_student_goals).post(api::students::create_student_goal),
        )
        .route(
            "/api/students/:id/anonymize",
            post(api::students::anonymize_student),
        )
        // sessions
        .route(
            "/api/sessions",
            get(api::sessions::list_sessions).post(api::sessions::create_session),
        )
        .route(
            "/api/sessions/:id",
            get(api::sessions::get_session)
                .put(api::sessions::update_session)
                .delete(api::sessions::delete_session),
        )
        // SOAP notes
        .route(
            "/api/soap",
            get(api::soap::list_soap_notes).post(api::soap::create_soap_note),
        )
        .route(
            "/api/soap/:id",
            get(api::soap::get_soap_note)
                .put(api::soap::update_soap_note)
                .delete(api::soap::delete_soap_note),
        )
        .route("/api/soap/templates", get(api::soap::soap_templates))
        .route("/api/soap/stats", get(api::soap::soap_stats))
        .route(
            "/api/soap/student/:id",
            get(api::soap::list_student_soap_notes),
        )
        .route("/api/soap/:id/anonymize", post(api::soap::anonymize_soap_note))
        // calendar
        .route(
            "/api/calendar/events",
            get(api::calendar::get_calendar_events).post(api::calendar::create_calendar_event),
        )
        .route(
            "/api/calendar/events/:id",
            put(api::calendar::update_calendar_event)
                .delete(api::calendar::delete_calendar_event),
        )
        .route(
            "/api/calendar/events/:id/create-makeup",
            post(api::calendar::create_makeup_session),
        )
        .route(
            "/api/calendar/bulk-sessions",
            post(api::calendar::create_bulk_sessions),
        )
        .route("/api/calendar/conflicts", get(api::calendar::check_conflicts))
        // reports
        .route(
            "/api/reports/student/:id/progress",
            get(api::reports::student_progress_report),
        )
        .route("/api/reports/attendance", get(api::reports::attendance_report))
        .route(
            "/api/reports/analytics/overview",
            get(api::reports::analytics_overview),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    Router::new()
        .merge(api::health::health_routes())
        .route("/api/auth/login", post(api::auth::login))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
