//! Report endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use caseload::{build_router, db, AppState};

async fn setup_app() -> axum::Router {
    let pool = db::init_memory_database()
        .await
        .expect("in-memory database");
    build_router(AppState::new(pool, true))
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn create_student(app: &axum::Router, first: &str, last: &str) -> i64 {
    let request = json_request(
        "POST",
        "/api/students",
        json!({ "first_name": first, "last_name": last, "grade_level": "5" }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["id"].as_i64().unwrap()
}

async fn create_session(app: &axum::Router, student_id: i64, date: &str, status: &str) {
    let request = json_request(
        "POST",
        "/api/sessions",
        json!({
            "student_id": student_id,
            "session_date": date,
            "start_time": "09:00",
            "end_time": "09:30",
            "status": status,
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_progress_report_with_zero_sessions() {
    let app = setup_app().await;
    let id = create_student(&app, "Fresh", "Start").await;

    let response = app
        .oneshot(get_request(&format!("/api/reports/student/{}/progress", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["student_name"], "Fresh Start");
    assert_eq!(body["sessions"]["total_sessions"], 0);
    assert_eq!(body["sessions"]["attendance_rate"], 0.0);
    assert_eq!(body["sessions"]["average_duration_minutes"], 0.0);
    assert_eq!(body["soap_note_count"], 0);
    assert_eq!(body["goals"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_progress_report_for_unknown_student_is_404() {
    let app = setup_app().await;

    let response = app
        .oneshot(get_request("/api/reports/student/404/progress"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_report_aggregates() {
    let app = setup_app().await;
    let id = create_student(&app, "Agg", "Regate").await;

    create_session(&app, id, "2026-03-02", "Completed").await;
    create_session(&app, id, "2026-03-09", "Completed").await;
    create_session(&app, id, "2026-03-16", "No Show").await;
    create_session(&app, id, "2026-03-23", "Cancelled").await;

    let uri = format!(
        "/api/reports/student/{}/progress?start_date=2026-03-01&end_date=2026-03-31",
        id
    );
    let response = app.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sessions"]["total_sessions"], 4);
    assert_eq!(body["sessions"]["completed"], 2);
    assert_eq!(body["sessions"]["no_shows"], 1);
    assert_eq!(body["sessions"]["cancelled"], 1);
    // cancelled sessions do not count against attendance
    assert_eq!(body["sessions"]["attendance_rate"], 66.67);
    assert_eq!(body["sessions"]["average_duration_minutes"], 30.0);
    assert_eq!(body["sessions"]["by_type"]["Individual"], 4);
}

#[tokio::test]
async fn test_attendance_report_totals() {
    let app = setup_app().await;
    let a = create_student(&app, "Always", "There").await;
    let b = create_student(&app, "Never", "There").await;

    create_session(&app, a, "2026-03-02", "Completed").await;
    create_session(&app, a, "2026-03-09", "Completed").await;
    create_session(&app, b, "2026-03-02", "No Show").await;

    let response = app
        .oneshot(get_request(
            "/api/reports/attendance?start_date=2026-03-01&end_date=2026-03-31",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let students = body["students"].as_array().unwrap();
    assert_eq!(students.len(), 2);

    let always = students.iter().find(|s| s["student_id"] == a).unwrap();
    assert_eq!(always["completed"], 2);
    assert_eq!(always["attendance_rate"], 100.0);
    assert_eq!(always["service_minutes"], 60);

    let never = students.iter().find(|s| s["student_id"] == b).unwrap();
    assert_eq!(never["no_shows"], 1);
    assert_eq!(never["attendance_rate"], 0.0);

    assert_eq!(body["totals"]["total_sessions"], 3);
    assert_eq!(body["totals"]["completed"], 2);
    assert_eq!(body["totals"]["attendance_rate"], 66.67);
}

#[tokio::test]
async fn test_analytics_overview() {
    let app = setup_app().await;
    let id = create_student(&app, "Over", "View").await;
    create_session(&app, id, "2026-03-02", "Completed").await;
    create_session(&app, id, "2026-04-06", "Scheduled").await;

    let response = app
        .oneshot(get_request(
            "/api/reports/analytics/overview?start_date=2026-03-01&end_date=2026-04-30",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["students"]["total_students"], 1);
    assert_eq!(body["students"]["active_students"], 1);
    assert_eq!(body["students"]["grade_distribution"]["5"], 1);
    assert_eq!(body["soap_note_count"], 0);

    let monthly = body["monthly_sessions"].as_array().unwrap();
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0]["label"], "2026-03");
    assert_eq!(monthly[0]["count"], 1);

    let by_type = body["sessions_by_type"].as_array().unwrap();
    assert_eq!(by_type[0]["label"], "Individual");
    assert_eq!(by_type[0]["count"], 2);
}
