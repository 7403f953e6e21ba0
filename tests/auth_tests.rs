//! Authentication guard integration tests
//!
//! Same requests with the guard on and off, plus the login/logout lifecycle.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`

use caseload::api::auth::hash_password;
use caseload::models::Role;
use caseload::{build_router, db, AppState};

async fn setup_pool() -> SqlitePool {
    db::init_memory_database()
        .await
        .expect("in-memory database")
}

/// Seed one account directly in the database
async fn seed_user(pool: &SqlitePool, username: &str, password: &str, role: Role) {
    db::users::insert(
        pool,
        username,
        &format!("{}@example.org", username),
        &hash_password(password),
        role,
    )
    .await
    .expect("seed user");
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn login(app: &axum::Router, username: &str, password: &str) -> String {
    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "username": username, "password": password }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_guard_disabled_passes_credentialless_requests() {
    let pool = setup_pool().await;
    let app = build_router(AppState::new(pool, true));

    let response = app.oneshot(get_request("/api/students", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_guard_enabled_rejects_credentialless_requests() {
    let pool = setup_pool().await;
    let app = build_router(AppState::new(pool, false));

    let response = app
        .clone()
        .oneshot(get_request("/api/students", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // health stays public either way
    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_token_grants_access() {
    let pool = setup_pool().await;
    seed_user(&pool, "clinician", "secret pass", Role::Clinician).await;
    let app = build_router(AppState::new(pool, false));

    let token = login(&app, "clinician", "secret pass").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/students", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["auth_disabled"], false);
    assert_eq!(body["user"]["username"], "clinician");
    assert_eq!(body["user"]["role"], "clinician");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_me_with_guard_disabled_reports_null_user() {
    let pool = setup_pool().await;
    let app = build_router(AppState::new(pool, true));

    let response = app.oneshot(get_request("/api/auth/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["auth_disabled"], true);
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let pool = setup_pool().await;
    seed_user(&pool, "clinician", "right", Role::Clinician).await;
    let app = build_router(AppState::new(pool, false));

    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({ "username": "clinician", "password": "wrong" }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let pool = setup_pool().await;
    let app = build_router(AppState::new(pool, false));

    let response = app
        .oneshot(get_request("/api/students", Some("not-a-real-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let pool = setup_pool().await;
    seed_user(&pool, "clinician", "secret pass", Role::Clinician).await;
    let app = build_router(AppState::new(pool, false));

    let token = login(&app, "clinician", "secret pass").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/logout",
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/students", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let pool = setup_pool().await;
    seed_user(&pool, "viewer", "look only", Role::Viewer).await;
    let app = build_router(AppState::new(pool, false));

    let token = login(&app, "viewer", "look only").await;

    // reads pass
    let response = app
        .clone()
        .oneshot(get_request("/api/students", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // writes are forbidden
    let request = json_request(
        "POST",
        "/api/students",
        Some(&token),
        json!({ "first_name": "No", "last_name": "Write" }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_clinician_cannot_hard_delete_student() {
    let pool = setup_pool().await;
    seed_user(&pool, "clinician", "secret pass", Role::Clinician).await;
    seed_user(&pool, "boss", "admin pass", Role::Admin).await;
    let app = build_router(AppState::new(pool, false));

    let clinician = login(&app, "clinician", "secret pass").await;
    let admin = login(&app, "boss", "admin pass").await;

    let request = json_request(
        "POST",
        "/api/students",
        Some(&clinician),
        json!({ "first_name": "Role", "last_name": "Check" }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let student = extract_json(response.into_body()).await;
    let id = student["id"].as_i64().unwrap();

    // deactivation is admin-only
    let delete = |token: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/students/{}", id))
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete(&clinician)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.oneshot(delete(&admin)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
