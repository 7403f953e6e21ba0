//! Authentication guard and auth routes
//!
//! Protected routes sit behind `auth_middleware`. The toggle is resolved at
//! startup and carried in `AppState`: when auth is disabled every request
//! passes through with no user attached; when enabled a valid bearer token
//! from `POST /api/auth/login` is required.
//!
//! Passwords are stored as `salt$hex(sha256(salt || password))`. Tokens are
//! random 32-byte hex strings persisted in the auth_tokens table, so logout
//! is a real revocation.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::AppState;

/// The requester resolved by the guard. `None` means the guard is disabled.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

/// Reject callers whose role cannot mutate records
pub fn require_write(current: &CurrentUser) -> ApiResult<()> {
    match &current.0 {
        Some(user) if !user.role.can_write() => Err(ApiError::Forbidden(
            "insufficient permissions".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Reject callers who are not admins
pub fn require_admin(current: &CurrentUser) -> ApiResult<()> {
    match &current.0 {
        Some(user) if user.role != crate::models::Role::Admin => {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
        _ => Ok(()),
    }
}

/// Authentication middleware for protected routes
///
/// Returns 401 for missing, unknown, or expired tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.auth_disabled {
        request.extensions_mut().insert(CurrentUser(None));
        return Ok(next.run(request).await);
    }

    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;

    let user = users::find_user_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| {
            warn!("Rejected request with invalid or expired token");
            ApiError::Unauthorized("invalid or expired token".to_string())
        })?;

    request.extensions_mut().insert(CurrentUser(Some(user)));
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.to_string())
}

// ========================================
// Password hashing and token generation
// ========================================

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex_encode(&salt);
    format!("{}${}", salt_hex, digest(&salt_hex, password))
}

/// Constant-shape verification against a stored `salt$hash` value
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == hash
}

/// Random 32-byte hex bearer token
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ========================================
// Auth routes
// ========================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// POST /api/auth/login
///
/// Verifies credentials and issues a fresh bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = users::find_by_username(&state.db, &payload.username)
        .await?
        .filter(|u| verify_password(&payload.password, &u.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("invalid username or password".to_string()))?;

    let token = generate_token();
    let expires_at = users::insert_token(&state.db, &token, user.id).await?;

    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// POST /api/auth/logout
///
/// Revokes the presented token. Protected: requires a valid token unless
/// auth is disabled, in which case there is nothing to revoke.
pub async fn logout(State(state): State<AppState>, request: Request) -> ApiResult<Json<serde_json::Value>> {
    if let Some(token) = bearer_token(&request) {
        users::delete_token(&state.db, &token).await?;
    }
    Ok(Json(serde_json::json!({ "message": "logged out" })))
}

/// GET /api/auth/me
///
/// With the guard disabled there is no user context; that is reported as a
/// successful response with a null user rather than an error.
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<serde_json::Value> {
    match current.0 {
        Some(user) => Json(serde_json::json!({ "user": user, "auth_disabled": false })),
        None => Json(serde_json::json!({ "user": null, "auth_disabled": true })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn malformed_stored_hash_rejected() {
        assert!(!verify_password("anything", "no-dollar-sign"));
    }
}
