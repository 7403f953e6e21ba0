//! User accounts for the authentication guard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Access level attached to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Clinician,
    Viewer,
}

impl Role {
    /// Whether the role may mutate records. Viewers are read-only.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::Clinician)
    }
}

/// Account record; the password hash never leaves the server
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
