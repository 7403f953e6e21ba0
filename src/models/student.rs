//! Student and goal entities
//!
//! Students are soft-deleted (active=false) through the REST surface and may
//! be anonymized in place: name fields are scrubbed while the stable
//! `anonymous_id` keeps aggregate reporting meaningful.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Student record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub pronouns: Option<String>,
    pub grade_level: Option<String>,
    pub monthly_services: i64,
    pub active: bool,
    pub anonymized: bool,
    pub anonymized_at: Option<DateTime<Utc>>,
    /// Stable 32-hex identifier, safe for analytics after anonymization
    pub anonymous_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Human-facing name; falls back to the anonymous id once scrubbed
    pub fn display_name(&self) -> String {
        if self.anonymized {
            format!("Student {}", &self.anonymous_id[..8])
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Therapy goal attached to a student
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: i64,
    pub student_id: i64,
    pub description: String,
    pub completion_criteria: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
