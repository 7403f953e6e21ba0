//! SOAP clinical note entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Structured clinical note (Subjective / Objective / Assessment / Plan)
///
/// Optionally linked to one session; always linked to one student. Once
/// anonymized, section text is replaced and the note becomes read-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SoapNote {
    pub id: i64,
    pub student_id: i64,
    pub session_id: Option<i64>,
    pub session_date: NaiveDate,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub clinician_signature: Option<String>,
    pub anonymized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SoapNote {
    /// JSON form with the four section bodies withheld
    ///
    /// Used for `include_content=false` listings and for anonymized notes.
    pub fn to_redacted_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("SoapNote serializes");
        if let Some(map) = value.as_object_mut() {
            for section in ["subjective", "objective", "assessment", "plan"] {
                map.remove(section);
            }
        }
        value
    }

    /// JSON form respecting the caller's content preference
    pub fn to_json(&self, include_content: bool) -> serde_json::Value {
        if include_content && !self.anonymized {
            serde_json::to_value(self).expect("SoapNote serializes")
        } else {
            self.to_redacted_json()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_json_drops_sections_only() {
        let note = SoapNote {
            id: 7,
            student_id: 1,
            session_id: None,
            session_date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
            subjective: Some("reports good week".to_string()),
            objective: Some("40 trials".to_string()),
            assessment: Some("progressing".to_string()),
            plan: Some("continue".to_string()),
            clinician_signature: Some("J. Doe, SLP".to_string()),
            anonymized: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let redacted = note.to_redacted_json();
        assert!(redacted.get("subjective").is_none());
        assert!(redacted.get("plan").is_none());
        assert_eq!(redacted["id"], 7);
        assert_eq!(redacted["clinician_signature"], "J. Doe, SLP");
    }
}
