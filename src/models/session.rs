//! Session entity and its classification enums
//!
//! A session doubles as a calendar event: `event_type` distinguishes therapy
//! sessions from meetings, assessments and reminders, and the calendar API
//! renders rows of this table as events.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What kind of calendar entry this row is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum EventType {
    Session,
    Meeting,
    Assessment,
    Reminder,
    Other,
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Session
    }
}

/// Service delivery format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum SessionType {
    Individual,
    Group,
    Assessment,
    Consultation,
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Individual
    }
}

/// Scheduling lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(rename = "No Show")]
    #[sqlx(rename = "No Show")]
    NoShow,
    #[serde(rename = "Makeup Needed")]
    #[sqlx(rename = "Makeup Needed")]
    MakeupNeeded,
    #[serde(rename = "Excused Absence")]
    #[sqlx(rename = "Excused Absence")]
    ExcusedAbsence,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Scheduled
    }
}

impl SessionStatus {
    /// Calendar rendering color, matching the web client's palette
    pub fn color(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "#007bff",
            SessionStatus::Completed => "#28a745",
            SessionStatus::MakeupNeeded => "#ffc107",
            SessionStatus::ExcusedAbsence => "#6c757d",
            SessionStatus::Cancelled | SessionStatus::NoShow => "#dc3545",
        }
    }
}

/// Logged or scheduled interaction with one student
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub student_id: i64,
    pub session_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub event_type: EventType,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub plan_notes: Option<String>,
    pub is_makeup: bool,
    pub makeup_for_session_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Serde adapter for `HH:MM` clock times (accepts `HH:MM:SS` on input)
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map_err(|_| format!("invalid time '{}', expected HH:MM", s))
    }

    /// Variant of the adapter for optional fields
    pub mod option {
        use chrono::NaiveTime;
        use serde::{self, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let s: Option<String> = Option::deserialize(deserializer)?;
            match s {
                Some(s) => super::parse(&s).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_clock_times() {
        let session = Session {
            id: 1,
            student_id: 1,
            session_date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
            event_type: EventType::Session,
            session_type: SessionType::Individual,
            status: SessionStatus::Scheduled,
            location: None,
            notes: None,
            plan_notes: None,
            is_makeup: false,
            makeup_for_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(session.duration_minutes(), 45);
    }

    #[test]
    fn hhmm_accepts_both_forms() {
        assert_eq!(
            hhmm::parse("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(
            hhmm::parse("09:30:00").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(hhmm::parse("9.30").is_err());
    }

    #[test]
    fn status_serde_uses_display_labels() {
        let json = serde_json::to_string(&SessionStatus::NoShow).unwrap();
        assert_eq!(json, "\"No Show\"");
        let back: SessionStatus = serde_json::from_str("\"Makeup Needed\"").unwrap();
        assert_eq!(back, SessionStatus::MakeupNeeded);
    }
}
