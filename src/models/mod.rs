//! Entity types shared between the database layer and API handlers

pub mod session;
pub mod soap_note;
pub mod student;
pub mod user;

pub use session::{EventType, Session, SessionStatus, SessionType};
pub use soap_note::SoapNote;
pub use student::{Goal, Student};
pub use user::{Role, User};
