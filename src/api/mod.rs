//! HTTP API
//!
//! Handler modules grouped by resource. Routing lives in `crate::build_router`
//! so the full table is visible in one place.

pub mod auth;
pub mod calendar;
pub mod health;
pub mod reports;
pub mod sessions;
pub mod soap;
pub mod students;
