//! Request field validation
//!
//! Shared checks for the mutating endpoints. Each function returns the first
//! violation as an `ApiError::Validation` naming the offending field.

use crate::error::{ApiError, ApiResult};

const VALID_GRADES: &[&str] = &[
    "PK", "K", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "Post-Secondary",
];

/// Name fields: 1-100 chars, letters plus space/hyphen/apostrophe/period
pub fn name(field: &str, value: &str) -> ApiResult<()> {
    let trimmed = value.trim();
    // length in characters, not bytes, so accented names are not penalized
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ApiError::Validation(format!(
            "{} must be between 1-100 characters",
            field
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'))
    {
        return Err(ApiError::Validation(format!(
            "{} contains invalid characters",
            field
        )));
    }
    Ok(())
}

pub fn optional_name(field: &str, value: Option<&str>) -> ApiResult<()> {
    match value {
        Some(v) => name(field, v),
        None => Ok(()),
    }
}

pub fn pronouns(value: Option<&str>) -> ApiResult<()> {
    if let Some(v) = value {
        if v.len() > 50 {
            return Err(ApiError::Validation(
                "pronouns must be 50 characters or less".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn grade_level(value: Option<&str>) -> ApiResult<()> {
    if let Some(v) = value {
        if !VALID_GRADES.contains(&v) {
            return Err(ApiError::Validation(format!(
                "grade_level must be one of: {}",
                VALID_GRADES.join(", ")
            )));
        }
    }
    Ok(())
}

pub fn monthly_services(value: i64) -> ApiResult<()> {
    if !(0..=50).contains(&value) {
        return Err(ApiError::Validation(
            "monthly_services must be between 0-50".to_string(),
        ));
    }
    Ok(())
}

/// Free-text fields with a length ceiling
pub fn text_limit(field: &str, value: Option<&str>, max: usize) -> ApiResult<()> {
    if let Some(v) = value {
        if v.len() > max {
            return Err(ApiError::Validation(format!(
                "{} must be {} characters or less",
                field, max
            )));
        }
    }
    Ok(())
}

pub fn required_text(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    text_limit(field, Some(value), max)
}

/// End-after-start check for clock times
pub fn time_order(start: chrono::NaiveTime, end: chrono::NaiveTime) -> ApiResult<()> {
    if start >= end {
        return Err(ApiError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    Ok(())
}
