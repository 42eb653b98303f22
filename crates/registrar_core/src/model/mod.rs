//! Student/course domain model.
//!
//! # Responsibility
//! - Define the two aggregates and their create/patch inputs.
//! - Own field-level validation shared by repositories and services.
//!
//! # Invariants
//! - Every aggregate is identified by a stable, never-reused UUID.
//! - Reference sets (`course_refs`, `student_refs`) are not part of any
//!   create or patch input.

pub mod course;
pub mod student;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid date regex"));

/// Field-level validation failure for student/course input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    EmptyField(&'static str),
    /// Email does not have a `local@domain.tld` shape.
    InvalidEmail(String),
    /// Date is not a real calendar date in `YYYY-MM-DD` form.
    InvalidDate(String),
    /// A list entry is blank (e.g. one course topic).
    EmptyListItem { field: &'static str, index: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::InvalidEmail(value) => write!(f, "email is not valid: `{value}`"),
            Self::InvalidDate(value) => {
                write!(f, "date of birth must be YYYY-MM-DD, got `{value}`")
            }
            Self::EmptyListItem { field, index } => {
                write!(f, "{field}[{index}] must not be empty")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn validate_email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(value.to_string()))
    }
}

pub(crate) fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidDate(value.to_string());
    let caps = ISO_DATE_RE.captures(value).ok_or_else(invalid)?;

    let year: u32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;

    let max_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return Err(invalid()),
    };
    if day == 0 || day > max_day {
        return Err(invalid());
    }
    Ok(())
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::{validate_email, validate_iso_date, ValidationError};

    #[test]
    fn iso_date_accepts_leap_day_and_rejects_impossible_dates() {
        assert!(validate_iso_date("2000-02-29").is_ok());
        assert!(validate_iso_date("1999-12-31").is_ok());
        assert!(matches!(
            validate_iso_date("1900-02-29"),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(validate_iso_date("2001-13-01").is_err());
        assert!(validate_iso_date("2001-04-31").is_err());
        assert!(validate_iso_date("01/01/2000").is_err());
    }

    #[test]
    fn email_requires_domain_with_dot() {
        assert!(validate_email("student@example.com").is_ok());
        assert!(validate_email("student@localhost").is_err());
        assert!(validate_email("no spaces@example.com").is_err());
    }
}
