//! Validation helpers for request field values.
//!
//! These constants and functions centralize validation of string values
//! against known valid options, plus the civil-date format check used by
//! the gateway.

use chrono::NaiveDate;
use validator::ValidationError;

/// Valid patient gender values
pub const VALID_GENDERS: &[&str] = &["male", "female"];

/// Valid service audience values (catalog side)
pub const VALID_AUDIENCES: &[&str] = &["male", "female", "both"];

/// Validates that a value is one of the allowed values.
///
/// # Arguments
/// * `value` - The value to validate
/// * `valid_values` - Slice of valid values
/// * `field_name` - Name of the field (for error message)
///
/// # Returns
/// * `Ok(())` if value is valid
/// * `Err(String)` with a descriptive error message if invalid
pub fn validate_enum_value(value: &str, valid_values: &[&str], field_name: &str) -> Result<(), String> {
    if valid_values.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Invalid {}. Must be one of: {}",
            field_name,
            valid_values.join(", ")
        ))
    }
}

/// Validates a patient gender value
pub fn validate_gender(gender: &str) -> Result<(), String> {
    validate_enum_value(gender, VALID_GENDERS, "gender")
}

/// `validator`-derive hook for request gender fields
pub fn validate_gender_field(gender: &str) -> Result<(), ValidationError> {
    validate_gender(gender).map_err(|_| ValidationError::new("gender"))
}

/// Parses a `YYYY-MM-DD` civil date, rejecting anything else
pub fn parse_civil_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Expected YYYY-MM-DD", value))
}

/// `validator`-derive hook for request date-of-birth fields
pub fn validate_civil_date_field(value: &str) -> Result<(), ValidationError> {
    parse_civil_date(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("date"))
}
