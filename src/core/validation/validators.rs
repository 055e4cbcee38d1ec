//! Reusable parameter validators
//!
//! Each validator reads one sanitized value and either returns the typed
//! value or a [`ParameterError`] naming the parameter.

use crate::core::error::ParameterError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Validator: value must be in the declared enum
pub fn in_enum(param: &str, value: &str, allowed: &[String]) -> Result<(), ParameterError> {
    if allowed.iter().any(|a| a == value) {
        Ok(())
    } else {
        Err(ParameterError::NotInEnum {
            param: param.to_string(),
            value: value.to_string(),
            allowed: allowed.to_vec(),
        })
    }
}

/// Validator: every entry must be in the declared enum
pub fn all_in_enum(param: &str, values: &[String], allowed: &[String]) -> Result<(), ParameterError> {
    values.iter().try_for_each(|v| in_enum(param, v, allowed))
}

/// Validator: boolean flag
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and the empty string (false).
pub fn boolean(param: &str, value: &str) -> Result<bool, ParameterError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ParameterError::InvalidType {
            param: param.to_string(),
            value: value.to_string(),
            expected: "boolean",
        }),
    }
}

/// Validator: value must be at least `min`
pub fn at_least(param: &str, value: u64, min: u64) -> Result<u64, ParameterError> {
    if value < min {
        Err(ParameterError::OutOfRange {
            param: param.to_string(),
            value: value.to_string(),
            message: format!("must be greater than or equal to {}", min),
        })
    } else {
        Ok(value)
    }
}

/// Validator: value must be between `min` and `max` (inclusive)
pub fn between(param: &str, value: u64, min: u64, max: u64) -> Result<u64, ParameterError> {
    at_least(param, value, min)?;
    if value > max {
        Err(ParameterError::OutOfRange {
            param: param.to_string(),
            value: value.to_string(),
            message: format!("must be between {} and {}", min, max),
        })
    } else {
        Ok(value)
    }
}

/// Validator: ISO-8601 / RFC-3339 date-time
///
/// A value without offset is read as UTC.
pub fn date_time(param: &str, value: &str) -> Result<DateTime<Utc>, ParameterError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| ParameterError::InvalidType {
            param: param.to_string(),
            value: value.to_string(),
            expected: "date-time",
        })
}
