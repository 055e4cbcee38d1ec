//! Parameter sanitation and validation
//!
//! Sanitizers normalize raw query-string values; validators turn them into
//! typed values or reject them with a [`ParameterError`](crate::core::error::ParameterError).

pub mod filters;
pub mod validators;
