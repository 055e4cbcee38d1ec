//! Typed error handling for the REST layer
//!
//! Every failure a request can hit is one of four kinds:
//!
//! - [`RestError::InvalidParameter`]: a query parameter failed sanitation or
//!   validation; raised before any domain fetch
//! - [`RestError::Forbidden`]: the permission gate denied the request
//! - [`RestError::InvalidResourceId`]: a single-item lookup missed
//! - [`RestError::UpstreamFailure`]: the domain adapter failed or returned a
//!   record that could not be shaped
//!
//! [`RestError::Internal`] is reserved for startup and configuration faults.
//!
//! # Example
//!
//! ```rust,ignore
//! match controller.get_item(ResourceKind::Group, 42, &params, &principal).await {
//!     Ok(item) => println!("{}", item),
//!     Err(RestError::InvalidResourceId { kind, id }) => {
//!         println!("{} {} does not exist", kind, id);
//!     }
//!     Err(e) => eprintln!("{} ({})", e, e.status_code()),
//! }
//! ```

use crate::core::auth::Action;
use crate::core::schema::ResourceKind;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The error type returned by the resource controller
#[derive(Debug)]
pub enum RestError {
    /// A request parameter was rejected
    InvalidParameter(ParameterError),

    /// Authorization denied
    Forbidden { kind: ResourceKind, action: Action },

    /// Single-item lookup miss
    InvalidResourceId { kind: ResourceKind, id: u64 },

    /// Domain adapter failure or malformed record
    UpstreamFailure { kind: ResourceKind, message: String },

    /// Startup/configuration fault (should not happen while serving)
    Internal(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::InvalidParameter(e) => write!(f, "{}", e),
            RestError::Forbidden { kind, action } => {
                write!(f, "Sorry, you are not allowed to {} {} resources", action, kind)
            }
            RestError::InvalidResourceId { kind, id } => {
                write!(f, "Invalid {} id: {}", kind, id)
            }
            RestError::UpstreamFailure { kind, message } => {
                write!(f, "Failed to load {} data: {}", kind, message)
            }
            RestError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestError::InvalidParameter(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RestError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            RestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RestError::InvalidResourceId { .. } => StatusCode::NOT_FOUND,
            RestError::UpstreamFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RestError::InvalidParameter(_) => "invalid_parameter",
            RestError::Forbidden { .. } => "forbidden",
            RestError::InvalidResourceId { .. } => "invalid_resource_id",
            RestError::UpstreamFailure { .. } => "upstream_failure",
            RestError::Internal(_) => "internal_error",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            status: self.status_code().as_u16(),
            data: Some(self.details()),
        }
    }

    /// Error details; always carries the status
    fn details(&self) -> serde_json::Value {
        let mut data = match self {
            RestError::InvalidParameter(e) => e.details(),
            RestError::Forbidden { kind, action } => serde_json::json!({
                "resource": kind.as_str(),
                "action": action.as_str(),
            }),
            RestError::InvalidResourceId { kind, id } => serde_json::json!({
                "resource": kind.as_str(),
                "id": id,
            }),
            RestError::UpstreamFailure { kind, .. } => serde_json::json!({
                "resource": kind.as_str(),
            }),
            RestError::Internal(_) => serde_json::json!({}),
        };
        data["status"] = serde_json::json!(self.status_code().as_u16());
        data
    }

    /// Shorthand for an upstream failure
    pub fn upstream(kind: ResourceKind, message: impl Into<String>) -> Self {
        RestError::UpstreamFailure {
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Parameter Errors
// =============================================================================

/// Reasons a request parameter is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// Value is not one of the declared enum values
    NotInEnum {
        param: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Value could not be read as the declared type
    InvalidType {
        param: String,
        value: String,
        expected: &'static str,
    },

    /// Value parsed but violates a range constraint
    OutOfRange {
        param: String,
        value: String,
        message: String,
    },
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::NotInEnum {
                param,
                value,
                allowed,
            } => write!(
                f,
                "Invalid parameter '{}': '{}' is not one of {}",
                param,
                value,
                allowed.join(", ")
            ),
            ParameterError::InvalidType {
                param,
                value,
                expected,
            } => write!(
                f,
                "Invalid parameter '{}': '{}' is not of type {}",
                param, value, expected
            ),
            ParameterError::OutOfRange {
                param,
                value,
                message,
            } => write!(f, "Invalid parameter '{}' ({}): {}", param, value, message),
        }
    }
}

impl std::error::Error for ParameterError {}

impl ParameterError {
    /// Name of the rejected parameter
    pub fn param(&self) -> &str {
        match self {
            ParameterError::NotInEnum { param, .. }
            | ParameterError::InvalidType { param, .. }
            | ParameterError::OutOfRange { param, .. } => param,
        }
    }

    fn details(&self) -> serde_json::Value {
        let mut details = serde_json::json!({ "param": self.param() });
        if let ParameterError::NotInEnum { allowed, .. } = self {
            details["allowed"] = serde_json::json!(allowed);
        }
        details
    }
}

impl From<ParameterError> for RestError {
    fn from(err: ParameterError) -> Self {
        RestError::InvalidParameter(err)
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;
