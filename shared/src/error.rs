//! Error kinds for the Meetings API and their HTTP mapping.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a meetings request.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed JSON, missing or empty field, unknown field, bad enum, start > end
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// No meeting matches the requested id
    #[error("{0}")]
    NotFound(String),

    /// RSVP overlap or unique-index violation
    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },

    /// Known path, unsupported method
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    /// Request deadline exceeded
    #[error("Request deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Option<Value>) -> Self {
        Error::Conflict {
            message: message.into(),
            details,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::Conflict { .. } => 409,
            Error::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Stable machine-readable code written to the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::NotFound(_) => "not_found",
            Error::MethodNotAllowed(_) => "method_not_allowed",
            Error::Conflict { .. } => "conflict",
            Error::Timeout(_) => "timeout",
            Error::Backend(_) => "backend",
            Error::Config(_) | Error::Aws(_) | Error::Serialization(_) | Error::Internal(_) => {
                "internal"
            }
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Error::Validation { details, .. } | Error::Conflict { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Whether the error reflects a client mistake rather than a server fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Error::NotFound(what),
            StoreError::Conflict(message) => Error::conflict(message, None),
            StoreError::Backend(message) => Error::Backend(message),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation {
            message: format!("Invalid meeting: {}", errors),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("bad").status_code(), 400);
        assert_eq!(Error::NotFound("meeting".into()).status_code(), 404);
        assert_eq!(Error::conflict("taken", None).status_code(), 409);
        assert_eq!(Error::Timeout(Duration::from_secs(10)).status_code(), 504);
        assert_eq!(Error::Backend("down".into()).status_code(), 500);
        assert_eq!(Error::Internal("oops".into()).status_code(), 500);
    }

    #[test]
    fn test_store_errors_map_to_kinds() {
        let err: Error = StoreError::Conflict("duplicate key".into()).into();
        assert_eq!(err.kind(), "conflict");
        let err: Error = StoreError::Backend("connection reset".into()).into();
        assert_eq!(err.kind(), "backend");
        let err: Error = StoreError::NotFound("meeting".into()).into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_internal_errors_share_a_kind() {
        assert_eq!(Error::Config("missing".into()).kind(), "internal");
        assert_eq!(Error::Aws("throttled".into()).kind(), "internal");
        assert!(!Error::Aws("throttled".into()).is_client_error());
    }
}
