// Error types for REST resources, configuration and logging

use crate::event::Operation;
use armature_hal::HalError;
use thiserror::Error;

/// Failures raised by the resource engine.
///
/// "Not found" is not an error; it is reported as
/// [`Outcome::NotFound`](crate::Outcome::NotFound).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid data provided to {operation}: expected {expected}")]
    InvalidInputShape {
        operation: Operation,
        expected: &'static str,
    },

    #[error("Missing identifier for {0}")]
    MissingIdentifier(Operation),

    #[error("No listener returned a result for {0}")]
    NoListenerResult(Operation),

    #[error("Unexpected result from {operation}: expected {expected}, got {actual}")]
    UnexpectedResultShape {
        operation: Operation,
        expected: &'static str,
        actual: String,
    },
}

impl ResourceError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ResourceError::InvalidInputShape { .. } | ResourceError::MissingIdentifier(_) => 400,
            ResourceError::NoListenerResult(_) | ResourceError::UnexpectedResultShape { .. } => {
                500
            }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            ResourceError::InvalidInputShape { operation, .. }
            | ResourceError::UnexpectedResultShape { operation, .. } => *operation,
            ResourceError::MissingIdentifier(operation)
            | ResourceError::NoListenerResult(operation) => *operation,
        }
    }
}

/// Everything that can go wrong while dispatching a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid query parameter '{name}': {reason}")]
    InvalidQuery { name: String, reason: String },
}

impl RestError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RestError::Resource(err) => err.status_code(),
            RestError::Hal(err) => err.status_code(),
            RestError::InvalidBody(_) | RestError::InvalidQuery { .. } => 400,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file '{path}': {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create rolling log appender in '{directory}': {reason}")]
    RollingAppender { directory: String, reason: String },

    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

pub type Result<T> = std::result::Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_status_codes() {
        let invalid = ResourceError::InvalidInputShape {
            operation: Operation::Create,
            expected: "an object",
        };
        assert_eq!(invalid.status_code(), 400);
        assert_eq!(ResourceError::MissingIdentifier(Operation::Fetch).status_code(), 400);
        assert_eq!(ResourceError::NoListenerResult(Operation::Fetch).status_code(), 500);
        assert_eq!(invalid.operation(), Operation::Create);
    }

    #[test]
    fn test_rest_error_classification() {
        let err = RestError::from(ResourceError::NoListenerResult(Operation::FetchAll));
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "No listener returned a result for fetch_all");

        let err = RestError::InvalidQuery {
            name: "page".to_string(),
            reason: "must be a positive integer".to_string(),
        };
        assert!(err.is_client_error());

        let err = RestError::from(HalError::MissingSelfLink("users".to_string()));
        assert_eq!(err.status_code(), 500);
    }
}
