// Error types for HAL rendering and link resolution

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    #[error("Unable to resolve route '{route}': {reason}")]
    UnresolvableRoute { route: String, reason: String },

    #[error("Invalid route template '{template}': {reason}")]
    InvalidRoute { template: String, reason: String },

    #[error("Cyclic embedding detected at '{path}' (depth {depth})")]
    CyclicEmbedding { path: String, depth: usize },

    #[error("Resource '{0}' has neither a self link nor a route to build one from")]
    MissingSelfLink(String),

    #[error("Value rendered for route '{0}' is not an entity")]
    NonEntityValue(String),

    #[error("Invalid HAL document: {0}")]
    InvalidDocument(String),
}

impl HalError {
    /// Get the HTTP status code for this error
    ///
    /// Rendering failures indicate misconfiguration, never a client mistake.
    pub fn status_code(&self) -> u16 {
        match self {
            HalError::InvalidDocument(_) => 400,
            _ => 500,
        }
    }

    pub(crate) fn unresolvable(route: &str, reason: impl Into<String>) -> Self {
        HalError::UnresolvableRoute {
            route: route.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(HalError::unresolvable("users", "missing id").status_code(), 500);
        assert_eq!(
            HalError::CyclicEmbedding {
                path: "user.manager".to_string(),
                depth: 3
            }
            .status_code(),
            500
        );
        assert_eq!(HalError::InvalidDocument("x".to_string()).status_code(), 400);
    }

    #[test]
    fn test_display() {
        let err = HalError::unresolvable("users", "missing parameter 'id'");
        assert_eq!(
            err.to_string(),
            "Unable to resolve route 'users': missing parameter 'id'"
        );
    }
}
