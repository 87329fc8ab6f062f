//! Problem Details (RFC 7807) responses.
//!
//! ```
//! use armature_rest::ApiProblem;
//!
//! let problem = ApiProblem::new(422, "Email address is already registered")
//!     .with_additional("field", "email");
//!
//! let body = problem.to_value();
//! assert_eq!(body["type"], "about:blank");
//! assert_eq!(body["title"], "Unprocessable Entity");
//! assert_eq!(body["field"], "email");
//! ```

use crate::error::RestError;
use crate::message::RestResponse;
use http::StatusCode;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Content type of problem documents.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Members owned by the problem document itself.
pub const RESERVED_MEMBERS: [&str; 5] = ["type", "title", "status", "detail", "instance"];

const DEFAULT_TYPE: &str = "about:blank";

/// A structured error document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiProblem {
    #[serde(rename = "type")]
    problem_type: String,
    title: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
    #[serde(flatten)]
    additional: Map<String, Value>,
}

impl ApiProblem {
    /// Create a problem for `status`.
    ///
    /// Values outside the valid HTTP status range become 500; the title is
    /// the status reason phrase.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        let status = normalize_status(status);
        let detail = detail.into();
        Self {
            problem_type: DEFAULT_TYPE.to_string(),
            title: reason_phrase(status),
            status,
            detail: (!detail.is_empty()).then_some(detail),
            instance: None,
            additional: Map::new(),
        }
    }

    /// Create a problem carrying only a status.
    pub fn from_status(status: u16) -> Self {
        Self::new(status, "")
    }

    pub fn with_type(mut self, problem_type: impl Into<String>) -> Self {
        self.problem_type = problem_type.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Add an extension member. Reserved member names are ignored.
    pub fn with_additional(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_MEMBERS.contains(&key.as_str()) {
            self.additional.insert(key, value.into());
        }
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn problem_type(&self) -> &str {
        &self.problem_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn additional(&self) -> &Map<String, Value> {
        &self.additional
    }

    /// The problem document.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.problem_type.clone()));
        object.insert("title".to_string(), Value::String(self.title.clone()));
        object.insert("status".to_string(), self.status.into());
        if let Some(detail) = &self.detail {
            object.insert("detail".to_string(), Value::String(detail.clone()));
        }
        if let Some(instance) = &self.instance {
            object.insert("instance".to_string(), Value::String(instance.clone()));
        }
        for (key, value) in &self.additional {
            if !RESERVED_MEMBERS.contains(&key.as_str()) {
                object.insert(key.clone(), value.clone());
            }
        }
        Value::Object(object)
    }

    /// Parse a problem document; an invalid status becomes 500.
    pub fn from_value(value: Value) -> Option<Self> {
        let mut problem: ApiProblem = serde_json::from_value(value).ok()?;
        problem.status = normalize_status(problem.status);
        Some(problem)
    }

    /// Build the HTTP response for this problem.
    ///
    /// An `allow` extension holding method names is mirrored into the
    /// `Allow` header.
    pub fn to_response(&self) -> RestResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = RestResponse::new(status)
            .with_json_body(&self.to_value())
            .with_header(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_CONTENT_TYPE));

        if let Some(Value::Array(methods)) = self.additional.get("allow") {
            let allow = methods
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response = response.with_header(ALLOW, value);
            }
        }
        response
    }
}

fn normalize_status(status: u16) -> u16 {
    if (100..=599).contains(&status) {
        status
    } else {
        500
    }
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Error")
        .to_string()
}

/// Converts errors into problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemMapper {
    expose_internal_errors: bool,
}

impl ProblemMapper {
    pub fn new(expose_internal_errors: bool) -> Self {
        Self {
            expose_internal_errors,
        }
    }

    /// Map an error to a problem, logging it.
    ///
    /// Server error details are replaced by an opaque message unless
    /// internal errors are exposed; the full error is always logged.
    pub fn map(&self, err: &RestError) -> ApiProblem {
        let status = err.status_code();
        if err.is_server_error() {
            error!(status, error = %err, "Request failed with an internal error");
            if !self.expose_internal_errors {
                return ApiProblem::new(status, "An internal server error occurred");
            }
        } else {
            warn!(status, error = %err, "Request rejected");
        }
        ApiProblem::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::event::Operation;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let problem = ApiProblem::new(404, "Entity not found");
        assert_eq!(
            problem.to_value(),
            json!({
                "type": "about:blank",
                "title": "Not Found",
                "status": 404,
                "detail": "Entity not found"
            })
        );
    }

    #[test]
    fn test_invalid_status_normalizes_to_500() {
        let problem = ApiProblem::new(42, "nope");
        assert_eq!(problem.status(), 500);
        assert_eq!(problem.title(), "Internal Server Error");
        assert_eq!(ApiProblem::from_status(1000).status(), 500);
    }

    #[test]
    fn test_additional_cannot_override_reserved_members() {
        let problem = ApiProblem::new(409, "Conflict detected")
            .with_additional("status", 200)
            .with_additional("title", "Fine")
            .with_additional("conflicting_id", "abc");

        let value = problem.to_value();
        assert_eq!(value["status"], json!(409));
        assert_eq!(value["title"], json!("Conflict"));
        assert_eq!(value["conflicting_id"], json!("abc"));
    }

    #[test]
    fn test_custom_type_and_title() {
        let problem = ApiProblem::new(422, "")
            .with_type("https://example.com/problems/validation")
            .with_title("Validation failed")
            .with_instance("/users/mwop");

        let value = problem.to_value();
        assert_eq!(value["type"], json!("https://example.com/problems/validation"));
        assert_eq!(value["title"], json!("Validation failed"));
        assert!(value.get("detail").is_none());
        assert_eq!(value["instance"], json!("/users/mwop"));
    }

    #[test]
    fn test_from_value() {
        let problem = ApiProblem::from_value(json!({
            "type": "about:blank",
            "title": "Teapot",
            "status": 999,
            "hint": "short and stout"
        }))
        .unwrap();
        assert_eq!(problem.status(), 500);
        assert_eq!(problem.additional().get("hint"), Some(&json!("short and stout")));
        assert!(ApiProblem::from_value(json!("nope")).is_none());
    }

    #[test]
    fn test_response_has_problem_content_type_and_allow() {
        let response = ApiProblem::new(405, "")
            .with_additional("allow", json!(["GET", "POST", "HEAD", "OPTIONS"]))
            .to_response();

        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("content-type"), Some(PROBLEM_CONTENT_TYPE));
        assert_eq!(response.header("allow"), Some("GET, POST, HEAD, OPTIONS"));
    }

    #[test]
    fn test_mapper_hides_internal_details() {
        let err = RestError::from(ResourceError::NoListenerResult(Operation::Fetch));

        let hidden = ProblemMapper::new(false).map(&err);
        assert_eq!(hidden.status(), 500);
        assert_eq!(hidden.detail(), Some("An internal server error occurred"));

        let exposed = ProblemMapper::new(true).map(&err);
        assert_eq!(exposed.detail(), Some("No listener returned a result for fetch"));
    }

    #[test]
    fn test_mapper_keeps_client_error_details() {
        let err = RestError::from(ResourceError::MissingIdentifier(Operation::Delete));
        let problem = ProblemMapper::default().map(&err);
        assert_eq!(problem.status(), 400);
        assert_eq!(problem.detail(), Some("Missing identifier for delete"));
    }
}
