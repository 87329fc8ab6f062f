// HTTP request and response messages

use crate::error::RestError;
use armature_hal::Params;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde_json::Value;

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Parameters captured from the path by the router.
    pub route_params: Params,
    pub query_params: Params,
}

impl RestRequest {
    /// Create a request for `uri`; a query string is split into `query_params`.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, Params::new()),
        };
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            route_params: Params::new(),
            query_params: query,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn patch(uri: &str) -> Self {
        Self::new(Method::PATCH, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and its content type.
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    pub fn with_route_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Parse the request body as JSON; an empty body yields `None`.
    pub fn json_body(&self) -> Result<Option<Value>, RestError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&self.body)
            .map(Some)
            .map_err(|e| RestError::InvalidBody(e.to_string()))
    }
}

fn parse_query(query: &str) -> Params {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RestResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Serialize `value` as the body. The content type is left to the caller.
    pub fn with_json_body(mut self, value: &Value) -> Self {
        self.body = value.to_string().into_bytes();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_is_split() {
        let request = RestRequest::get("/users?page=2&sort=last+name&q=%C3%A9t%C3%A9&flag");
        assert_eq!(request.path, "/users");
        assert_eq!(request.query("page"), Some("2"));
        assert_eq!(request.query("sort"), Some("last name"));
        assert_eq!(request.query("q"), Some("été"));
        assert_eq!(request.query("flag"), Some(""));
    }

    #[test]
    fn test_json_body() {
        let request = RestRequest::post("/users").with_json(&json!({"name": "Ada"}));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.json_body().unwrap(), Some(json!({"name": "Ada"})));

        assert_eq!(RestRequest::delete("/users").json_body().unwrap(), None);

        let broken = RestRequest::post("/users").with_body("{\"name\":");
        assert!(matches!(broken.json_body(), Err(RestError::InvalidBody(_))));
    }

    #[test]
    fn test_invalid_headers_are_ignored() {
        let request = RestRequest::get("/users").with_header("bad header", "x");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_response_helpers() {
        let response = RestResponse::new(StatusCode::OK)
            .with_json_body(&json!({"id": 1}))
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/hal+json"),
            );
        assert!(response.is_success());
        assert_eq!(response.header("Content-Type"), Some("application/hal+json"));
        assert_eq!(response.json(), Some(json!({"id": 1})));
        assert!(RestResponse::no_content().body.is_empty());
    }
}
