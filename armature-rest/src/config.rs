//! Controller configuration.
//!
//! [`RestControllerConfig`] is deserializable from TOML or JSON, with every
//! field but `route_name` defaulted, and may be overridden from prefixed
//! environment variables.
//!
//! ```
//! use armature_rest::RestControllerConfig;
//!
//! let config = RestControllerConfig::from_toml_str(r#"
//!     route_name = "users"
//!     page_size = 10
//!     collection_allowed_methods = ["GET"]
//! "#).unwrap();
//!
//! assert_eq!(config.page_size, 10);
//! assert_eq!(config.collection_name, "items");
//! ```

use crate::error::ConfigError;
use crate::negotiation::{AcceptCriteria, AcceptCriterion, MediaType, default_criteria};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }

    /// Detect the format from a file path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        Self::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))
    }
}

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration of one REST controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestControllerConfig {
    /// Route used for self links and Location headers.
    pub route_name: String,
    /// Route parameter holding the resource identifier.
    pub route_identifier_name: String,
    /// Tag attached to the request span.
    pub event_id: String,
    /// Media type patterns and the representation each selects.
    pub accept_criteria: Vec<AcceptCriterion>,
    pub collection_allowed_methods: Vec<String>,
    pub resource_allowed_methods: Vec<String>,
    pub page_size: u64,
    /// Query parameter letting clients choose the page size.
    pub page_size_param: Option<String>,
    pub max_page_size: Option<u64>,
    pub collection_name: String,
    /// Query parameters passed to `fetch_all` and kept in pagination links.
    pub collection_query_whitelist: Vec<String>,
    /// Show internal error details in 5xx problems.
    pub expose_internal_errors: bool,
}

impl Default for RestControllerConfig {
    fn default() -> Self {
        Self {
            route_name: String::new(),
            route_identifier_name: "id".to_string(),
            event_id: "ResourceController".to_string(),
            accept_criteria: default_criteria(),
            collection_allowed_methods: vec!["GET".to_string(), "POST".to_string()],
            resource_allowed_methods: vec![
                "DELETE".to_string(),
                "GET".to_string(),
                "PATCH".to_string(),
                "PUT".to_string(),
            ],
            page_size: armature_hal::DEFAULT_PAGE_SIZE,
            page_size_param: None,
            max_page_size: None,
            collection_name: armature_hal::DEFAULT_COLLECTION_NAME.to_string(),
            collection_query_whitelist: Vec::new(),
            expose_internal_errors: false,
        }
    }
}

impl RestControllerConfig {
    pub fn new(route_name: impl Into<String>) -> Self {
        Self {
            route_name: route_name.into(),
            ..Self::default()
        }
    }

    pub fn with_route_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.route_identifier_name = name.into();
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    pub fn with_accept_criteria(mut self, criteria: Vec<AcceptCriterion>) -> Self {
        self.accept_criteria = criteria;
        self
    }

    pub fn with_collection_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collection_allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resource_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Let clients pick the page size through `param`, up to `max`.
    pub fn with_page_size_param(mut self, param: impl Into<String>, max: Option<u64>) -> Self {
        self.page_size_param = Some(param.into());
        self.max_page_size = max;
        self
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    pub fn with_query_whitelist<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collection_query_whitelist = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::parse(content, FileFormat::Json)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, FileFormat::Toml)
    }

    /// Load and validate a file; the format follows the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("Failed to read file: {}", e)))?;
        Self::parse(&content, format)
    }

    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let value = match format {
            FileFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?,
            FileFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
                serde_json::to_value(toml_value).map_err(|e| {
                    ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e))
                })?
            }
        };

        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(format!("Invalid controller config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `vars` whose key starts with `prefix`.
    ///
    /// `MYAPP_PAGE_SIZE=10` with prefix `MYAPP` sets `page_size`. List fields
    /// take comma separated values. Unknown keys are ignored.
    pub fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(prefix) else {
                continue;
            };
            let field = field.trim_start_matches('_').to_lowercase();
            self.set_field(&field, &value)?;
        }
        Ok(())
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self, prefix: &str) -> Result<()> {
        self.apply_env_vars(prefix, std::env::vars())
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "route_name" => self.route_name = value.to_string(),
            "route_identifier_name" => self.route_identifier_name = value.to_string(),
            "event_id" => self.event_id = value.to_string(),
            "collection_allowed_methods" => self.collection_allowed_methods = split_list(value),
            "resource_allowed_methods" => self.resource_allowed_methods = split_list(value),
            "page_size" => self.page_size = parse_number(field, value)?,
            "page_size_param" => {
                self.page_size_param = (!value.is_empty()).then(|| value.to_string())
            }
            "max_page_size" => self.max_page_size = Some(parse_number(field, value)?),
            "collection_name" => self.collection_name = value.to_string(),
            "collection_query_whitelist" => self.collection_query_whitelist = split_list(value),
            "expose_internal_errors" => {
                self.expose_internal_errors = value.parse().map_err(|_| {
                    ConfigError::ParseError(format!("{} must be true or false", field))
                })?
            }
            other => {
                debug!(key = other, "Ignoring unknown controller setting");
            }
        }
        Ok(())
    }

    /// Methods allowed on the collection route.
    pub fn collection_methods(&self) -> Result<Vec<Method>> {
        parse_methods(&self.collection_allowed_methods, "collection_allowed_methods")
    }

    /// Methods allowed on the entity route.
    pub fn resource_methods(&self) -> Result<Vec<Method>> {
        parse_methods(&self.resource_allowed_methods, "resource_allowed_methods")
    }

    pub fn criteria(&self) -> AcceptCriteria {
        AcceptCriteria::new(self.accept_criteria.clone())
    }
}

impl Validate for RestControllerConfig {
    fn validate(&self) -> Result<()> {
        not_empty(&self.route_name, "route_name")?;
        not_empty(&self.route_identifier_name, "route_identifier_name")?;
        not_empty(&self.collection_name, "collection_name")?;
        if self.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.max_page_size == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.accept_criteria.is_empty() {
            return Err(ConfigError::ValidationError(
                "accept_criteria cannot be empty".to_string(),
            ));
        }
        for criterion in &self.accept_criteria {
            for media_type in &criterion.media_types {
                if MediaType::parse(media_type).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid media type in accept_criteria: {}",
                        media_type
                    )));
                }
            }
        }
        self.collection_methods()?;
        self.resource_methods()?;
        Ok(())
    }
}

fn not_empty(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

fn parse_number(field: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ParseError(format!("{} must be a positive integer", field)))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_methods(methods: &[String], field: &str) -> Result<Vec<Method>> {
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.trim().to_uppercase().as_bytes()).map_err(|_| {
                ConfigError::ValidationError(format!("Invalid HTTP method in {}: {}", field, m))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::Representation;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RestControllerConfig::new("users");
        assert_eq!(config.route_identifier_name, "id");
        assert_eq!(config.event_id, "ResourceController");
        assert_eq!(config.page_size, 30);
        assert_eq!(config.collection_name, "items");
        assert_eq!(
            config.collection_methods().unwrap(),
            vec![Method::GET, Method::POST]
        );
        assert_eq!(
            config.resource_methods().unwrap(),
            vec![Method::DELETE, Method::GET, Method::PATCH, Method::PUT]
        );
        assert!(!config.expose_internal_errors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_route_name_is_required() {
        let err = RestControllerConfig::from_json_str(r#"{"page_size": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("route_name"));
    }

    #[test]
    fn test_from_json() {
        let config = RestControllerConfig::from_json_str(
            r#"{
                "route_name": "users",
                "accept_criteria": [
                    {"representation": "json", "media_types": ["application/json"]},
                    {"representation": "hal", "media_types": ["*/*+json"]}
                ],
                "page_size_param": "limit",
                "max_page_size": 100
            }"#,
        )
        .unwrap();
        assert_eq!(config.accept_criteria.len(), 2);
        assert_eq!(config.accept_criteria[0].representation, Representation::Json);
        assert_eq!(config.page_size_param.as_deref(), Some("limit"));
        assert_eq!(config.max_page_size, Some(100));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
route_name = "posts"
collection_query_whitelist = ["sort", "author"]
expose_internal_errors = true
"#
        )
        .unwrap();

        let config = RestControllerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.route_name, "posts");
        assert_eq!(config.collection_query_whitelist, vec!["sort", "author"]);
        assert!(config.expose_internal_errors);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = RestControllerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(RestControllerConfig::new("users").with_page_size(0).validate().is_err());
        assert!(
            RestControllerConfig::new("users")
                .with_collection_methods(["GET", "NOT A METHOD"])
                .validate()
                .is_err()
        );
        assert!(
            RestControllerConfig::new("users")
                .with_accept_criteria(Vec::new())
                .validate()
                .is_err()
        );
        assert!(RestControllerConfig::from_toml_str("route_name = ").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RestControllerConfig::new("users");
        let vars = vec![
            ("API_PAGE_SIZE".to_string(), "10".to_string()),
            ("API_COLLECTION_ALLOWED_METHODS".to_string(), "GET, PUT".to_string()),
            ("API_EXPOSE_INTERNAL_ERRORS".to_string(), "true".to_string()),
            ("API_SOMETHING_ELSE".to_string(), "x".to_string()),
            ("OTHER_PAGE_SIZE".to_string(), "99".to_string()),
        ];
        config.apply_env_vars("API", vars).unwrap();

        assert_eq!(config.page_size, 10);
        assert_eq!(config.collection_allowed_methods, vec!["GET", "PUT"]);
        assert!(config.expose_internal_errors);
    }

    #[test]
    fn test_env_parse_errors() {
        let mut config = RestControllerConfig::new("users");
        let err = config
            .apply_env_vars("API", vec![("API_PAGE_SIZE".to_string(), "lots".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
