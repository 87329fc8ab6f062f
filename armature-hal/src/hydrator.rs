//! Domain value to field-mapping extraction.
//!
//! Hydration strategies themselves live outside this crate; the renderer only
//! needs to turn a domain value into the flat field mapping of a resource.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Converts a domain value into the fields of a resource.
pub trait Hydrator: Send + Sync {
    /// Extract the field mapping, or `None` if the value is not an entity.
    fn extract(&self, value: &Value) -> Option<Map<String, Value>>;
}

/// Uses JSON objects as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHydrator;

impl Hydrator for ObjectHydrator {
    fn extract(&self, value: &Value) -> Option<Map<String, Value>> {
        value.as_object().cloned()
    }
}

/// Drops a fixed set of fields (credentials, internal flags, ...).
#[derive(Debug, Clone, Default)]
pub struct FieldFilterHydrator {
    hidden: HashSet<String>,
}

impl FieldFilterHydrator {
    pub fn new<I, S>(hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden: hidden.into_iter().map(Into::into).collect(),
        }
    }
}

impl Hydrator for FieldFilterHydrator {
    fn extract(&self, value: &Value) -> Option<Map<String, Value>> {
        let object = value.as_object()?;
        Some(
            object
                .iter()
                .filter(|(key, _)| !self.hidden.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}
