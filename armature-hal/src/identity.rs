//! Identifier extraction.
//!
//! The renderer asks an [`IdentityChain`] for the identifier of every resource
//! it builds. Strategies are tried in registration order and the first one that
//! returns `Some` wins; `None` from all of them means the resource has no
//! identifier and its `self` link is built without one.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Extracts an identifier from a domain value.
pub trait IdentityStrategy: Send + Sync {
    fn identify(&self, value: &Value) -> Option<String>;
}

impl<F> IdentityStrategy for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn identify(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

/// Looks the identifier up in a named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIdentity {
    field: String,
}

impl FieldIdentity {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for FieldIdentity {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdentityStrategy for FieldIdentity {
    fn identify(&self, value: &Value) -> Option<String> {
        value.get(&self.field).and_then(identifier_string)
    }
}

/// Convert a scalar JSON value into an identifier string.
///
/// Strings (non-empty) and numbers qualify; everything else does not.
pub fn identifier_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ordered list of identity strategies.
#[derive(Clone)]
pub struct IdentityChain {
    strategies: Vec<Arc<dyn IdentityStrategy>>,
}

impl IdentityChain {
    /// A chain with no strategies; never finds an identifier.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// A chain holding a single field lookup.
    pub fn field(field: impl Into<String>) -> Self {
        let mut chain = Self::empty();
        chain.push(FieldIdentity::new(field));
        chain
    }

    /// Append a strategy (tried after the existing ones).
    pub fn push<S: IdentityStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Arc::new(strategy));
    }

    /// Insert a strategy ahead of the existing ones.
    pub fn prepend<S: IdentityStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.insert(0, Arc::new(strategy));
    }

    pub fn identify(&self, value: &Value) -> Option<String> {
        self.strategies.iter().find_map(|s| s.identify(value))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for IdentityChain {
    /// Looks up `"id"`.
    fn default() -> Self {
        Self::field("id")
    }
}

impl fmt::Debug for IdentityChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityChain")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_looks_up_id() {
        let chain = IdentityChain::default();
        assert_eq!(chain.identify(&json!({"id": "mwop"})), Some("mwop".to_string()));
        assert_eq!(chain.identify(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(chain.identify(&json!({"id": ""})), None);
        assert_eq!(chain.identify(&json!({"id": null})), None);
        assert_eq!(chain.identify(&json!({"name": "x"})), None);
        assert_eq!(chain.identify(&json!("scalar")), None);
    }

    #[test]
    fn test_first_match_wins() {
        let mut chain = IdentityChain::default();
        chain.prepend(FieldIdentity::new("_id"));

        assert_eq!(
            chain.identify(&json!({"_id": "a", "id": "b"})),
            Some("a".to_string())
        );
        assert_eq!(chain.identify(&json!({"id": "b"})), Some("b".to_string()));
    }

    #[test]
    fn test_closure_strategy_can_opt_out() {
        let mut chain = IdentityChain::empty();
        chain.push(|value: &Value| {
            value
                .get("slug")
                .and_then(Value::as_str)
                .filter(|s| !s.starts_with("draft-"))
                .map(str::to_string)
        });

        assert_eq!(chain.identify(&json!({"slug": "hello"})), Some("hello".to_string()));
        assert_eq!(chain.identify(&json!({"slug": "draft-1"})), None);
    }
}
