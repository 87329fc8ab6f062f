//! Route resolution.
//!
//! Turning a symbolic route name into a URL is delegated to a
//! [`RouteResolver`]. [`RouteTable`] is the bundled implementation: named path
//! templates with `{param}` placeholders and `[...]` optional sections, e.g.
//! `/users[/{id}]`.
//!
//! ```
//! use armature_hal::{Params, RouteResolver, RouteTable};
//!
//! let routes = RouteTable::new()
//!     .route("users", "/api/users[/{id}]")
//!     .unwrap();
//!
//! let mut params = Params::new();
//! assert_eq!(routes.assemble("users", &params, &Params::new()).unwrap(), "/api/users");
//!
//! params.insert("id".to_string(), "mwop".to_string());
//! assert_eq!(routes.assemble("users", &params, &Params::new()).unwrap(), "/api/users/mwop");
//! ```

use crate::error::{HalError, Result};
use crate::link::Params;
use std::collections::HashMap;
use std::fmt;

/// Capability that converts a route name plus parameters into a URL.
pub trait RouteResolver: Send + Sync {
    /// Assemble the URL for `route`.
    ///
    /// Parameters the route does not use are ignored; a missing required
    /// parameter is an [`HalError::UnresolvableRoute`].
    fn assemble(&self, route: &str, params: &Params, query: &Params) -> Result<String>;

    /// Match a request path back to a route name and its captured parameters.
    fn match_path(&self, _path: &str) -> Option<RouteMatch> {
        None
    }
}

/// The outcome of matching a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(Vec<Segment>),
}

/// A parsed route template.
#[derive(Debug, Clone)]
struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| HalError::InvalidRoute {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut optional: Option<Vec<Segment>> = None;
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed || name.is_empty() || name.contains('{') {
                        return Err(invalid("empty or unterminated parameter"));
                    }
                    let target = optional.as_mut().unwrap_or(&mut segments);
                    if !literal.is_empty() {
                        target.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    target.push(Segment::Param(name));
                }
                '[' => {
                    if optional.is_some() {
                        return Err(invalid("nested optional sections are not supported"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    optional = Some(Vec::new());
                }
                ']' => {
                    let mut inner = optional
                        .take()
                        .ok_or_else(|| invalid("unbalanced ']'"))?;
                    if !literal.is_empty() {
                        inner.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Optional(inner));
                }
                '}' => return Err(invalid("unbalanced '}'")),
                other => literal.push(other),
            }
        }

        if optional.is_some() {
            return Err(invalid("unterminated optional section"));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    fn assemble(&self, route: &str, params: &Params) -> Result<String> {
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Optional(inner) => {
                    if Self::all_present(inner, params) {
                        Self::render(inner, route, params, &mut path)?;
                    }
                }
                other => Self::render(std::slice::from_ref(other), route, params, &mut path)?,
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    fn render(segments: &[Segment], route: &str, params: &Params, out: &mut String) -> Result<()> {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => {
                    let value = params
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| {
                            HalError::unresolvable(route, format!("missing parameter '{}'", name))
                        })?;
                    out.push_str(&urlencoding::encode(value));
                }
                Segment::Optional(inner) => Self::render(inner, route, params, out)?,
            }
        }
        Ok(())
    }

    fn all_present(segments: &[Segment], params: &Params) -> bool {
        segments.iter().all(|segment| match segment {
            Segment::Param(name) => params.get(name).is_some_and(|v| !v.is_empty()),
            _ => true,
        })
    }

    /// Every concrete path pattern this template can match, in matchit syntax.
    fn match_patterns(&self) -> Vec<String> {
        let mut patterns = vec![String::new()];
        for segment in &self.segments {
            match segment {
                Segment::Optional(inner) => {
                    let expanded: String = inner.iter().map(Self::pattern_text).collect();
                    let with: Vec<String> =
                        patterns.iter().map(|p| format!("{}{}", p, expanded)).collect();
                    patterns.extend(with);
                }
                other => {
                    let text = Self::pattern_text(other);
                    for pattern in &mut patterns {
                        pattern.push_str(&text);
                    }
                }
            }
        }
        patterns
            .into_iter()
            .map(|p| if p.is_empty() { "/".to_string() } else { p })
            .collect()
    }

    fn pattern_text(segment: &Segment) -> String {
        match segment {
            Segment::Literal(text) => text.clone(),
            Segment::Param(name) => format!("{{{}}}", name),
            Segment::Optional(inner) => inner.iter().map(Self::pattern_text).collect(),
        }
    }
}

/// Named route templates with URL assembly and path matching.
pub struct RouteTable {
    routes: HashMap<String, RouteTemplate>,
    matcher: matchit::Router<String>,
    base_url: Option<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            matcher: matchit::Router::new(),
            base_url: None,
        }
    }

    /// Prefix every assembled URL, producing absolute links.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Register a named template (builder form).
    pub fn route(mut self, name: impl Into<String>, template: &str) -> Result<Self> {
        self.add(name, template)?;
        Ok(self)
    }

    /// Register a named template.
    pub fn add(&mut self, name: impl Into<String>, template: &str) -> Result<()> {
        let name = name.into();
        let parsed = RouteTemplate::parse(template)?;

        for pattern in parsed.match_patterns() {
            self.matcher
                .insert(pattern.clone(), name.clone())
                .map_err(|e| HalError::InvalidRoute {
                    template: template.to_string(),
                    reason: format!("{} ({})", e, pattern),
                })?;
        }

        tracing::debug!(route = %name, template, "Registered route");
        self.routes.insert(name, parsed);
        Ok(())
    }

    /// Template a route was registered with.
    pub fn template(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(|t| t.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<(&String, &str)> = self
            .routes
            .iter()
            .map(|(name, template)| (name, template.source.as_str()))
            .collect();
        routes.sort();
        f.debug_struct("RouteTable")
            .field("routes", &routes)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RouteResolver for RouteTable {
    fn assemble(&self, route: &str, params: &Params, query: &Params) -> Result<String> {
        let template = self
            .routes
            .get(route)
            .ok_or_else(|| HalError::unresolvable(route, "route is not registered"))?;

        let mut url = template.assemble(route, params)?;
        if !query.is_empty() {
            let pairs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }

        Ok(match &self.base_url {
            Some(base) => format!("{}{}", base, url),
            None => url,
        })
    }

    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
        let matched = self.matcher.at(path).ok()?;

        let params = matched
            .params
            .iter()
            .map(|(k, v)| {
                let decoded = urlencoding::decode(v)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| v.to_string());
                (k.to_string(), decoded)
            })
            .collect();

        Some(RouteMatch {
            name: matched.value.clone(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn table() -> RouteTable {
        RouteTable::new()
            .route("users", "/users[/{id}]")
            .unwrap()
            .route("author-posts", "/authors/{author_id}/posts[/{post_id}]")
            .unwrap()
    }

    #[test]
    fn test_assemble_optional_segment() {
        let routes = table();
        assert_eq!(
            routes.assemble("users", &Params::new(), &Params::new()).unwrap(),
            "/users"
        );
        assert_eq!(
            routes
                .assemble("users", &params(&[("id", "42")]), &Params::new())
                .unwrap(),
            "/users/42"
        );
    }

    #[test]
    fn test_assemble_missing_required_param() {
        let routes = table();
        let err = routes
            .assemble("author-posts", &params(&[("post_id", "1")]), &Params::new())
            .unwrap_err();
        assert!(matches!(err, HalError::UnresolvableRoute { .. }));
    }

    #[test]
    fn test_assemble_unknown_route() {
        let err = table()
            .assemble("nope", &Params::new(), &Params::new())
            .unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_assemble_encodes_values_and_query() {
        let routes = table();
        let url = routes
            .assemble(
                "users",
                &params(&[("id", "a b/c")]),
                &params(&[("page", "2"), ("q", "x&y")]),
            )
            .unwrap();
        assert_eq!(url, "/users/a%20b%2Fc?page=2&q=x%26y");
    }

    #[test]
    fn test_base_url() {
        let routes = RouteTable::new()
            .with_base_url("https://api.example.com/")
            .route("users", "/users[/{id}]")
            .unwrap();
        assert_eq!(
            routes
                .assemble("users", &params(&[("id", "1")]), &Params::new())
                .unwrap(),
            "https://api.example.com/users/1"
        );
    }

    #[test]
    fn test_match_path() {
        let routes = table();

        let matched = routes.match_path("/users/mwop?page=2").unwrap();
        assert_eq!(matched.name, "users");
        assert_eq!(matched.params.get("id"), Some(&"mwop".to_string()));

        let matched = routes.match_path("/users").unwrap();
        assert_eq!(matched.name, "users");
        assert!(matched.params.is_empty());

        let matched = routes.match_path("/authors/7/posts").unwrap();
        assert_eq!(matched.name, "author-posts");
        assert_eq!(matched.params.get("author_id"), Some(&"7".to_string()));

        assert!(routes.match_path("/unknown").is_none());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(RouteTemplate::parse("/users[/{id}").is_err());
        assert!(RouteTemplate::parse("/users/{}").is_err());
        assert!(RouteTemplate::parse("/users/{id").is_err());
        assert!(RouteTemplate::parse("/users[/[{id}]]").is_err());
        assert!(RouteTemplate::parse("/users/id}").is_err());
    }

    #[test]
    fn test_match_patterns_expand_optional() {
        let template = RouteTemplate::parse("/users[/{id}]").unwrap();
        assert_eq!(template.match_patterns(), vec!["/users", "/users/{id}"]);
    }
}
