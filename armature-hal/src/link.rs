//! Hypermedia links and link collections.
//!
//! A [`Link`] either points at a literal URL or at a named route that is
//! resolved later by a [`LinkResolver`](crate::LinkResolver). Links are grouped
//! by relation in a [`LinkCollection`], which preserves the order in which
//! relations were first added.
//!
//! ```
//! use armature_hal::{Link, LinkCollection};
//!
//! let mut links = LinkCollection::new();
//! links.add(Link::route("self", "users").with_param("id", "mwop"));
//! links.add(Link::href("describedby", "https://example.com/docs/users"));
//!
//! assert!(links.has("self"));
//! assert_eq!(links.len(), 2);
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Route or query parameters. Sorted so assembled URLs are deterministic.
pub type Params = BTreeMap<String, String>;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A literal absolute or relative URL.
    Href(String),
    /// A named route, resolved at render time.
    Route {
        name: String,
        params: Params,
        query: Params,
    },
}

/// A single hypermedia link.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    rel: String,
    target: LinkTarget,
    templated: bool,
    props: Map<String, Value>,
}

impl Link {
    /// Create a link to a literal URL.
    pub fn href(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self::with_target(rel, LinkTarget::Href(href.into()))
    }

    /// Create a link to a named route.
    pub fn route(rel: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_target(
            rel,
            LinkTarget::Route {
                name: name.into(),
                params: Params::new(),
                query: Params::new(),
            },
        )
    }

    fn with_target(rel: impl Into<String>, target: LinkTarget) -> Self {
        Self {
            rel: rel.into(),
            target,
            templated: false,
            props: Map::new(),
        }
    }

    /// Add a route parameter. Ignored for href links.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let LinkTarget::Route { params, .. } = &mut self.target {
            params.insert(key.into(), value.into());
        }
        self
    }

    /// Add several route parameters. Ignored for href links.
    pub fn with_params(mut self, extra: &Params) -> Self {
        if let LinkTarget::Route { params, .. } = &mut self.target {
            params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self
    }

    /// Add a query string parameter. Ignored for href links.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let LinkTarget::Route { query, .. } = &mut self.target {
            query.insert(key.into(), value.into());
        }
        self
    }

    /// Mark the link as an RFC 6570 URI template.
    pub fn templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Attach an extra member to the rendered link object (`title`, `name`, ...).
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    pub fn is_templated(&self) -> bool {
        self.templated
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Route name, if this is a route link.
    pub fn route_name(&self) -> Option<&str> {
        match &self.target {
            LinkTarget::Route { name, .. } => Some(name),
            LinkTarget::Href(_) => None,
        }
    }

    /// Render the link object for an already resolved URL.
    ///
    /// Props never replace `href` or `templated`.
    pub fn to_json(&self, href: String) -> Value {
        let mut object = Map::new();
        object.insert("href".to_string(), Value::String(href));
        if self.templated {
            object.insert("templated".to_string(), Value::Bool(true));
        }
        for (key, value) in &self.props {
            if key != "href" && key != "templated" {
                object.insert(key.clone(), value.clone());
            }
        }
        Value::Object(object)
    }
}

/// Links grouped by relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkCollection {
    links: Vec<(String, Vec<Link>)>,
}

impl LinkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link; several links may share a relation.
    pub fn add(&mut self, link: Link) {
        match self.links.iter_mut().find(|(rel, _)| rel == link.rel()) {
            Some((_, existing)) => existing.push(link),
            None => self.links.push((link.rel().to_string(), vec![link])),
        }
    }

    /// Replace every link of the relation with `link`.
    pub fn set(&mut self, link: Link) {
        match self.links.iter_mut().find(|(rel, _)| rel == link.rel()) {
            Some((_, existing)) => *existing = vec![link],
            None => self.links.push((link.rel().to_string(), vec![link])),
        }
    }

    pub fn get(&self, rel: &str) -> Option<&[Link]> {
        self.links
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, links)| links.as_slice())
    }

    /// First link registered for a relation.
    pub fn first(&self, rel: &str) -> Option<&Link> {
        self.get(rel).and_then(|links| links.first())
    }

    pub fn has(&self, rel: &str) -> bool {
        self.get(rel).is_some()
    }

    pub fn remove(&mut self, rel: &str) -> Option<Vec<Link>> {
        let index = self.links.iter().position(|(name, _)| name == rel)?;
        Some(self.links.remove(index).1)
    }

    /// Iterate relations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Link])> {
        self.links
            .iter()
            .map(|(rel, links)| (rel.as_str(), links.as_slice()))
    }

    /// Number of relations.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Copy in every link from `other`, appending to existing relations.
    pub fn merge(&mut self, other: &LinkCollection) {
        for (_, links) in other.iter() {
            for link in links {
                self.add(link.clone());
            }
        }
    }
}

impl FromIterator<Link> for LinkCollection {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut collection = LinkCollection::new();
        for link in iter {
            collection.add(link);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_link_params() {
        let link = Link::route("self", "users")
            .with_param("id", "42")
            .with_query("page", "2");

        match link.target() {
            LinkTarget::Route {
                name,
                params,
                query,
            } => {
                assert_eq!(name, "users");
                assert_eq!(params.get("id"), Some(&"42".to_string()));
                assert_eq!(query.get("page"), Some(&"2".to_string()));
            }
            LinkTarget::Href(_) => panic!("expected a route link"),
        }
    }

    #[test]
    fn test_href_link_ignores_route_params() {
        let link = Link::href("self", "/users/42").with_param("id", "7");
        assert_eq!(link.target(), &LinkTarget::Href("/users/42".to_string()));
        assert_eq!(link.route_name(), None);
    }

    #[test]
    fn test_to_json_merges_props() {
        let link = Link::href("search", "/users{?q}")
            .templated(true)
            .with_prop("title", "Search users")
            .with_prop("href", "/ignored");

        assert_eq!(
            link.to_json("/users{?q}".to_string()),
            json!({"href": "/users{?q}", "templated": true, "title": "Search users"})
        );
    }

    #[test]
    fn test_collection_add_and_set() {
        let mut links = LinkCollection::new();
        links.add(Link::href("item", "/a"));
        links.add(Link::href("item", "/b"));
        links.add(Link::href("self", "/list"));

        assert_eq!(links.get("item").map(|l| l.len()), Some(2));
        assert_eq!(links.len(), 2);

        links.set(Link::href("item", "/c"));
        assert_eq!(links.get("item").map(|l| l.len()), Some(1));

        let rels: Vec<&str> = links.iter().map(|(rel, _)| rel).collect();
        assert_eq!(rels, vec!["item", "self"]);
    }

    #[test]
    fn test_collection_remove() {
        let mut links: LinkCollection = vec![Link::href("self", "/a"), Link::href("next", "/b")]
            .into_iter()
            .collect();

        assert!(links.remove("next").is_some());
        assert!(!links.has("next"));
        assert!(links.remove("next").is_none());
    }
}
