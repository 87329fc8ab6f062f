//! HAL resources.

use crate::collection::HalCollection;
use crate::link::{Link, LinkCollection, Params};
use serde_json::{Map, Value};

/// Keys owned by the HAL envelope; never part of a resource's own fields.
pub const RESERVED_KEYS: [&str; 2] = ["_links", "_embedded"];

/// A value embedded in a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    Resource(Box<HalResource>),
    Resources(Vec<HalResource>),
    Collection(Box<HalCollection>),
}

/// A single identified domain representation.
///
/// ```
/// use armature_hal::HalResource;
/// use serde_json::json;
///
/// let user = HalResource::from_value(json!({"id": "mwop", "name": "Matthew"}))
///     .unwrap()
///     .with_identifier("mwop")
///     .with_route("users");
///
/// let status = HalResource::from_value(json!({"status": "hello", "user": null}))
///     .unwrap()
///     .with_route("status")
///     .embed("user", user);
///
/// assert!(status.data().get("user").is_none());
/// assert!(status.embedded_field("user").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HalResource {
    identifier: Option<String>,
    route_name: Option<String>,
    route_identifier_name: Option<String>,
    route_params: Params,
    data: Map<String, Value>,
    embedded: Vec<(String, Embedded)>,
    links: LinkCollection,
}

impl HalResource {
    /// Create a resource from its fields. Reserved HAL keys are dropped.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: without_keys(data, &RESERVED_KEYS),
            ..Self::default()
        }
    }

    /// Create a resource from a JSON object; `None` for any other value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            _ => None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Route used to build the `self` link when none is set explicitly.
    pub fn with_route(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = Some(route_name.into());
        self
    }

    /// Route parameter receiving the identifier (default `id`).
    pub fn with_route_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.route_identifier_name = Some(name.into());
        self
    }

    pub fn with_route_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(key.into(), value.into());
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.add(link);
        self
    }

    /// Embed a resource under `name`, removing any flat field of that name.
    pub fn embed(mut self, name: impl Into<String>, resource: HalResource) -> Self {
        self.set_embedded(name, Embedded::Resource(Box::new(resource)));
        self
    }

    /// Embed a list of resources under `name`.
    pub fn embed_many(mut self, name: impl Into<String>, resources: Vec<HalResource>) -> Self {
        self.set_embedded(name, Embedded::Resources(resources));
        self
    }

    /// Embed a collection under `name`.
    pub fn embed_collection(mut self, name: impl Into<String>, collection: HalCollection) -> Self {
        self.set_embedded(name, Embedded::Collection(Box::new(collection)));
        self
    }

    pub fn set_embedded(&mut self, name: impl Into<String>, value: Embedded) {
        let name = name.into();
        if self.data.contains_key(&name) {
            self.data = without_keys(std::mem::take(&mut self.data), &[name.as_str()]);
        }
        match self.embedded.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.embedded.push((name, value)),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn set_identifier(&mut self, identifier: Option<String>) {
        self.identifier = identifier;
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub fn set_route_name(&mut self, route_name: impl Into<String>) {
        self.route_name = Some(route_name.into());
    }

    pub fn route_identifier_name(&self) -> Option<&str> {
        self.route_identifier_name.as_deref()
    }

    pub fn set_route_identifier_name(&mut self, name: impl Into<String>) {
        self.route_identifier_name = Some(name.into());
    }

    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn route_params_mut(&mut self) -> &mut Params {
        &mut self.route_params
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn embedded(&self) -> &[(String, Embedded)] {
        &self.embedded
    }

    pub(crate) fn embedded_mut(&mut self) -> &mut Vec<(String, Embedded)> {
        &mut self.embedded
    }

    pub fn embedded_field(&self, name: &str) -> Option<&Embedded> {
        self.embedded
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn links(&self) -> &LinkCollection {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkCollection {
        &mut self.links
    }

    /// Build the `self` link from the resource's route, when it has one.
    pub fn route_self_link(&self) -> Option<Link> {
        let route = self.route_name.as_deref()?;
        let mut link = Link::route("self", route).with_params(&self.route_params);
        if let Some(id) = &self.identifier {
            let key = self.route_identifier_name.as_deref().unwrap_or("id");
            link = link.with_param(key, id.clone());
        }
        Some(link)
    }
}

// Order-preserving removal.
fn without_keys(data: Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    data.into_iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .collect()
}
