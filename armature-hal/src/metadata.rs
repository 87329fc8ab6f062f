//! Embedding metadata.
//!
//! Plain JSON carries no type information, so the renderer needs to be told
//! which fields hold nested resources. A [`MetadataMap`] maps field names to
//! the route and identity details of the resource found there.
//!
//! ```
//! use armature_hal::{MetadataMap, ResourceMetadata};
//!
//! let metadata = MetadataMap::new()
//!     .with("user", ResourceMetadata::entity("users"))
//!     .with("comments", ResourceMetadata::collection("comments"));
//!
//! assert!(metadata.get("user").is_some());
//! assert!(metadata.get("comments").unwrap().is_collection());
//! ```

use crate::hydrator::Hydrator;
use crate::identity::IdentityChain;
use crate::link::Params;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How to render the resource stored in one field.
#[derive(Clone)]
pub struct ResourceMetadata {
    route_name: String,
    route_identifier_name: String,
    identifier_name: Option<String>,
    route_params: Params,
    is_collection: bool,
    collection_name: Option<String>,
    hydrator: Option<Arc<dyn Hydrator>>,
}

impl ResourceMetadata {
    /// A single resource (or a plain list of resources) served by `route_name`.
    pub fn entity(route_name: impl Into<String>) -> Self {
        Self {
            route_name: route_name.into(),
            route_identifier_name: "id".to_string(),
            identifier_name: None,
            route_params: Params::new(),
            is_collection: false,
            collection_name: None,
            hydrator: None,
        }
    }

    /// A full collection with its own `self` link.
    pub fn collection(route_name: impl Into<String>) -> Self {
        Self {
            is_collection: true,
            ..Self::entity(route_name)
        }
    }

    /// Route parameter that receives the identifier (default `id`).
    pub fn with_route_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.route_identifier_name = name.into();
        self
    }

    /// Field holding the identifier; replaces the renderer's identity chain.
    pub fn with_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.identifier_name = Some(name.into());
        self
    }

    /// Extra route parameter for every link built for this field.
    pub fn with_route_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(key.into(), value.into());
        self
    }

    /// Key members are embedded under inside an embedded collection.
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    pub fn with_hydrator<H: Hydrator + 'static>(mut self, hydrator: H) -> Self {
        self.hydrator = Some(Arc::new(hydrator));
        self
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn route_identifier_name(&self) -> &str {
        &self.route_identifier_name
    }

    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn hydrator(&self) -> Option<&Arc<dyn Hydrator>> {
        self.hydrator.as_ref()
    }

    /// Identity chain for this field, if it overrides the renderer's.
    pub fn identity(&self) -> Option<IdentityChain> {
        self.identifier_name.as_deref().map(IdentityChain::field)
    }
}

impl fmt::Debug for ResourceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMetadata")
            .field("route_name", &self.route_name)
            .field("route_identifier_name", &self.route_identifier_name)
            .field("identifier_name", &self.identifier_name)
            .field("is_collection", &self.is_collection)
            .finish()
    }
}

/// Field name to embedding metadata.
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    fields: HashMap<String, ResourceMetadata>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, metadata: ResourceMetadata) -> Self {
        self.insert(field, metadata);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, metadata: ResourceMetadata) {
        self.fields.insert(field.into(), metadata);
    }

    pub fn get(&self, field: &str) -> Option<&ResourceMetadata> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
