//! HAL rendering.
//!
//! The renderer turns domain values into [`HalResource`] / [`HalCollection`]
//! trees, completes them (self links, pagination links, metadata driven
//! embedding, link augmentation) and serializes them with every link resolved.
//!
//! ```
//! use armature_hal::{HalRenderer, LinkResolver, RenderContext, RouteTable};
//! use serde_json::json;
//!
//! let routes = RouteTable::new().route("users", "/users[/{id}]").unwrap();
//! let renderer = HalRenderer::new(LinkResolver::new(routes));
//!
//! let ctx = RenderContext::new("users");
//! let document = renderer
//!     .render_entity(json!({"id": "mwop", "name": "Matthew"}).into(), &ctx)
//!     .unwrap();
//!
//! assert_eq!(document["_links"]["self"]["href"], "/users/mwop");
//! ```

use crate::collection::HalCollection;
use crate::document;
use crate::error::{HalError, Result};
use crate::hydrator::{Hydrator, ObjectHydrator};
use crate::identity::IdentityChain;
use crate::link::{Link, LinkCollection, LinkTarget, Params};
use crate::metadata::{MetadataMap, ResourceMetadata};
use crate::paginator::{PageRequest, Paginator};
use crate::resolver::LinkResolver;
use crate::resource::{Embedded, HalResource};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default limit on embedding depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// A single value to render.
#[derive(Debug, Clone)]
pub enum Entity {
    /// Raw domain data, hydrated and identified by the renderer.
    Value(Value),
    /// A resource built by the caller.
    Resource(HalResource),
}

impl From<Value> for Entity {
    fn from(value: Value) -> Self {
        Entity::Value(value)
    }
}

impl From<HalResource> for Entity {
    fn from(resource: HalResource) -> Self {
        Entity::Resource(resource)
    }
}

/// A sequence to render as a collection.
#[derive(Clone)]
pub enum Listing {
    /// Every item, without pagination.
    Values(Vec<Value>),
    /// A paged source; only the requested page is read.
    Paginated(Arc<dyn Paginator>),
    /// A collection built by the caller.
    Collection(HalCollection),
}

impl fmt::Debug for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listing::Values(values) => f.debug_tuple("Values").field(&values.len()).finish(),
            Listing::Paginated(paginator) => f
                .debug_tuple("Paginated")
                .field(&paginator.total_item_count())
                .finish(),
            Listing::Collection(collection) => {
                f.debug_tuple("Collection").field(collection).finish()
            }
        }
    }
}

/// Route and request details for one render call.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    route_name: Option<String>,
    route_identifier_name: Option<String>,
    route_params: Params,
    entity_route_name: Option<String>,
    collection_name: Option<String>,
    query: Params,
    matched: Params,
}

impl RenderContext {
    pub fn new(route_name: impl Into<String>) -> Self {
        Self {
            route_name: Some(route_name.into()),
            ..Self::default()
        }
    }

    pub fn with_route_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.route_identifier_name = Some(name.into());
        self
    }

    /// Route parameter added to every link built from this context.
    pub fn with_route_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(key.into(), value.into());
        self
    }

    /// Route used for member links of a listing.
    pub fn with_entity_route(mut self, route_name: impl Into<String>) -> Self {
        self.entity_route_name = Some(route_name.into());
        self
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Query parameter propagated into collection links.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Parameters captured from the request path.
    pub fn with_matched_params(mut self, matched: Params) -> Self {
        self.matched = matched;
        self
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub fn route_identifier_name(&self) -> &str {
        self.route_identifier_name.as_deref().unwrap_or("id")
    }

    pub fn matched_params(&self) -> &Params {
        &self.matched
    }
}

/// What a link augmenter can see about the document being rendered.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub route_name: Option<&'a str>,
    pub identifier: Option<&'a str>,
    /// Resource fields, or collection attributes.
    pub data: &'a Map<String, Value>,
    pub matched: &'a Params,
    pub is_collection: bool,
}

/// Adds or modifies links on every rendered resource and collection.
pub trait LinkAugmenter: Send + Sync {
    fn augment(&self, links: &mut LinkCollection, ctx: &LinkContext<'_>);
}

impl<F> LinkAugmenter for F
where
    F: Fn(&mut LinkCollection, &LinkContext<'_>) + Send + Sync,
{
    fn augment(&self, links: &mut LinkCollection, ctx: &LinkContext<'_>) {
        self(links, ctx)
    }
}

/// Route defaults handed down to resources that carry none.
#[derive(Clone, Copy)]
struct Defaults<'a> {
    route: Option<&'a str>,
    identifier_name: &'a str,
    params: &'a Params,
}

/// One ancestor on the embedding path.
struct Frame {
    label: String,
    keyed: bool,
}

/// Renders HAL documents.
pub struct HalRenderer {
    links: LinkResolver,
    identity: IdentityChain,
    hydrator: Arc<dyn Hydrator>,
    metadata: MetadataMap,
    augmenters: RwLock<Vec<Arc<dyn LinkAugmenter>>>,
    max_depth: usize,
}

impl HalRenderer {
    /// A renderer with the default identity chain, hydrator and depth limit.
    pub fn new(links: LinkResolver) -> Self {
        Self::builder(links).build()
    }

    pub fn builder(links: LinkResolver) -> HalRendererBuilder {
        HalRendererBuilder::new(links)
    }

    pub fn link_resolver(&self) -> &LinkResolver {
        &self.links
    }

    pub fn identity(&self) -> &IdentityChain {
        &self.identity
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Register a link augmenter. Augmenters run in registration order.
    pub fn add_link_augmenter<A: LinkAugmenter + 'static>(&self, augmenter: A) {
        self.augmenters.write().push(Arc::new(augmenter));
    }

    /// Build a resource from a domain value.
    pub fn create_resource(&self, value: &Value, ctx: &RenderContext) -> Result<HalResource> {
        self.build_resource(
            value,
            &self.identity,
            self.hydrator.as_ref(),
            Defaults {
                route: ctx.route_name(),
                identifier_name: ctx.route_identifier_name(),
                params: &ctx.route_params,
            },
        )
    }

    /// Build a collection holding the requested page of `listing`.
    pub fn create_collection(
        &self,
        listing: Listing,
        ctx: &RenderContext,
        page: PageRequest,
    ) -> Result<HalCollection> {
        let members = Defaults {
            route: ctx.entity_route_name.as_deref().or(ctx.route_name()),
            identifier_name: ctx.route_identifier_name(),
            params: &ctx.route_params,
        };

        let collection = match listing {
            Listing::Values(values) => HalCollection::new(self.build_members(&values, members)?),
            Listing::Paginated(paginator) => {
                let total = paginator.total_item_count();
                let items = paginator.items(page.offset(), page.limit());
                HalCollection::new(self.build_members(&items, members)?)
                    .with_page(page.page)
                    .with_page_size(page.page_size)
                    .with_total_item_count(total)
            }
            Listing::Collection(collection) => collection,
        };

        Ok(apply_context(collection, ctx))
    }

    /// Render an entity as a HAL resource document.
    pub fn render_entity(&self, entity: Entity, ctx: &RenderContext) -> Result<Value> {
        let resource = self.entity_resource(entity, ctx)?;
        self.render_resource(resource, ctx)
    }

    /// Render the requested page of a listing as a HAL collection document.
    pub fn render_listing(
        &self,
        listing: Listing,
        ctx: &RenderContext,
        page: PageRequest,
    ) -> Result<Value> {
        let collection = self.create_collection(listing, ctx, page)?;
        self.render_collection(collection, ctx)
    }

    /// Complete and serialize a resource.
    pub fn render_resource(&self, resource: HalResource, ctx: &RenderContext) -> Result<Value> {
        debug!(
            route = ?resource.route_name().or(ctx.route_name()),
            identifier = ?resource.identifier(),
            "Rendering HAL resource"
        );
        let resource = self.finalize_resource(resource, ctx)?;
        document::resource_to_value(&resource, &|link| self.links.resolve(link, &ctx.matched))
    }

    /// Complete and serialize a collection.
    pub fn render_collection(
        &self,
        collection: HalCollection,
        ctx: &RenderContext,
    ) -> Result<Value> {
        debug!(
            route = ?collection.route_name().or(ctx.route_name()),
            members = collection.resources().len(),
            "Rendering HAL collection"
        );
        let collection = self.finalize_collection(collection, ctx)?;
        document::collection_to_value(&collection, &|link| {
            self.links.resolve(link, &ctx.matched)
        })
    }

    /// Render an entity as plain JSON, without hypermedia.
    pub fn render_plain_entity(&self, entity: Entity, ctx: &RenderContext) -> Result<Value> {
        let resource = self.entity_resource(entity, ctx)?;
        let resource = self.finalize_resource(resource, ctx)?;
        Ok(document::plain_resource(&resource))
    }

    /// Render the requested page of a listing as a plain JSON array.
    pub fn render_plain_listing(
        &self,
        listing: Listing,
        ctx: &RenderContext,
        page: PageRequest,
    ) -> Result<Value> {
        let collection = self.create_collection(listing, ctx, page)?;
        let collection = self.finalize_collection(collection, ctx)?;
        Ok(document::plain_collection(&collection))
    }

    /// Add self links, metadata embedding and augmented links to a resource tree.
    pub fn finalize_resource(
        &self,
        resource: HalResource,
        ctx: &RenderContext,
    ) -> Result<HalResource> {
        let defaults = Defaults {
            route: ctx.route_name(),
            identifier_name: ctx.route_identifier_name(),
            params: &ctx.route_params,
        };
        self.prepare_resource(resource, Some(defaults), &ctx.matched, &mut Vec::new())
    }

    /// Add self, pagination and augmented links to a collection tree.
    pub fn finalize_collection(
        &self,
        collection: HalCollection,
        ctx: &RenderContext,
    ) -> Result<HalCollection> {
        let collection = apply_context(collection, ctx);
        self.prepare_collection(collection, &ctx.matched, &mut Vec::new())
    }

    fn entity_resource(&self, entity: Entity, ctx: &RenderContext) -> Result<HalResource> {
        match entity {
            Entity::Value(value) => self.create_resource(&value, ctx),
            Entity::Resource(resource) => Ok(resource),
        }
    }

    fn build_members(&self, values: &[Value], defaults: Defaults<'_>) -> Result<Vec<HalResource>> {
        values
            .iter()
            .map(|value| {
                self.build_resource(value, &self.identity, self.hydrator.as_ref(), defaults)
            })
            .collect()
    }

    fn build_resource(
        &self,
        value: &Value,
        identity: &IdentityChain,
        hydrator: &dyn Hydrator,
        defaults: Defaults<'_>,
    ) -> Result<HalResource> {
        let data = hydrator.extract(value).ok_or_else(|| {
            HalError::NonEntityValue(defaults.route.unwrap_or("<unnamed>").to_string())
        })?;

        let mut resource =
            HalResource::new(data).with_route_identifier_name(defaults.identifier_name);
        if let Some(route) = defaults.route {
            resource.set_route_name(route);
        }
        resource
            .route_params_mut()
            .extend(defaults.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        resource.set_identifier(identity.identify(value));
        Ok(resource)
    }

    fn prepare_resource(
        &self,
        mut resource: HalResource,
        defaults: Option<Defaults<'_>>,
        matched: &Params,
        trail: &mut Vec<Frame>,
    ) -> Result<HalResource> {
        if !resource.links().has("self") && resource.route_name().is_none() {
            if let Some(Defaults {
                route: Some(route),
                identifier_name,
                params,
            }) = defaults
            {
                resource.set_route_name(route);
                if resource.route_identifier_name().is_none() {
                    resource.set_route_identifier_name(identifier_name);
                }
                for (key, value) in params {
                    resource
                        .route_params_mut()
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
        }

        if !resource.links().has("self") {
            let link = resource
                .route_self_link()
                .ok_or_else(|| HalError::MissingSelfLink(describe(&resource)))?;
            prepend_link(resource.links_mut(), link);
        }

        let frame = resource_frame(&resource);
        self.guard(trail, &frame)?;
        self.embed_from_metadata(&mut resource)?;

        let mut links = std::mem::take(resource.links_mut());
        self.augment(
            &mut links,
            &LinkContext {
                route_name: resource.route_name(),
                identifier: resource.identifier(),
                data: resource.data(),
                matched,
                is_collection: false,
            },
        );
        *resource.links_mut() = links;

        trail.push(frame);
        let embedded = std::mem::take(resource.embedded_mut());
        let mut prepared = Vec::with_capacity(embedded.len());
        for (name, value) in embedded {
            let value = match value {
                Embedded::Resource(nested) => Embedded::Resource(Box::new(
                    self.prepare_resource(*nested, None, matched, trail)?,
                )),
                Embedded::Resources(nested) => Embedded::Resources(
                    nested
                        .into_iter()
                        .map(|r| self.prepare_resource(r, None, matched, trail))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Embedded::Collection(nested) => Embedded::Collection(Box::new(
                    self.prepare_collection(*nested, matched, trail)?,
                )),
            };
            prepared.push((name, value));
        }
        trail.pop();

        *resource.embedded_mut() = prepared;
        Ok(resource)
    }

    fn prepare_collection(
        &self,
        mut collection: HalCollection,
        matched: &Params,
        trail: &mut Vec<Frame>,
    ) -> Result<HalCollection> {
        let pages = collection.pagination();

        if !collection.links().has("self") {
            let link = collection
                .page_link("self", pages.map(|_| collection.page()))
                .ok_or_else(|| {
                    HalError::MissingSelfLink(collection.collection_name().to_string())
                })?;
            prepend_link(collection.links_mut(), link);
        }

        if let Some(pages) = pages {
            let rels = [
                ("first", Some(pages.first)),
                ("prev", pages.prev),
                ("next", pages.next),
                ("last", Some(pages.last)),
            ];
            for (rel, page) in rels {
                if let Some(link) = page.and_then(|p| collection.page_link(rel, Some(p))) {
                    collection.links_mut().set(link);
                }
            }
        }

        let mut links = std::mem::take(collection.links_mut());
        self.augment(
            &mut links,
            &LinkContext {
                route_name: collection.route_name(),
                identifier: None,
                data: collection.attributes(),
                matched,
                is_collection: true,
            },
        );
        *collection.links_mut() = links;

        let route = collection.entity_route_name().map(str::to_string);
        let identifier_name = collection
            .entity_identifier_name()
            .unwrap_or("id")
            .to_string();
        let params = collection.route_params().clone();
        let defaults = Defaults {
            route: route.as_deref(),
            identifier_name: &identifier_name,
            params: &params,
        };

        let members = std::mem::take(collection.resources_mut());
        *collection.resources_mut() = members
            .into_iter()
            .map(|r| self.prepare_resource(r, Some(defaults), matched, trail))
            .collect::<Result<Vec<_>>>()?;

        Ok(collection)
    }

    fn guard(&self, trail: &[Frame], frame: &Frame) -> Result<()> {
        let cyclic = frame.keyed
            && trail
                .iter()
                .any(|ancestor| ancestor.keyed && ancestor.label == frame.label);

        if cyclic || trail.len() >= self.max_depth {
            let path = trail
                .iter()
                .map(|ancestor| ancestor.label.as_str())
                .chain(std::iter::once(frame.label.as_str()))
                .collect::<Vec<_>>()
                .join(" > ");
            return Err(HalError::CyclicEmbedding {
                path,
                depth: trail.len(),
            });
        }
        Ok(())
    }

    fn embed_from_metadata(&self, resource: &mut HalResource) -> Result<()> {
        if self.metadata.is_empty() {
            return Ok(());
        }

        let fields: Vec<(String, Value, ResourceMetadata)> = resource
            .data()
            .iter()
            .filter(|(_, value)| value.is_object() || value.is_array())
            .filter_map(|(field, value)| {
                self.metadata
                    .get(field)
                    .map(|md| (field.clone(), value.clone(), md.clone()))
            })
            .collect();

        for (field, value, metadata) in fields {
            let embedded = self.embedded_from_metadata(&value, &metadata)?;
            resource.set_embedded(field, embedded);
        }
        Ok(())
    }

    fn embedded_from_metadata(
        &self,
        value: &Value,
        metadata: &ResourceMetadata,
    ) -> Result<Embedded> {
        let override_identity = metadata.identity();
        let identity = override_identity.as_ref().unwrap_or(&self.identity);
        let hydrator: &dyn Hydrator = &**metadata.hydrator().unwrap_or(&self.hydrator);
        let defaults = Defaults {
            route: Some(metadata.route_name()),
            identifier_name: metadata.route_identifier_name(),
            params: metadata.route_params(),
        };

        match value {
            Value::Array(items) => {
                let members = items
                    .iter()
                    .map(|item| self.build_resource(item, identity, hydrator, defaults))
                    .collect::<Result<Vec<_>>>()?;
                if !metadata.is_collection() {
                    return Ok(Embedded::Resources(members));
                }

                let mut collection = HalCollection::new(members)
                    .with_route(metadata.route_name())
                    .with_entity_identifier_name(metadata.route_identifier_name());
                for (key, value) in metadata.route_params() {
                    collection = collection.with_route_param(key.clone(), value.clone());
                }
                if let Some(name) = metadata.collection_name() {
                    collection = collection.with_collection_name(name);
                }
                Ok(Embedded::Collection(Box::new(collection)))
            }
            other => Ok(Embedded::Resource(Box::new(
                self.build_resource(other, identity, hydrator, defaults)?,
            ))),
        }
    }

    fn augment(&self, links: &mut LinkCollection, ctx: &LinkContext<'_>) {
        for augmenter in self.augmenters.read().iter() {
            augmenter.augment(links, ctx);
        }
    }
}

impl fmt::Debug for HalRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HalRenderer")
            .field("links", &self.links)
            .field("identity", &self.identity)
            .field("augmenters", &self.augmenters.read().len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Builder for [`HalRenderer`].
pub struct HalRendererBuilder {
    links: LinkResolver,
    identity: IdentityChain,
    hydrator: Arc<dyn Hydrator>,
    metadata: MetadataMap,
    max_depth: usize,
}

impl HalRendererBuilder {
    pub fn new(links: LinkResolver) -> Self {
        Self {
            links,
            identity: IdentityChain::default(),
            hydrator: Arc::new(ObjectHydrator),
            metadata: MetadataMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn identity(mut self, identity: IdentityChain) -> Self {
        self.identity = identity;
        self
    }

    pub fn hydrator<H: Hydrator + 'static>(mut self, hydrator: H) -> Self {
        self.hydrator = Arc::new(hydrator);
        self
    }

    pub fn metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Maximum embedding depth, at least 1.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn build(self) -> HalRenderer {
        HalRenderer {
            links: self.links,
            identity: self.identity,
            hydrator: self.hydrator,
            metadata: self.metadata,
            augmenters: RwLock::new(Vec::new()),
            max_depth: self.max_depth,
        }
    }
}

fn apply_context(mut collection: HalCollection, ctx: &RenderContext) -> HalCollection {
    if collection.route_name().is_none() {
        if let Some(route) = ctx.route_name() {
            collection.set_route_name(route);
        }
    }
    if let Some(name) = &ctx.collection_name {
        collection = collection.with_collection_name(name.clone());
    }
    if let Some(route) = &ctx.entity_route_name {
        collection = collection.with_entity_route(route.clone());
    }
    if collection.entity_identifier_name().is_none() {
        collection = collection.with_entity_identifier_name(ctx.route_identifier_name());
    }
    for (key, value) in &ctx.route_params {
        if !collection.route_params().contains_key(key) {
            collection = collection.with_route_param(key.clone(), value.clone());
        }
    }
    for (key, value) in &ctx.query {
        collection = collection.with_query(key.clone(), value.clone());
    }
    collection
}

fn prepend_link(links: &mut LinkCollection, link: Link) {
    let rest = std::mem::take(links);
    links.add(link);
    links.merge(&rest);
}

fn describe(resource: &HalResource) -> String {
    resource
        .identifier()
        .map(str::to_string)
        .unwrap_or_else(|| "<anonymous>".to_string())
}

fn resource_frame(resource: &HalResource) -> Frame {
    let base = resource
        .route_name()
        .map(str::to_string)
        .or_else(|| {
            resource.links().first("self").map(|link| match link.target() {
                LinkTarget::Href(href) => href.clone(),
                LinkTarget::Route { name, .. } => name.clone(),
            })
        })
        .unwrap_or_else(|| "resource".to_string());

    match resource.identifier() {
        Some(id) => Frame {
            label: format!("{}:{}", base, id),
            keyed: true,
        },
        None => Frame {
            label: base,
            keyed: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginator::ArrayPaginator;
    use crate::route::RouteTable;
    use serde_json::json;

    fn routes() -> RouteTable {
        RouteTable::new()
            .route("users", "/users[/{id}]")
            .unwrap()
            .route("status", "/status[/{id}]")
            .unwrap()
            .route("author-posts", "/authors/{author_id}/posts[/{post_id}]")
            .unwrap()
    }

    fn renderer() -> HalRenderer {
        HalRenderer::new(LinkResolver::new(routes()))
    }

    fn with_metadata(metadata: MetadataMap) -> HalRenderer {
        HalRenderer::builder(LinkResolver::new(routes()))
            .metadata(metadata)
            .build()
    }

    #[test]
    fn test_entity_self_link() {
        let document = renderer()
            .render_entity(
                json!({"id": "mwop", "name": "Matthew"}).into(),
                &RenderContext::new("users"),
            )
            .unwrap();

        assert_eq!(document["_links"]["self"]["href"], json!("/users/mwop"));
        assert_eq!(document["name"], json!("Matthew"));
    }

    #[test]
    fn test_entity_without_identifier_links_to_route() {
        let document = renderer()
            .render_entity(json!({"name": "anonymous"}).into(), &RenderContext::new("users"))
            .unwrap();
        assert_eq!(document["_links"]["self"]["href"], json!("/users"));
    }

    #[test]
    fn test_missing_self_link() {
        let err = renderer()
            .render_entity(json!({"id": 1}).into(), &RenderContext::default())
            .unwrap_err();
        assert!(matches!(err, HalError::MissingSelfLink(_)));
    }

    #[test]
    fn test_non_entity_value() {
        let err = renderer()
            .render_entity(json!("scalar").into(), &RenderContext::new("users"))
            .unwrap_err();
        assert!(matches!(err, HalError::NonEntityValue(_)));
    }

    #[test]
    fn test_metadata_embeds_nested_resource() {
        let renderer = with_metadata(
            MetadataMap::new().with("user", ResourceMetadata::entity("users")),
        );
        let document = renderer
            .render_entity(
                json!({"id": 1, "status": "hello", "user": {"id": "mwop", "name": "Matthew"}}).into(),
                &RenderContext::new("status"),
            )
            .unwrap();

        assert_eq!(document["_links"]["self"]["href"], json!("/status/1"));
        assert!(document.get("user").is_none());
        assert_eq!(
            document["_embedded"]["user"]["_links"]["self"]["href"],
            json!("/users/mwop")
        );
    }

    #[test]
    fn test_prebuilt_nested_resource_keeps_own_self_link() {
        let user = HalResource::from_value(json!({"id": "mwop"}))
            .unwrap()
            .with_identifier("mwop")
            .with_route("users");
        let status = HalResource::from_value(json!({"status": "hello"}))
            .unwrap()
            .with_identifier("1")
            .embed("user", user);

        let document = renderer()
            .render_entity(status.into(), &RenderContext::new("status"))
            .unwrap();
        assert_eq!(document["_links"]["self"]["href"], json!("/status/1"));
        assert_eq!(
            document["_embedded"]["user"]["_links"]["self"]["href"],
            json!("/users/mwop")
        );
    }

    #[test]
    fn test_embedded_collection_metadata() {
        let renderer = with_metadata(
            MetadataMap::new().with(
                "friends",
                ResourceMetadata::collection("users").with_collection_name("users"),
            ),
        );
        let document = renderer
            .render_entity(
                json!({"id": "mwop", "friends": [{"id": "a"}, {"id": "b"}]}).into(),
                &RenderContext::new("users"),
            )
            .unwrap();

        let friends = &document["_embedded"]["friends"];
        assert_eq!(friends["_links"]["self"]["href"], json!("/users"));
        assert_eq!(
            friends["_embedded"]["users"][1]["_links"]["self"]["href"],
            json!("/users/b")
        );
    }

    #[test]
    fn test_cycle_detected() {
        let renderer = with_metadata(
            MetadataMap::new().with("manager", ResourceMetadata::entity("users")),
        );
        let value = json!({
            "id": "a",
            "manager": {"id": "b", "manager": {"id": "a"}}
        });

        let err = renderer
            .render_entity(value.into(), &RenderContext::new("users"))
            .unwrap_err();
        match err {
            HalError::CyclicEmbedding { path, depth } => {
                assert_eq!(path, "users:a > users:b > users:a");
                assert_eq!(depth, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let renderer = HalRenderer::builder(LinkResolver::new(routes()))
            .metadata(MetadataMap::new().with("manager", ResourceMetadata::entity("users")))
            .max_depth(2)
            .build();
        let value = json!({"id": "a", "manager": {"id": "b", "manager": {"id": "c"}}});

        let err = renderer
            .render_entity(value.into(), &RenderContext::new("users"))
            .unwrap_err();
        assert!(matches!(err, HalError::CyclicEmbedding { depth: 2, .. }));
    }

    #[test]
    fn test_pagination_links_on_last_page() {
        let items: Vec<Value> = (1..=45).map(|i| json!({"id": i})).collect();
        let document = renderer()
            .render_listing(
                Listing::Paginated(Arc::new(ArrayPaginator::new(items))),
                &RenderContext::new("users"),
                PageRequest::new(2, 30),
            )
            .unwrap();

        let links = &document["_links"];
        assert_eq!(links["self"]["href"], json!("/users?page=2"));
        assert_eq!(links["first"]["href"], json!("/users?page=1"));
        assert_eq!(links["prev"]["href"], json!("/users?page=1"));
        assert_eq!(links["last"]["href"], json!("/users?page=2"));
        assert!(links.get("next").is_none());

        assert_eq!(document["_embedded"]["items"].as_array().unwrap().len(), 15);
        assert_eq!(
            document["_embedded"]["items"][0]["_links"]["self"]["href"],
            json!("/users/31")
        );
        assert_eq!(document["total_items"], json!(45));
        assert_eq!(document["page_count"], json!(2));
    }

    #[test]
    fn test_single_page_has_no_pagination_links() {
        let items: Vec<Value> = (1..=3).map(|i| json!({"id": i})).collect();
        let document = renderer()
            .render_listing(
                Listing::Paginated(Arc::new(ArrayPaginator::new(items))),
                &RenderContext::new("users"),
                PageRequest::default(),
            )
            .unwrap();

        assert_eq!(document["_links"]["self"]["href"], json!("/users"));
        assert!(document["_links"].get("first").is_none());
        assert_eq!(document["total_items"], json!(3));
    }

    #[test]
    fn test_out_of_range_page_has_no_pagination_links() {
        let items: Vec<Value> = (1..=45).map(|i| json!({"id": i})).collect();
        let document = renderer()
            .render_listing(
                Listing::Paginated(Arc::new(ArrayPaginator::new(items))),
                &RenderContext::new("users"),
                PageRequest::new(5, 30),
            )
            .unwrap();

        assert!(document["_links"].get("next").is_none());
        assert!(document["_links"].get("last").is_none());
        assert_eq!(document["_embedded"]["items"], json!([]));
    }

    #[test]
    fn test_query_propagates_into_pagination_links() {
        let items: Vec<Value> = (1..=45).map(|i| json!({"id": i})).collect();
        let ctx = RenderContext::new("users").with_query("sort", "name");
        let document = renderer()
            .render_listing(
                Listing::Paginated(Arc::new(ArrayPaginator::new(items))),
                &ctx,
                PageRequest::new(1, 30),
            )
            .unwrap();

        assert_eq!(
            document["_links"]["next"]["href"],
            json!("/users?page=2&sort=name")
        );
    }

    #[test]
    fn test_nested_route_params_reach_members() {
        let ctx = RenderContext::new("author-posts")
            .with_route_identifier_name("post_id")
            .with_route_param("author_id", "3");
        let document = renderer()
            .render_listing(
                Listing::Values(vec![json!({"id": 9, "title": "Hello"})]),
                &ctx,
                PageRequest::default(),
            )
            .unwrap();

        assert_eq!(document["_links"]["self"]["href"], json!("/authors/3/posts"));
        assert_eq!(
            document["_embedded"]["items"][0]["_links"]["self"]["href"],
            json!("/authors/3/posts/9")
        );
    }

    struct AvatarLinks;

    impl LinkAugmenter for AvatarLinks {
        fn augment(&self, links: &mut LinkCollection, ctx: &LinkContext<'_>) {
            if ctx.is_collection {
                return;
            }
            if let Some(id) = ctx.identifier {
                links.add(Link::href("avatar", format!("/avatars/{}.png", id)));
            }
        }
    }

    #[test]
    fn test_link_augmenter() {
        let renderer = renderer();
        renderer.add_link_augmenter(AvatarLinks);

        let document = renderer
            .render_entity(json!({"id": "mwop"}).into(), &RenderContext::new("users"))
            .unwrap();
        assert_eq!(document["_links"]["avatar"]["href"], json!("/avatars/mwop.png"));
        assert_eq!(document["_links"]["self"]["href"], json!("/users/mwop"));
    }

    #[test]
    fn test_custom_identity_and_hydrator() {
        let renderer = HalRenderer::builder(LinkResolver::new(routes()))
            .identity(IdentityChain::field("username"))
            .hydrator(crate::hydrator::FieldFilterHydrator::new(["password"]))
            .build();

        let document = renderer
            .render_entity(
                json!({"username": "mwop", "password": "secret"}).into(),
                &RenderContext::new("users"),
            )
            .unwrap();
        assert_eq!(document["_links"]["self"]["href"], json!("/users/mwop"));
        assert!(document.get("password").is_none());
    }

    #[test]
    fn test_plain_rendering() {
        let renderer = with_metadata(
            MetadataMap::new().with("user", ResourceMetadata::entity("users")),
        );
        let value = renderer
            .render_plain_entity(
                json!({"id": 1, "user": {"id": "mwop"}}).into(),
                &RenderContext::new("status"),
            )
            .unwrap();
        assert_eq!(value, json!({"id": 1, "user": {"id": "mwop"}}));

        let listing = renderer
            .render_plain_listing(
                Listing::Values(vec![json!({"id": 1}), json!({"id": 2})]),
                &RenderContext::new("status"),
                PageRequest::default(),
            )
            .unwrap();
        assert_eq!(listing, json!([{"id": 1}, {"id": 2}]));
    }
}
