//! HAL collections.

use crate::link::{Link, LinkCollection, Params};
use crate::paginator::{DEFAULT_PAGE_SIZE, PaginationPages};
use crate::resource::HalResource;
use serde_json::{Map, Value};

/// Default key the members of a collection are embedded under.
pub const DEFAULT_COLLECTION_NAME: &str = "items";

/// Query parameter carrying the page number in pagination links.
pub const PAGE_QUERY_PARAM: &str = "page";

/// An ordered set of resources plus pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct HalCollection {
    resources: Vec<HalResource>,
    collection_name: String,
    route_name: Option<String>,
    route_params: Params,
    query: Params,
    entity_route_name: Option<String>,
    entity_identifier_name: Option<String>,
    page: u64,
    page_size: u64,
    total_item_count: Option<u64>,
    links: LinkCollection,
    attributes: Map<String, Value>,
}

impl HalCollection {
    pub fn new(resources: Vec<HalResource>) -> Self {
        Self {
            resources,
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            route_name: None,
            route_params: Params::new(),
            query: Params::new(),
            entity_route_name: None,
            entity_identifier_name: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total_item_count: None,
            links: LinkCollection::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    pub fn with_route(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = Some(route_name.into());
        self
    }

    pub fn with_route_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(key.into(), value.into());
        self
    }

    /// Query parameter preserved in the `self` and pagination links.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Route used for member `self` links (defaults to the collection route).
    pub fn with_entity_route(mut self, route_name: impl Into<String>) -> Self {
        self.entity_route_name = Some(route_name.into());
        self
    }

    pub fn with_entity_identifier_name(mut self, name: impl Into<String>) -> Self {
        self.entity_identifier_name = Some(name.into());
        self
    }

    /// Page number, clamped to at least 1.
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = page.max(1);
        self
    }

    /// Page size, clamped to at least 1.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_total_item_count(mut self, total: u64) -> Self {
        self.total_item_count = Some(total);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.add(link);
        self
    }

    pub fn resources(&self) -> &[HalResource] {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Vec<HalResource> {
        &mut self.resources
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub fn set_route_name(&mut self, route_name: impl Into<String>) {
        self.route_name = Some(route_name.into());
    }

    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    pub fn entity_route_name(&self) -> Option<&str> {
        self.entity_route_name.as_deref().or(self.route_name.as_deref())
    }

    pub fn entity_identifier_name(&self) -> Option<&str> {
        self.entity_identifier_name.as_deref()
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_item_count(&self) -> Option<u64> {
        self.total_item_count
    }

    pub fn links(&self) -> &LinkCollection {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkCollection {
        &mut self.links
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    /// Pagination pages, when the total is known and the page is in bounds.
    pub fn pagination(&self) -> Option<PaginationPages> {
        let total = self.total_item_count?;
        PaginationPages::compute(self.page, self.page_size, total)
    }

    /// Number of pages, when the total is known.
    pub fn page_count(&self) -> Option<u64> {
        self.total_item_count
            .map(|total| total.div_ceil(self.page_size).max(1))
    }

    /// A link to `page` of this collection through its route.
    pub fn page_link(&self, rel: &str, page: Option<u64>) -> Option<Link> {
        let route = self.route_name.as_deref()?;
        let mut link = Link::route(rel, route).with_params(&self.route_params);
        for (key, value) in &self.query {
            if key != PAGE_QUERY_PARAM {
                link = link.with_query(key.clone(), value.clone());
            }
        }
        if let Some(page) = page {
            link = link.with_query(PAGE_QUERY_PARAM, page.to_string());
        }
        Some(link)
    }
}
