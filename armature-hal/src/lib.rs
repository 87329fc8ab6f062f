//! HAL (Hypertext Application Language) support for Armature
//!
//! This crate provides the hypermedia document model used by Armature REST
//! controllers and the renderer that turns domain data into HAL JSON.
//!
//! ## Features
//!
//! - **Document model** - [`HalResource`], [`HalCollection`], [`Link`] and [`LinkCollection`]
//! - **Link resolution** - Route links resolved through a pluggable [`RouteResolver`]
//! - **Route table** - Named `/users[/{id}]` style templates with path matching
//! - **Embedding** - Nested resources and collections, bounded against cycles
//! - **Pagination** - `first`/`prev`/`next`/`last` links from a [`Paginator`]
//! - **Parsing** - HAL JSON back into resources and collections
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_hal::*;
//! use serde_json::json;
//!
//! let routes = RouteTable::new()
//!     .route("users", "/users[/{id}]")
//!     .unwrap();
//! let renderer = HalRenderer::new(LinkResolver::new(routes));
//!
//! let users: Vec<_> = (1..=45).map(|i| json!({"id": i})).collect();
//! let document = renderer
//!     .render_listing(
//!         Listing::Values(users),
//!         &RenderContext::new("users"),
//!         PageRequest::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(document["_links"]["self"]["href"], "/users");
//! assert_eq!(document["_embedded"]["items"][0]["_links"]["self"]["href"], "/users/1");
//! ```

pub mod collection;
pub mod document;
pub mod error;
pub mod hydrator;
pub mod identity;
pub mod link;
pub mod metadata;
pub mod paginator;
pub mod renderer;
pub mod resolver;
pub mod resource;
pub mod route;

pub use collection::{DEFAULT_COLLECTION_NAME, HalCollection, PAGE_QUERY_PARAM};
pub use document::{parse_collection, parse_resource};
pub use error::{HalError, Result};
pub use hydrator::{FieldFilterHydrator, Hydrator, ObjectHydrator};
pub use identity::{FieldIdentity, IdentityChain, IdentityStrategy};
pub use link::{Link, LinkCollection, LinkTarget, Params};
pub use metadata::{MetadataMap, ResourceMetadata};
pub use paginator::{ArrayPaginator, DEFAULT_PAGE_SIZE, PageRequest, PaginationPages, Paginator};
pub use renderer::{
    DEFAULT_MAX_DEPTH, Entity, HalRenderer, HalRendererBuilder, LinkAugmenter, LinkContext,
    Listing, RenderContext,
};
pub use resolver::{InheritMatchedParams, LinkResolver, ParamContext, ParamHook};
pub use resource::{Embedded, HalResource};
pub use route::{RouteMatch, RouteResolver, RouteTable};
