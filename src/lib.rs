// Armature API - hypermedia REST resources for Armature
//
// This library bundles the HAL document model and renderer with the
// event-driven REST controller that serves it.

// Re-export the member crates
pub use armature_hal as hal;
pub use armature_rest as rest;

pub use armature_hal::{
    HalCollection, HalError, HalRenderer, HalResource, Link, LinkCollection, LinkResolver,
    RouteTable,
};
pub use armature_rest::{
    ApiProblem, ListenerRegistry, ListenerResult, Operation, OperationEvent, ResourceListener,
    RestController, RestControllerConfig, RestError, RestRequest, RestResponse,
};

// Re-export common dependencies for convenience
pub use http;
pub use serde_json;

// Prelude for common imports
pub mod prelude {
    pub use armature_hal::{
        ArrayPaginator, Entity, HalCollection, HalRenderer, HalRendererBuilder, HalResource,
        IdentityChain, Link, LinkCollection, LinkResolver, Listing, MetadataMap, PageRequest,
        Paginator, Params, RenderContext, ResourceMetadata, RouteTable,
    };
    pub use armature_rest::{
        AcceptCriterion, ApiProblem, ListenerRegistry, ListenerResult, LogConfig, Operation,
        OperationEvent, Outcome, Payload, Representation, Resource, ResourceListener,
        RestController, RestControllerConfig, RestRequest, RestResponse,
    };
    pub use serde_json::{Value, json};
}
