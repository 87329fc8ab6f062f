//! REST dispatch controller.
//!
//! [`RestController`] turns an HTTP request into a resource operation and the
//! operation's outcome into a HAL (or plain JSON) response:
//!
//! 1. The target is an entity when the route identifier parameter is present,
//!    otherwise the collection.
//! 2. `OPTIONS` answers with the allowed methods and `HEAD` runs the `GET`
//!    operation; both are always permitted. Other methods must be configured
//!    for the target and map to an operation, else 405.
//! 3. The `Accept` header selects a representation, else 406.
//! 4. The operation runs; failures become problem responses.
//! 5. The result is rendered and post-render hooks run. Creates answer 201
//!    with a `Location` header, deletes 204, everything else 200.
//!
//! Responses to `HEAD` never carry a body.

use crate::config::{RestControllerConfig, Validate};
use crate::error::{ConfigError, RestError};
use crate::event::Operation;
use crate::message::{RestRequest, RestResponse};
use crate::listener::ListenerRegistry;
use crate::negotiation::{Accept, AcceptCriteria, Representation};
use crate::problem::{ApiProblem, ProblemMapper};
use crate::resource::{Outcome, Resource};
use armature_hal::{
    ArrayPaginator, Entity, HalRenderer, Link, Listing, PAGE_QUERY_PARAM, PageRequest, Params,
    RenderContext, document,
};
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue, LOCATION};
use http::{Method, StatusCode};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// What a post-render hook can see about the response being built.
#[derive(Debug, Clone, Copy)]
pub struct RenderHookContext<'a> {
    pub operation: Operation,
    pub representation: Representation,
    pub request: &'a RestRequest,
}

/// Runs on the rendered document before it is written to the response.
pub trait RenderHook: Send + Sync {
    fn after_render(&self, document: &mut Value, ctx: &RenderHookContext<'_>);
}

impl<F> RenderHook for F
where
    F: Fn(&mut Value, &RenderHookContext<'_>) + Send + Sync,
{
    fn after_render(&self, document: &mut Value, ctx: &RenderHookContext<'_>) {
        self(document, ctx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Entity(String),
    Collection,
}

/// Dispatches requests for one resource route.
pub struct RestController {
    config: RestControllerConfig,
    criteria: AcceptCriteria,
    collection_methods: Vec<Method>,
    resource_methods: Vec<Method>,
    registry: Arc<ListenerRegistry>,
    renderer: Arc<HalRenderer>,
    mapper: ProblemMapper,
    render_hooks: RwLock<Vec<Arc<dyn RenderHook>>>,
}

impl RestController {
    /// Create a controller; the configuration is validated first.
    pub fn new(
        config: RestControllerConfig,
        registry: Arc<ListenerRegistry>,
        renderer: Arc<HalRenderer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            criteria: config.criteria(),
            collection_methods: dispatchable(config.collection_methods()?, false),
            resource_methods: dispatchable(config.resource_methods()?, true),
            mapper: ProblemMapper::new(config.expose_internal_errors),
            config,
            registry,
            renderer,
            render_hooks: RwLock::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &RestControllerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn renderer(&self) -> &Arc<HalRenderer> {
        &self.renderer
    }

    /// Register a hook run on every rendered document, in registration order.
    pub fn add_render_hook<H: RenderHook + 'static>(&self, hook: H) {
        self.render_hooks.write().push(Arc::new(hook));
    }

    /// Handle one request. Every failure is answered with a problem response.
    pub fn dispatch(&self, request: &RestRequest) -> RestResponse {
        let span = info_span!(
            "rest_request",
            event_id = %self.config.event_id,
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let mut response = match self.handle(request) {
            Ok(response) => response,
            Err(err) => self.mapper.map(&err).to_response(),
        };
        if request.method == Method::HEAD {
            response.body.clear();
        }
        debug!(status = response.status.as_u16(), "Request dispatched");
        response
    }

    fn handle(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        let Some(route_params) = self.route_params(request) else {
            return Ok(ApiProblem::new(404, "Route not found").to_response());
        };
        let target = match route_params.get(&self.config.route_identifier_name) {
            Some(id) if !id.is_empty() => Target::Entity(id.clone()),
            _ => Target::Collection,
        };
        let allowed = match target {
            Target::Entity(_) => &self.resource_methods,
            Target::Collection => &self.collection_methods,
        };

        if request.method == Method::OPTIONS {
            return Ok(RestResponse::new(StatusCode::OK).with_header(ALLOW, allow_header(allowed)));
        }

        let is_entity = matches!(target, Target::Entity(_));
        let operation = if request.method == Method::HEAD {
            operation_for(&Method::GET, is_entity)
        } else if allowed.contains(&request.method) {
            operation_for(&request.method, is_entity)
        } else {
            None
        };
        let Some(operation) = operation else {
            return Ok(method_not_allowed(&request.method, allowed));
        };

        let accept = Accept::from_header(request.header("accept"));
        let Some(representation) = self.criteria.negotiate(&accept) else {
            warn!(accept = ?request.header("accept"), "No acceptable representation");
            return Ok(ApiProblem::new(406, "Cannot honor Accept type specified").to_response());
        };

        debug!(operation = %operation, representation = ?representation, "Invoking resource");

        let resource = Resource::new(Arc::clone(&self.registry))
            .with_route_params(route_params.clone())
            .with_query_params(request.query_params.clone());
        let id = match &target {
            Target::Entity(id) => id.as_str(),
            Target::Collection => "",
        };

        let mut page = PageRequest::new(1, self.config.page_size);
        let outcome = match operation {
            Operation::Create => resource.create(object_body(request)?)?,
            Operation::Update => resource.update(id, object_body(request)?)?,
            Operation::Patch => resource.patch(id, object_body(request)?)?,
            Operation::ReplaceList => resource.replace_list(
                request
                    .json_body()?
                    .unwrap_or_else(|| Value::Array(Vec::new())),
            )?,
            Operation::Delete => resource.delete(id)?,
            Operation::DeleteList => resource.delete_list(request.json_body()?)?,
            Operation::Fetch => resource.fetch(id)?,
            Operation::FetchAll => {
                page = self.page_request(request)?;
                let mut query = self.whitelisted_query(request);
                query.insert(PAGE_QUERY_PARAM.to_string(), page.page.to_string());
                Resource::new(Arc::clone(&self.registry))
                    .with_route_params(route_params.clone())
                    .fetch_all(query)?
            }
        };

        let ctx = self.render_context(&route_params, request, operation);
        let response = match outcome {
            Outcome::Problem(problem) => return Ok(problem.to_response()),
            Outcome::NotFound => {
                return Ok(ApiProblem::new(404, "Entity not found").to_response());
            }
            Outcome::Deleted => return Ok(RestResponse::no_content()),
            Outcome::Entity(entity) => {
                let fallback_id = match &target {
                    Target::Entity(id) => Some(id.as_str()),
                    Target::Collection => None,
                };
                self.entity_response(entity, &ctx, representation, fallback_id, operation, request)?
            }
            Outcome::Listing(listing) => {
                let listing = match (operation, listing) {
                    (Operation::FetchAll, Listing::Values(values)) => {
                        Listing::Paginated(Arc::new(ArrayPaginator::new(values)))
                    }
                    (_, listing) => listing,
                };
                self.listing_response(listing, &ctx, page, representation, operation, request)?
            }
        };
        Ok(response)
    }

    fn entity_response(
        &self,
        entity: Entity,
        ctx: &RenderContext,
        representation: Representation,
        fallback_id: Option<&str>,
        operation: Operation,
        request: &RestRequest,
    ) -> Result<RestResponse, RestError> {
        let mut resource = match entity {
            Entity::Value(value) => self.renderer.create_resource(&value, ctx)?,
            Entity::Resource(resource) => resource,
        };
        if resource.identifier().is_none() {
            resource.set_identifier(fallback_id.map(str::to_string));
        }
        let resource = self.renderer.finalize_resource(resource, ctx)?;
        let resolve = |link: &Link| {
            self.renderer
                .link_resolver()
                .resolve(link, ctx.matched_params())
        };

        let document = match representation {
            Representation::Hal => document::resource_to_value(&resource, &resolve)?,
            Representation::Json => document::plain_resource(&resource),
        };

        let mut response = self.respond(document, representation, operation, request)?;
        if operation == Operation::Create {
            response.status = StatusCode::CREATED;
            if let Some(link) = resource.links().first("self") {
                let href = resolve(link)?;
                match HeaderValue::from_str(&href) {
                    Ok(value) => response = response.with_header(LOCATION, value),
                    Err(_) => warn!(href = %href, "Self link is not a valid Location header"),
                }
            }
        }
        Ok(response)
    }

    fn listing_response(
        &self,
        listing: Listing,
        ctx: &RenderContext,
        page: PageRequest,
        representation: Representation,
        operation: Operation,
        request: &RestRequest,
    ) -> Result<RestResponse, RestError> {
        let collection = self.renderer.create_collection(listing, ctx, page)?;
        let collection = self.renderer.finalize_collection(collection, ctx)?;

        let document = match representation {
            Representation::Hal => document::collection_to_value(&collection, &|link| {
                self.renderer
                    .link_resolver()
                    .resolve(link, ctx.matched_params())
            })?,
            Representation::Json => document::plain_collection(&collection),
        };
        self.respond(document, representation, operation, request)
    }

    fn respond(
        &self,
        mut document: Value,
        representation: Representation,
        operation: Operation,
        request: &RestRequest,
    ) -> Result<RestResponse, RestError> {
        let hooks: Vec<Arc<dyn RenderHook>> = self.render_hooks.read().clone();
        let hook_ctx = RenderHookContext {
            operation,
            representation,
            request,
        };
        for hook in hooks {
            hook.after_render(&mut document, &hook_ctx);
        }

        Ok(RestResponse::new(StatusCode::OK)
            .with_json_body(&document)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static(representation.content_type()),
            ))
    }

    /// `None` when the path belongs to another route.
    fn route_params(&self, request: &RestRequest) -> Option<Params> {
        if !request.route_params.is_empty() {
            return Some(request.route_params.clone());
        }
        match self.renderer.link_resolver().match_path(&request.path) {
            Some(matched) if matched.name == self.config.route_name => Some(matched.params),
            Some(matched) => {
                warn!(route = %matched.name, "Request path belongs to a different route");
                None
            }
            None => Some(Params::new()),
        }
    }

    fn render_context(
        &self,
        route_params: &Params,
        request: &RestRequest,
        operation: Operation,
    ) -> RenderContext {
        let mut ctx = RenderContext::new(&self.config.route_name)
            .with_route_identifier_name(&self.config.route_identifier_name)
            .with_collection_name(&self.config.collection_name)
            .with_matched_params(route_params.clone());
        for (key, value) in route_params {
            if *key != self.config.route_identifier_name {
                ctx = ctx.with_route_param(key, value);
            }
        }
        if operation == Operation::FetchAll {
            for (key, value) in self.whitelisted_query(request) {
                ctx = ctx.with_query(key, value);
            }
            if let Some(param) = &self.config.page_size_param {
                if let Some(value) = request.query(param) {
                    ctx = ctx.with_query(param, value);
                }
            }
        }
        ctx
    }

    fn whitelisted_query(&self, request: &RestRequest) -> Params {
        request
            .query_params
            .iter()
            .filter(|(key, _)| self.config.collection_query_whitelist.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn page_request(&self, request: &RestRequest) -> Result<PageRequest, RestError> {
        let page = match request.query(PAGE_QUERY_PARAM) {
            Some(raw) => positive_integer(PAGE_QUERY_PARAM, raw)?,
            None => 1,
        };

        let mut page_size = self.config.page_size;
        if let Some(param) = &self.config.page_size_param {
            if let Some(raw) = request.query(param) {
                page_size = positive_integer(param, raw)?;
            }
        }
        if let Some(max) = self.config.max_page_size {
            page_size = page_size.min(max);
        }

        Ok(PageRequest::new(page, page_size))
    }
}

impl fmt::Debug for RestController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestController")
            .field("route_name", &self.config.route_name)
            .field("event_id", &self.config.event_id)
            .field("collection_methods", &self.collection_methods)
            .field("resource_methods", &self.resource_methods)
            .field("render_hooks", &self.render_hooks.read().len())
            .finish()
    }
}

fn operation_for(method: &Method, is_entity: bool) -> Option<Operation> {
    let operation = match (is_entity, method.as_str()) {
        (true, "GET") => Operation::Fetch,
        (true, "PUT") => Operation::Update,
        (true, "PATCH") => Operation::Patch,
        (true, "DELETE") => Operation::Delete,
        (false, "GET") => Operation::FetchAll,
        (false, "POST") => Operation::Create,
        (false, "PUT") => Operation::ReplaceList,
        (false, "DELETE") => Operation::DeleteList,
        _ => return None,
    };
    Some(operation)
}

/// Keep the configured methods that map to an operation.
fn dispatchable(methods: Vec<Method>, is_entity: bool) -> Vec<Method> {
    methods
        .into_iter()
        .filter(|method| {
            let keep = operation_for(method, is_entity).is_some();
            if !keep {
                warn!(method = %method, is_entity, "Ignoring method with no resource operation");
            }
            keep
        })
        .collect()
}

/// Configured methods followed by `HEAD` and `OPTIONS`.
fn allowed_methods(configured: &[Method]) -> Vec<String> {
    let mut methods: Vec<String> = configured.iter().map(|m| m.to_string()).collect();
    for always in [Method::HEAD, Method::OPTIONS] {
        if !configured.contains(&always) {
            methods.push(always.to_string());
        }
    }
    methods
}

fn allow_header(configured: &[Method]) -> HeaderValue {
    HeaderValue::from_str(&allowed_methods(configured).join(", "))
        .unwrap_or_else(|_| HeaderValue::from_static("HEAD, OPTIONS"))
}

fn method_not_allowed(method: &Method, configured: &[Method]) -> RestResponse {
    warn!(method = %method, "Method not allowed");
    ApiProblem::new(405, format!("The {} method is not allowed", method))
        .with_additional("allow", allowed_methods(configured))
        .to_response()
}

fn object_body(request: &RestRequest) -> Result<Value, RestError> {
    Ok(request
        .json_body()?
        .unwrap_or_else(|| Value::Object(Map::new())))
}

fn positive_integer(name: &str, raw: &str) -> Result<u64, RestError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(RestError::InvalidQuery {
            name: name.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}
