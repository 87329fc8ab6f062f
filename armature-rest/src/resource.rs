//! The resource engine.
//!
//! [`Resource`] validates operation input, runs the registered hooks and
//! listeners, and checks that the listener result has the shape the
//! operation promises.

use crate::error::ResourceError;
use crate::event::{Operation, OperationEvent, OperationParams, Payload, Phase};
use crate::listener::{ListenerRegistry, ListenerResult};
use crate::problem::ApiProblem;
use armature_hal::{Entity, Listing, Params};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The validated result of an operation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A single resource (create, update, patch, fetch).
    Entity(Entity),
    /// A sequence of resources (fetch_all, replace_list).
    Listing(Listing),
    /// The delete succeeded.
    Deleted,
    /// The addressed resource does not exist.
    NotFound,
    /// A listener reported a domain error.
    Problem(ApiProblem),
}

impl Outcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }
}

/// Entry point for the eight resource operations.
#[derive(Debug, Clone)]
pub struct Resource {
    registry: Arc<ListenerRegistry>,
    route_params: Params,
    query_params: Params,
}

impl Resource {
    pub fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self {
            registry,
            route_params: Params::new(),
            query_params: Params::new(),
        }
    }

    /// Route parameters passed to every operation.
    pub fn with_route_params(mut self, params: Params) -> Self {
        self.route_params = params;
        self
    }

    /// Query parameters passed to every operation.
    pub fn with_query_params(mut self, params: Params) -> Self {
        self.query_params = params;
        self
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    pub fn create(&self, data: Value) -> Result<Outcome, ResourceError> {
        require_object(Operation::Create, &data)?;
        self.dispatch(Operation::Create, None, Some(data), None)
    }

    pub fn update(&self, id: &str, data: Value) -> Result<Outcome, ResourceError> {
        require_identifier(Operation::Update, id)?;
        require_object(Operation::Update, &data)?;
        self.dispatch(Operation::Update, Some(id), Some(data), None)
    }

    pub fn patch(&self, id: &str, data: Value) -> Result<Outcome, ResourceError> {
        require_identifier(Operation::Patch, id)?;
        require_object(Operation::Patch, &data)?;
        self.dispatch(Operation::Patch, Some(id), Some(data), None)
    }

    pub fn replace_list(&self, data: Value) -> Result<Outcome, ResourceError> {
        require_object_list(Operation::ReplaceList, &data)?;
        self.dispatch(Operation::ReplaceList, None, Some(data), None)
    }

    pub fn delete(&self, id: &str) -> Result<Outcome, ResourceError> {
        require_identifier(Operation::Delete, id)?;
        self.dispatch(Operation::Delete, Some(id), None, None)
    }

    pub fn delete_list(&self, data: Option<Value>) -> Result<Outcome, ResourceError> {
        if let Some(data) = &data {
            require_object_list(Operation::DeleteList, data)?;
        }
        self.dispatch(Operation::DeleteList, None, data, None)
    }

    pub fn fetch(&self, id: &str) -> Result<Outcome, ResourceError> {
        require_identifier(Operation::Fetch, id)?;
        self.dispatch(Operation::Fetch, Some(id), None, None)
    }

    /// Fetch a collection; `params` are merged over the configured query parameters.
    pub fn fetch_all(&self, params: Params) -> Result<Outcome, ResourceError> {
        self.dispatch(Operation::FetchAll, None, None, Some(params))
    }

    fn dispatch(
        &self,
        operation: Operation,
        identifier: Option<&str>,
        data: Option<Value>,
        query: Option<Params>,
    ) -> Result<Outcome, ResourceError> {
        let mut query_params = self.query_params.clone();
        query_params.extend(query.unwrap_or_default());

        let mut event = OperationEvent::new(
            operation,
            OperationParams {
                identifier: identifier.map(str::to_string),
                data,
                query_params,
                route_params: self.route_params.clone(),
            },
        );

        for hook in self.registry.pre_hooks(operation) {
            if let Err(problem) = hook.before(&mut event) {
                debug!(
                    event_id = %event.id(),
                    event = %event.name(),
                    status = problem.status(),
                    "Operation halted by pre hook"
                );
                return Ok(Outcome::Problem(problem));
            }
        }

        let mut result = None;
        for listener in self.registry.listeners(operation) {
            if let ListenerResult::Handled(payload) = listener.handle(&event) {
                result = Some(payload);
            }
        }

        let payload = result.ok_or(ResourceError::NoListenerResult(operation))?;
        classify(operation, payload.clone())?;

        event.set_phase(Phase::Post);
        event.set_result(payload);
        for hook in self.registry.post_hooks(operation) {
            hook.after(&mut event);
        }

        let payload = event
            .take_result()
            .ok_or(ResourceError::NoListenerResult(operation))?;
        let outcome = classify(operation, payload)?;
        debug!(
            event_id = %event.id(),
            event = %event.name(),
            outcome = outcome_name(&outcome),
            "Resource operation completed"
        );
        Ok(outcome)
    }
}

fn require_identifier(operation: Operation, id: &str) -> Result<(), ResourceError> {
    if id.is_empty() {
        return Err(ResourceError::MissingIdentifier(operation));
    }
    Ok(())
}

fn require_object(operation: Operation, data: &Value) -> Result<(), ResourceError> {
    if !data.is_object() {
        return Err(ResourceError::InvalidInputShape {
            operation,
            expected: "an object",
        });
    }
    Ok(())
}

fn require_object_list(operation: Operation, data: &Value) -> Result<(), ResourceError> {
    match data {
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(()),
        _ => Err(ResourceError::InvalidInputShape {
            operation,
            expected: "an array of objects",
        }),
    }
}

fn classify(operation: Operation, payload: Payload) -> Result<Outcome, ResourceError> {
    if let Payload::Problem(problem) = payload {
        return Ok(Outcome::Problem(problem));
    }

    let unexpected = |expected: &'static str, payload: &Payload| {
        ResourceError::UnexpectedResultShape {
            operation,
            expected,
            actual: payload.kind(),
        }
    };

    match operation {
        Operation::Create | Operation::Update | Operation::Patch | Operation::Fetch => {
            match payload {
                Payload::Value(value) if operation == Operation::Fetch && is_empty(&value) => {
                    Ok(Outcome::NotFound)
                }
                Payload::Value(value @ Value::Object(_)) => Ok(Outcome::Entity(Entity::Value(value))),
                Payload::Resource(resource) => Ok(Outcome::Entity(Entity::Resource(resource))),
                Payload::Value(Value::Bool(false) | Value::Null) if operation != Operation::Create => {
                    Ok(Outcome::NotFound)
                }
                other => Err(unexpected("an object or resource", &other)),
            }
        }
        Operation::FetchAll | Operation::ReplaceList => match payload {
            Payload::Value(Value::Array(items)) => Ok(Outcome::Listing(Listing::Values(items))),
            Payload::Paginated(paginator) => Ok(Outcome::Listing(Listing::Paginated(paginator))),
            Payload::Collection(collection) => Ok(Outcome::Listing(Listing::Collection(collection))),
            other => Err(unexpected("an array, paginator or collection", &other)),
        },
        Operation::Delete | Operation::DeleteList => match payload {
            Payload::Value(Value::Bool(true)) => Ok(Outcome::Deleted),
            Payload::Value(Value::Bool(false)) => Ok(Outcome::NotFound),
            other => Err(unexpected("a boolean", &other)),
        },
    }
}

/// Empty objects and arrays from `fetch` mean nothing was found.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Entity(_) => "entity",
        Outcome::Listing(_) => "listing",
        Outcome::Deleted => "deleted",
        Outcome::NotFound => "not_found",
        Outcome::Problem(_) => "problem",
    }
}
