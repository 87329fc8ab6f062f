//! Resource operation events.

use crate::problem::ApiProblem;
use armature_hal::{HalCollection, HalResource, Paginator, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The eight resource operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Patch,
    ReplaceList,
    Delete,
    DeleteList,
    Fetch,
    FetchAll,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Create,
        Operation::Update,
        Operation::Patch,
        Operation::ReplaceList,
        Operation::Delete,
        Operation::DeleteList,
        Operation::Fetch,
        Operation::FetchAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Patch => "patch",
            Operation::ReplaceList => "replace_list",
            Operation::Delete => "delete",
            Operation::DeleteList => "delete_list",
            Operation::Fetch => "fetch",
            Operation::FetchAll => "fetch_all",
        }
    }

    /// Operations addressing a single resource by identifier.
    pub fn requires_identifier(&self) -> bool {
        matches!(
            self,
            Operation::Update | Operation::Patch | Operation::Delete | Operation::Fetch
        )
    }

    /// Operations answering with a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Operation::ReplaceList | Operation::FetchAll)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Post,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

/// Operation arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationParams {
    pub identifier: Option<String>,
    pub data: Option<Value>,
    pub query_params: Params,
    pub route_params: Params,
}

/// What a listener hands back.
#[derive(Clone)]
pub enum Payload {
    /// Plain JSON: an object, an array or a boolean depending on the operation.
    Value(Value),
    /// A resource built by the listener.
    Resource(HalResource),
    /// A collection built by the listener.
    Collection(HalCollection),
    /// A paged source of items.
    Paginated(Arc<dyn Paginator>),
    /// A domain error to surface as-is.
    Problem(ApiProblem),
}

impl Payload {
    /// Short description used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Payload::Value(value) => match value {
                Value::Null => "null".to_string(),
                Value::Bool(b) => format!("boolean {}", b),
                Value::Number(_) => "a number".to_string(),
                Value::String(_) => "a string".to_string(),
                Value::Array(_) => "an array".to_string(),
                Value::Object(_) => "an object".to_string(),
            },
            Payload::Resource(_) => "a resource".to_string(),
            Payload::Collection(_) => "a collection".to_string(),
            Payload::Paginated(_) => "a paginator".to_string(),
            Payload::Problem(problem) => format!("a {} problem", problem.status()),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<ApiProblem> for Payload {
    fn from(problem: ApiProblem) -> Self {
        Payload::Problem(problem)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Payload::Resource(resource) => f.debug_tuple("Resource").field(resource).finish(),
            Payload::Collection(collection) => {
                f.debug_tuple("Collection").field(collection).finish()
            }
            Payload::Paginated(paginator) => f
                .debug_tuple("Paginated")
                .field(&paginator.total_item_count())
                .finish(),
            Payload::Problem(problem) => f.debug_tuple("Problem").field(problem).finish(),
        }
    }
}

/// An operation travelling through the listener registry.
#[derive(Debug, Clone)]
pub struct OperationEvent {
    id: Uuid,
    operation: Operation,
    phase: Phase,
    params: OperationParams,
    result: Option<Payload>,
}

impl OperationEvent {
    pub fn new(operation: Operation, params: OperationParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            phase: Phase::Pre,
            params,
            result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// `{operation}.{phase}`, e.g. `create.pre`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.operation, self.phase.as_str())
    }

    pub fn params(&self) -> &OperationParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut OperationParams {
        &mut self.params
    }

    pub fn identifier(&self) -> Option<&str> {
        self.params.identifier.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.params.data.as_ref()
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.params.query_params.get(name).map(String::as_str)
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.params.route_params.get(name).map(String::as_str)
    }

    /// Result of the operation; only set during the post phase.
    pub fn result(&self) -> Option<&Payload> {
        self.result.as_ref()
    }

    /// Replace the result (post phase).
    pub fn set_result(&mut self, result: Payload) {
        self.result = Some(result);
    }

    pub(crate) fn take_result(&mut self) -> Option<Payload> {
        self.result.take()
    }
}
