//! Event-driven REST resources for Armature
//!
//! Resources are backed by listeners registered per operation. A
//! [`RestController`] maps HTTP requests onto those operations and renders
//! the results as HAL documents, with failures reported as Problem Details
//! (RFC 7807).
//!
//! ## Features
//!
//! - **Resource engine** - Eight operations with input and result validation
//! - **Listener registry** - Prioritised listeners plus pre and post hooks
//! - **Dispatch** - Method checks, content negotiation and status mapping
//! - **Problems** - `application/problem+json` responses for every failure
//! - **Configuration** - TOML/JSON files and environment overrides
//! - **Logging** - `tracing` subscriber setup with JSON or text output
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_hal::{HalRenderer, LinkResolver, RouteTable};
//! use armature_rest::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let routes = RouteTable::new().route("users", "/users[/{id}]").unwrap();
//! let renderer = Arc::new(HalRenderer::new(LinkResolver::new(routes)));
//!
//! let registry = Arc::new(ListenerRegistry::new());
//! registry.listen(Operation::Fetch, 0, |event: &OperationEvent| {
//!     ListenerResult::handled(json!({"id": event.identifier(), "name": "Ada"}))
//! });
//!
//! let controller =
//!     RestController::new(RestControllerConfig::new("users"), registry, renderer).unwrap();
//! let response = controller.dispatch(&RestRequest::get("/users/ada"));
//!
//! assert_eq!(response.status, http::StatusCode::OK);
//! assert_eq!(response.json().unwrap()["_links"]["self"]["href"], "/users/ada");
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod listener;
pub mod logging;
pub mod message;
pub mod negotiation;
pub mod problem;
pub mod resource;

pub use config::{FileFormat, RestControllerConfig, Validate};
pub use controller::{RenderHook, RenderHookContext, RestController};
pub use error::{ConfigError, LoggingError, ResourceError, RestError, Result};
pub use event::{Operation, OperationEvent, OperationParams, Payload, Phase};
pub use listener::{
    Listener, ListenerRegistry, ListenerResult, PostHook, PreHook, ResourceListener,
};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, Rotation};
pub use message::{RestRequest, RestResponse};
pub use negotiation::{AcceptCriteria, AcceptCriterion, Representation};
pub use problem::{ApiProblem, PROBLEM_CONTENT_TYPE, ProblemMapper};
pub use resource::{Outcome, Resource};
