//! Listener registry.
//!
//! Listeners fulfil resource operations. Several listeners may be registered
//! for one operation; they run in descending priority (ties in registration
//! order) and the last one that answers [`ListenerResult::Handled`] provides
//! the result.
//!
//! ```
//! use armature_rest::{ListenerRegistry, ListenerResult, Operation, OperationEvent};
//! use serde_json::json;
//!
//! let registry = ListenerRegistry::new();
//! registry.listen(Operation::Fetch, 0, |event: &OperationEvent| {
//!     match event.identifier() {
//!         Some("mwop") => ListenerResult::handled(json!({"id": "mwop"})),
//!         _ => ListenerResult::Declined,
//!     }
//! });
//!
//! assert_eq!(registry.listener_count(Operation::Fetch), 1);
//! ```

use crate::event::{Operation, OperationEvent, Payload};
use crate::problem::ApiProblem;
use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A listener's answer.
#[derive(Debug, Clone)]
pub enum ListenerResult {
    Handled(Payload),
    Declined,
}

impl ListenerResult {
    pub fn handled(payload: impl Into<Payload>) -> Self {
        ListenerResult::Handled(payload.into())
    }

    pub fn problem(status: u16, detail: impl Into<String>) -> Self {
        ListenerResult::Handled(Payload::Problem(ApiProblem::new(status, detail)))
    }
}

/// Fulfils an operation.
pub trait Listener: Send + Sync {
    fn handle(&self, event: &OperationEvent) -> ListenerResult;
}

impl<F> Listener for F
where
    F: Fn(&OperationEvent) -> ListenerResult + Send + Sync,
{
    fn handle(&self, event: &OperationEvent) -> ListenerResult {
        self(event)
    }
}

/// Runs before the listeners; may adjust parameters or halt with a problem.
pub trait PreHook: Send + Sync {
    fn before(&self, event: &mut OperationEvent) -> Result<(), ApiProblem>;
}

impl<F> PreHook for F
where
    F: Fn(&mut OperationEvent) -> Result<(), ApiProblem> + Send + Sync,
{
    fn before(&self, event: &mut OperationEvent) -> Result<(), ApiProblem> {
        self(event)
    }
}

/// Runs after a result was produced; may replace it.
pub trait PostHook: Send + Sync {
    fn after(&self, event: &mut OperationEvent);
}

impl<F> PostHook for F
where
    F: Fn(&mut OperationEvent) + Send + Sync,
{
    fn after(&self, event: &mut OperationEvent) {
        self(event)
    }
}

fn not_defined(method: &str, target: &str) -> ListenerResult {
    ListenerResult::problem(
        405,
        format!("The {} method has not been defined{}", method, target),
    )
}

/// One method per operation.
///
/// Every method answers 405 unless overridden, so an implementation only
/// provides the operations it supports.
pub trait ResourceListener: Send + Sync {
    fn create(&self, _data: &Value, _event: &OperationEvent) -> ListenerResult {
        not_defined("POST", "")
    }

    fn update(&self, _id: &str, _data: &Value, _event: &OperationEvent) -> ListenerResult {
        not_defined("PUT", " for individual resources")
    }

    fn patch(&self, _id: &str, _data: &Value, _event: &OperationEvent) -> ListenerResult {
        not_defined("PATCH", " for individual resources")
    }

    fn replace_list(&self, _data: &Value, _event: &OperationEvent) -> ListenerResult {
        not_defined("PUT", " for collections")
    }

    fn delete(&self, _id: &str, _event: &OperationEvent) -> ListenerResult {
        not_defined("DELETE", " for individual resources")
    }

    fn delete_list(&self, _data: Option<&Value>, _event: &OperationEvent) -> ListenerResult {
        not_defined("DELETE", " for collections")
    }

    fn fetch(&self, _id: &str, _event: &OperationEvent) -> ListenerResult {
        not_defined("GET", " for individual resources")
    }

    fn fetch_all(&self, _event: &OperationEvent) -> ListenerResult {
        not_defined("GET", " for collections")
    }
}

/// Routes events to the matching [`ResourceListener`] method.
struct ResourceListenerAdapter<R: ?Sized> {
    inner: Arc<R>,
}

impl<R: ResourceListener + ?Sized> Listener for ResourceListenerAdapter<R> {
    fn handle(&self, event: &OperationEvent) -> ListenerResult {
        let id = event.identifier().unwrap_or_default();
        let data = event.data().unwrap_or(&Value::Null);
        match event.operation() {
            Operation::Create => self.inner.create(data, event),
            Operation::Update => self.inner.update(id, data, event),
            Operation::Patch => self.inner.patch(id, data, event),
            Operation::ReplaceList => self.inner.replace_list(data, event),
            Operation::Delete => self.inner.delete(id, event),
            Operation::DeleteList => self.inner.delete_list(event.data(), event),
            Operation::Fetch => self.inner.fetch(id, event),
            Operation::FetchAll => self.inner.fetch_all(event),
        }
    }
}

struct Registration<T: ?Sized> {
    priority: i32,
    sequence: u64,
    handler: Arc<T>,
}

impl<T: ?Sized> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            sequence: self.sequence,
            handler: Arc::clone(&self.handler),
        }
    }
}

type Slots<T> = DashMap<Operation, Vec<Registration<T>>>;

/// Listeners and hooks keyed by operation.
pub struct ListenerRegistry {
    listeners: Slots<dyn Listener>,
    pre_hooks: Slots<dyn PreHook>,
    post_hooks: Slots<dyn PostHook>,
    sequence: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            pre_hooks: DashMap::new(),
            post_hooks: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register a listener for one operation.
    ///
    /// Higher priorities run first; equal priorities run in registration order.
    pub fn listen<L: Listener + 'static>(&self, operation: Operation, priority: i32, listener: L) {
        self.insert(&self.listeners, operation, priority, Arc::new(listener));
        debug!(operation = %operation, priority, "Registered resource listener");
    }

    /// Register a [`ResourceListener`] for all eight operations.
    pub fn attach<R: ResourceListener + 'static>(&self, listener: Arc<R>, priority: i32) {
        for operation in Operation::ALL {
            let adapter = ResourceListenerAdapter {
                inner: Arc::clone(&listener),
            };
            self.insert(&self.listeners, operation, priority, Arc::new(adapter));
        }
        debug!(priority, "Attached resource listener to all operations");
    }

    /// Register a hook run before the listeners of `operation`.
    pub fn on_pre<H: PreHook + 'static>(&self, operation: Operation, priority: i32, hook: H) {
        self.insert(&self.pre_hooks, operation, priority, Arc::new(hook));
    }

    /// Register a hook run after a result was produced for `operation`.
    pub fn on_post<H: PostHook + 'static>(&self, operation: Operation, priority: i32, hook: H) {
        self.insert(&self.post_hooks, operation, priority, Arc::new(hook));
    }

    /// Listeners for `operation`, in invocation order.
    pub fn listeners(&self, operation: Operation) -> Vec<Arc<dyn Listener>> {
        Self::ordered(&self.listeners, operation)
    }

    pub fn pre_hooks(&self, operation: Operation) -> Vec<Arc<dyn PreHook>> {
        Self::ordered(&self.pre_hooks, operation)
    }

    pub fn post_hooks(&self, operation: Operation) -> Vec<Arc<dyn PostHook>> {
        Self::ordered(&self.post_hooks, operation)
    }

    pub fn listener_count(&self, operation: Operation) -> usize {
        self.listeners.get(&operation).map(|l| l.len()).unwrap_or(0)
    }

    /// Remove every listener and hook.
    pub fn clear(&self) {
        self.listeners.clear();
        self.pre_hooks.clear();
        self.post_hooks.clear();
    }

    fn insert<T: ?Sized>(
        &self,
        slots: &Slots<T>,
        operation: Operation,
        priority: i32,
        handler: Arc<T>,
    ) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        slots.entry(operation).or_default().push(Registration {
            priority,
            sequence,
            handler,
        });
    }

    // Copies out of the map so no shard lock is held while handlers run.
    fn ordered<T: ?Sized>(slots: &Slots<T>, operation: Operation) -> Vec<Arc<T>> {
        let mut registrations = match slots.get(&operation) {
            Some(entries) => entries.clone(),
            None => return Vec::new(),
        };
        registrations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        registrations.into_iter().map(|r| r.handler).collect()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(Operation, usize)> = Operation::ALL
            .iter()
            .map(|op| (*op, self.listener_count(*op)))
            .filter(|(_, count)| *count > 0)
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OperationParams;
    use serde_json::json;

    fn tagged(tag: &'static str) -> impl Fn(&OperationEvent) -> ListenerResult + Send + Sync {
        move |_event: &OperationEvent| ListenerResult::handled(json!({ "tag": tag }))
    }

    fn tags(registry: &ListenerRegistry, operation: Operation) -> Vec<Value> {
        let event = OperationEvent::new(operation, OperationParams::default());
        registry
            .listeners(operation)
            .iter()
            .filter_map(|l| match l.handle(&event) {
                ListenerResult::Handled(Payload::Value(value)) => Some(value["tag"].clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_priority_then_registration_order() {
        let registry = ListenerRegistry::new();
        registry.listen(Operation::Fetch, 0, tagged("a"));
        registry.listen(Operation::Fetch, 10, tagged("b"));
        registry.listen(Operation::Fetch, 0, tagged("c"));
        registry.listen(Operation::Fetch, -5, tagged("d"));

        assert_eq!(
            tags(&registry, Operation::Fetch),
            vec![json!("b"), json!("a"), json!("c"), json!("d")]
        );
        assert_eq!(registry.listener_count(Operation::Fetch), 4);
        assert_eq!(registry.listener_count(Operation::Create), 0);
    }

    struct ReadOnly;

    impl ResourceListener for ReadOnly {
        fn fetch(&self, id: &str, _event: &OperationEvent) -> ListenerResult {
            ListenerResult::handled(json!({ "id": id }))
        }
    }

    #[test]
    fn test_attach_registers_every_operation() {
        let registry = ListenerRegistry::new();
        registry.attach(Arc::new(ReadOnly), 0);

        for operation in Operation::ALL {
            assert_eq!(registry.listener_count(operation), 1);
        }

        let params = OperationParams {
            identifier: Some("mwop".to_string()),
            ..OperationParams::default()
        };
        let event = OperationEvent::new(Operation::Fetch, params);
        match registry.listeners(Operation::Fetch)[0].handle(&event) {
            ListenerResult::Handled(Payload::Value(value)) => assert_eq!(value, json!({"id": "mwop"})),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unimplemented_methods_answer_405() {
        let registry = ListenerRegistry::new();
        registry.attach(Arc::new(ReadOnly), 0);

        let event = OperationEvent::new(Operation::FetchAll, OperationParams::default());
        match registry.listeners(Operation::FetchAll)[0].handle(&event) {
            ListenerResult::Handled(Payload::Problem(problem)) => {
                assert_eq!(problem.status(), 405);
                assert_eq!(
                    problem.detail(),
                    Some("The GET method has not been defined for collections")
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_clear() {
        let registry = ListenerRegistry::new();
        registry.listen(Operation::Create, 0, tagged("a"));
        registry.on_pre(
            Operation::Create,
            0,
            |_event: &mut OperationEvent| -> Result<(), ApiProblem> { Ok(()) },
        );
        registry.clear();
        assert_eq!(registry.listener_count(Operation::Create), 0);
        assert!(registry.pre_hooks(Operation::Create).is_empty());
    }
}
