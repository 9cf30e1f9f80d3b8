//! Declarative handler discovery over a type's method manifest.
//!
//! A service or saga type declares, once and alongside its definition,
//! which of its methods handle which named events and in what capacity
//! (event handler vs. saga handler). [`explore_handlers`] then performs a
//! single discovery pass over that manifest for a concrete instance,
//! producing bound [`HandlerDefinition`]s ready to be registered on an
//! [`EventBus`](crate::EventBus).
//!
//! The manifest attaches exactly two pieces of metadata to each method
//! reference -- an event name and a [`HandlerKind`] -- and both are read
//! back from the manifest alone, never from the instance. Composed types
//! pull in an embedded group's declarations with
//! [`include`](HandlerManifest::include); a method name declared twice is
//! kept from its first declaration, so a shadowed embedded handler still
//! appears exactly once.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::BoxError;

/// The capacity a handler method was tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Reacts to an event to update local or derived state.
    Event,
    /// Reacts to an event by driving a cross-aggregate workflow.
    Saga,
}

impl HandlerKind {
    /// Stable string tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Event => "event-handler",
            HandlerKind::Saga => "saga-handler",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler method reference: borrows the target instance and the event
/// for the duration of the returned future.
pub type HandlerMethod<T, E> = for<'a> fn(&'a T, &'a E) -> BoxFuture<'a, Result<(), BoxError>>;

/// Type-erased invocation of one declared method against a target.
///
/// Two shapes exist: a direct method reference, and a method reached
/// through a projection into an embedded handler group.
trait MethodInvoke<T: ?Sized, E>: Send + Sync {
    fn invoke<'a>(&'a self, target: &'a T, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>>;
}

struct DirectMethod<T, E> {
    method: HandlerMethod<T, E>,
}

impl<T: Send + Sync, E: Send + Sync> MethodInvoke<T, E> for DirectMethod<T, E> {
    fn invoke<'a>(&'a self, target: &'a T, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        (self.method)(target, event)
    }
}

struct ProjectedMethod<T, B, E> {
    project: fn(&T) -> &B,
    inner: Arc<dyn MethodInvoke<B, E>>,
}

impl<T, B, E> MethodInvoke<T, E> for ProjectedMethod<T, B, E>
where
    T: Send + Sync,
    B: Send + Sync,
    E: Send + Sync,
{
    fn invoke<'a>(&'a self, target: &'a T, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        self.inner.invoke((self.project)(target), event)
    }
}

/// One declared method: name, the two metadata tags, and the invoker.
struct MethodSpec<T, E> {
    method_name: &'static str,
    event_name: String,
    kind: HandlerKind,
    invoke: Arc<dyn MethodInvoke<T, E>>,
}

/// The ordered set of handler methods a type declares.
///
/// Built inside [`HandlerGroup::declare`]; each entry ties a method
/// reference to an event name and a [`HandlerKind`]. Declaration order is
/// preserved and becomes discovery order (own declarations before
/// included ones), which in turn drives downstream registration and
/// dispatch order.
pub struct HandlerManifest<T, E> {
    specs: Vec<MethodSpec<T, E>>,
}

impl<T, E> HandlerManifest<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Declare `method` as an event handler for `event_name`.
    ///
    /// A `method_name` already present in the manifest is ignored
    /// (first declaration wins).
    pub fn event_handler(
        &mut self,
        method_name: &'static str,
        event_name: impl Into<String>,
        method: HandlerMethod<T, E>,
    ) -> &mut Self {
        self.declare_method(
            method_name,
            event_name.into(),
            HandlerKind::Event,
            Arc::new(DirectMethod { method }),
        )
    }

    /// Declare `method` as a saga handler for `event_name`.
    ///
    /// A `method_name` already present in the manifest is ignored
    /// (first declaration wins).
    pub fn saga_handler(
        &mut self,
        method_name: &'static str,
        event_name: impl Into<String>,
        method: HandlerMethod<T, E>,
    ) -> &mut Self {
        self.declare_method(
            method_name,
            event_name.into(),
            HandlerKind::Saga,
            Arc::new(DirectMethod { method }),
        )
    }

    /// Pull in the declarations of an embedded handler group.
    ///
    /// `project` locates the embedded group within the outer type; every
    /// method the group declares is re-declared here, invoked through the
    /// projection. Method names already declared on the outer type shadow
    /// the embedded ones, which are then skipped.
    pub fn include<B>(&mut self, project: fn(&T) -> &B) -> &mut Self
    where
        B: HandlerGroup<Event = E>,
    {
        let mut inner = HandlerManifest::<B, E>::new();
        B::declare(&mut inner);
        for spec in inner.specs {
            self.declare_method(
                spec.method_name,
                spec.event_name,
                spec.kind,
                Arc::new(ProjectedMethod {
                    project,
                    inner: spec.invoke,
                }),
            );
        }
        self
    }

    fn declare_method(
        &mut self,
        method_name: &'static str,
        event_name: String,
        kind: HandlerKind,
        invoke: Arc<dyn MethodInvoke<T, E>>,
    ) -> &mut Self {
        // First declaration wins: a shadowed method appears exactly once.
        if self.specs.iter().any(|s| s.method_name == method_name) {
            return self;
        }
        self.specs.push(MethodSpec {
            method_name,
            event_name,
            kind,
            invoke,
        });
        self
    }
}

/// A type that declares which of its methods handle which named events.
///
/// `declare` operates over the type's method table, not over an instance:
/// the same manifest serves every instance, and
/// [`explore_handlers`] binds it to one.
///
/// # Examples
///
/// ```
/// use eventroot::{BoxError, DomainEvent, HandlerGroup, HandlerManifest};
/// use futures::future::BoxFuture;
///
/// struct Greeted;
/// impl DomainEvent for Greeted {
///     fn event_name(&self) -> &str {
///         "Greeted"
///     }
/// }
///
/// #[derive(Default)]
/// struct Greeter;
///
/// impl Greeter {
///     fn on_greeted<'a>(&'a self, _event: &'a Greeted) -> BoxFuture<'a, Result<(), BoxError>> {
///         Box::pin(async move { Ok(()) })
///     }
/// }
///
/// impl HandlerGroup for Greeter {
///     type Event = Greeted;
///
///     fn declare(manifest: &mut HandlerManifest<Self, Self::Event>) {
///         manifest.event_handler("on_greeted", "Greeted", Self::on_greeted);
///     }
/// }
/// ```
pub trait HandlerGroup: Send + Sync + Sized + 'static {
    /// The event type this group's handlers receive.
    type Event: Send + Sync + 'static;

    /// Declare this type's handler methods into the manifest.
    fn declare(manifest: &mut HandlerManifest<Self, Self::Event>);
}

/// A declared method bound to a shared instance.
struct BoundMethod<T, E> {
    instance: Arc<T>,
    invoke: Arc<dyn MethodInvoke<T, E>>,
}

trait ErasedHandler<E>: Send + Sync {
    fn call<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>>;
}

impl<T, E> ErasedHandler<E> for BoundMethod<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync,
{
    fn call<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        self.invoke.invoke(&self.instance, event)
    }
}

/// A discovered handler: event name, kind, and a callback bound to the
/// explored instance.
///
/// Cloning is cheap -- the instance and invoker are shared.
pub struct HandlerDefinition<E> {
    method_name: &'static str,
    event_name: String,
    kind: HandlerKind,
    callback: Arc<dyn ErasedHandler<E>>,
}

impl<E> HandlerDefinition<E> {
    /// Name of the declared method this definition was discovered from.
    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    /// Event-type name this handler was tagged with.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The capacity this handler was tagged with.
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Invoke the bound handler with an event.
    ///
    /// # Errors
    ///
    /// Returns the handler's own boxed error.
    pub async fn invoke(&self, event: &E) -> Result<(), BoxError> {
        self.callback.call(event).await
    }
}

impl<E> Clone for HandlerDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            method_name: self.method_name,
            event_name: self.event_name.clone(),
            kind: self.kind,
            callback: Arc::clone(&self.callback),
        }
    }
}

// Manual `Debug`: the bound callback is opaque.
impl<E> fmt::Debug for HandlerDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("method_name", &self.method_name)
            .field("event_name", &self.event_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Run one discovery pass over `T`'s declared manifest and bind every
/// entry to `instance`.
///
/// Returns definitions in declaration order: the type's own declarations
/// first, then each included group's, a shadowed method appearing exactly
/// once. Registration order downstream follows this order, so it is part
/// of the contract.
pub fn explore_handlers<T: HandlerGroup>(instance: &Arc<T>) -> Vec<HandlerDefinition<T::Event>> {
    let mut manifest = HandlerManifest::<T, T::Event>::new();
    T::declare(&mut manifest);

    let definitions: Vec<_> = manifest
        .specs
        .into_iter()
        .map(|spec| HandlerDefinition {
            method_name: spec.method_name,
            event_name: spec.event_name,
            kind: spec.kind,
            callback: Arc::new(BoundMethod {
                instance: Arc::clone(instance),
                invoke: spec.invoke,
            }),
        })
        .collect();

    tracing::debug!(count = definitions.len(), "handler manifest explored");
    definitions
}
