//! Handler registry and calling conventions.
//!
//! A DSL type implements [`Dsl`] and registers its handlers by name once,
//! when an engine is built. The registry is read-only afterwards.
//!
//! Two calling conventions exist and an engine commits to one of them through
//! `Dsl::Convention`:
//!
//! - [`Direct`]: `fn(&self, &Args) -> HandlerResult`. The handler performs its
//!   effects immediately.
//! - [`TwoLayer`]: `fn(&self, &Args, &Context) -> HandlerResult<Outcome>`. The
//!   handler is pure; it returns [`Action`]s for a runtime and optionally a
//!   replacement [`Context`].

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::action::Action;
use super::args::Args;
use super::context::Context;
use crate::dsl::Call;
use crate::error::HandlerError;

pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Strategy for storing and invoking handlers of one calling convention.
pub trait Convention<D>: Sized + 'static {
    /// Stored, type-erased handler.
    type Handler: Send + Sync;
    /// State threaded through a single chain evaluation. A fresh default value
    /// is created per evaluation.
    type State: Default;
    /// What one successful call yields.
    type Output: Send + 'static;
    /// What a stream publishes for one call.
    type Event: Send + 'static;

    fn invoke(
        handler: &Self::Handler,
        dsl: &D,
        args: &Args,
        state: &mut Self::State,
    ) -> HandlerResult<Self::Output>;

    fn events(call: &Call, output: Self::Output) -> Vec<Self::Event>;
}

/// Handlers perform effects directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

/// Handlers return actions; a runtime performs the effects later.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoLayer;

pub type DirectHandler<D> = Box<dyn Fn(&D, &Args) -> HandlerResult + Send + Sync>;
pub type VerbHandler<D> = Box<dyn Fn(&D, &Args, &Context) -> HandlerResult<Outcome> + Send + Sync>;

/// Published by a direct-convention stream each time a call completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCompleted {
    pub call: String,
}

impl<D: 'static> Convention<D> for Direct {
    type Handler = DirectHandler<D>;
    type State = ();
    type Output = ();
    type Event = CallCompleted;

    fn invoke(handler: &Self::Handler, dsl: &D, args: &Args, _state: &mut ()) -> HandlerResult {
        handler(dsl, args)
    }

    fn events(call: &Call, _output: ()) -> Vec<CallCompleted> {
        vec![CallCompleted {
            call: call.name.clone(),
        }]
    }
}

impl<D: 'static> Convention<D> for TwoLayer {
    type Handler = VerbHandler<D>;
    type State = Context;
    type Output = Vec<Action>;
    type Event = Action;

    fn invoke(
        handler: &Self::Handler,
        dsl: &D,
        args: &Args,
        ctx: &mut Context,
    ) -> HandlerResult<Vec<Action>> {
        let outcome = handler(dsl, args, ctx)?;
        if let Some(next) = outcome.context {
            *ctx = next;
        }
        Ok(outcome.actions)
    }

    fn events(_call: &Call, actions: Vec<Action>) -> Vec<Action> {
        actions
    }
}

/// Result of a verb handler: actions in order, plus an optional replacement
/// context. `context: None` keeps the current context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub actions: Vec<Action>,
    pub context: Option<Context>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn action(action: Action) -> Self {
        Self {
            actions: vec![action],
            context: None,
        }
    }

    pub fn actions(actions: Vec<Action>) -> Self {
        Self {
            actions,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<Action> for Outcome {
    fn from(action: Action) -> Self {
        Outcome::action(action)
    }
}

impl From<Vec<Action>> for Outcome {
    fn from(actions: Vec<Action>) -> Self {
        Outcome::actions(actions)
    }
}

/// A user DSL: the instance whose handlers calls dispatch to.
///
/// ```ignore
/// impl Dsl for MusicDsl {
///     type Convention = TwoLayer;
///
///     fn register(registry: &mut Registry<Self, TwoLayer>) {
///         registry.verb("track", Self::track).verb("add_clip", Self::add_clip);
///     }
/// }
/// ```
pub trait Dsl: Send + Sync + Sized + 'static {
    type Convention: Convention<Self>;

    fn register(registry: &mut Registry<Self, Self::Convention>);
}

pub type HandlersOf<D> = Registry<D, <D as Dsl>::Convention>;
pub type OutputOf<D> = <<D as Dsl>::Convention as Convention<D>>::Output;
pub type EventOf<D> = <<D as Dsl>::Convention as Convention<D>>::Event;

/// Case-sensitive name → handler map.
pub struct Registry<D, C: Convention<D>> {
    handlers: HashMap<String, C::Handler>,
    _dsl: PhantomData<fn(&D)>,
}

impl<D, C: Convention<D>> Registry<D, C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            _dsl: PhantomData,
        }
    }

    /// Register a handler. A later registration under the same name replaces
    /// the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, handler: C::Handler) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(handler = %name, "handler registered twice, keeping the last one");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&C::Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<D: Dsl> Registry<D, D::Convention> {
    /// Collect the handlers a DSL type declares.
    pub fn build() -> Self {
        let mut registry = Self::new();
        D::register(&mut registry);
        debug!(
            dsl = std::any::type_name::<D>(),
            handlers = registry.len(),
            "handler registry built"
        );
        registry
    }
}

impl<D, C: Convention<D>> Default for Registry<D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, C: Convention<D>> fmt::Debug for Registry<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("handlers", &self.names())
            .finish()
    }
}

impl<D: 'static> Registry<D, Direct> {
    /// Register a direct-convention handler.
    pub fn method<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&D, &Args) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(name, Box::new(handler))
    }
}

impl<D: 'static> Registry<D, TwoLayer> {
    /// Register a two-layer verb handler.
    pub fn verb<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&D, &Args, &Context) -> HandlerResult<Outcome> + Send + Sync + 'static,
    {
        self.insert(name, Box::new(handler))
    }
}
