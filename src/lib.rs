//! Grammar School: a micro-framework for chained-call DSLs.
//!
//! Source such as `track(name="Drums").add_clip(start=0, length=8)` is parsed
//! into a [`CallChain`](dsl::CallChain) and each call is dispatched to a
//! handler registered by a user [`Dsl`](interpreter::Dsl) type. Handlers either
//! perform effects directly, or return [`Action`](interpreter::Action)s that a
//! [`Runtime`](runtime::Runtime) executes later.

pub mod cfg;
pub mod config;
pub mod demo;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod functional;
pub mod interpreter;
pub mod logging;
pub mod runtime;

pub use engine::{CancelToken, Engine, EngineBuilder, EventStream};
pub use error::{Error, HandlerError, Result, RuntimeError};
pub use interpreter::{Action, Args, Context, Direct, Dsl, Outcome, Registry, TwoLayer};
