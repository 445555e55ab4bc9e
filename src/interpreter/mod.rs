//! Interpreter: walks a [`CallChain`] and dispatches each call to its handler.
//!
//! Per call: resolve the name, materialize the arguments, invoke the handler.
//! The first failure aborts the rest of the chain.

pub mod action;
pub mod args;
pub mod context;
pub mod registry;

pub use action::{Action, Payload};
pub use args::{positional_key, ArgError, Args, POSITIONAL_PREFIX};
pub use context::Context;
pub use registry::{
    CallCompleted, Convention, Direct, Dsl, EventOf, HandlerResult, HandlersOf, Outcome, OutputOf,
    Registry, TwoLayer,
};

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::dsl::{Call, CallChain};
use crate::engine::cancel::CancelToken;
use crate::error::{Error, Result};

/// Dispatch engine shared by every execution mode.
///
/// Cheap to clone: the DSL instance and the registry sit behind `Arc`s and
/// are never mutated after construction.
pub struct Interpreter<D: Dsl> {
    dsl: Arc<D>,
    registry: Arc<HandlersOf<D>>,
}

impl<D: Dsl> Clone for Interpreter<D> {
    fn clone(&self) -> Self {
        Self {
            dsl: Arc::clone(&self.dsl),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<D: Dsl> Interpreter<D> {
    /// Build the registry for `dsl`. Handler names are used exactly as
    /// registered; whether source text can reach them is up to the parser.
    pub fn new(dsl: D) -> Result<Self> {
        Self::from_arc(Arc::new(dsl))
    }

    pub fn from_arc(dsl: Arc<D>) -> Result<Self> {
        let registry = Registry::build();
        Ok(Self {
            dsl,
            registry: Arc::new(registry),
        })
    }

    pub fn dsl(&self) -> &D {
        &self.dsl
    }

    pub fn registry(&self) -> &HandlersOf<D> {
        &self.registry
    }

    /// Evaluate `chain`, handing each call's output to `sink` before the next
    /// call starts. `sink` may stop the walk early with `ControlFlow::Break`.
    ///
    /// Returns the number of calls that completed.
    pub fn walk<F>(&self, chain: &CallChain, cancel: &CancelToken, mut sink: F) -> Result<usize>
    where
        F: FnMut(&Call, OutputOf<D>) -> ControlFlow<()>,
    {
        let mut state = <D::Convention as Convention<D>>::State::default();

        for (completed, call) in chain.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(completed, next = %call.name, "chain cancelled");
                return Err(Error::Cancelled { completed });
            }

            let output = self.dispatch(call, &mut state)?;
            if sink(call, output).is_break() {
                return Ok(completed + 1);
            }
        }

        Ok(chain.len())
    }

    /// Evaluate `chain` and collect every call's output in order.
    pub fn interpret(&self, chain: &CallChain, cancel: &CancelToken) -> Result<Vec<OutputOf<D>>> {
        let mut outputs = Vec::with_capacity(chain.len());
        self.walk(chain, cancel, |_, output| {
            outputs.push(output);
            ControlFlow::Continue(())
        })?;
        Ok(outputs)
    }

    fn dispatch(
        &self,
        call: &Call,
        state: &mut <D::Convention as Convention<D>>::State,
    ) -> Result<OutputOf<D>> {
        let handler = self
            .registry
            .get(&call.name)
            .ok_or_else(|| Error::UnknownCall {
                name: call.name.clone(),
            })?;

        let args = Args::from_call_args(&call.args);
        trace!(call = %call.name, args = args.len(), "dispatching call");

        D::Convention::invoke(handler, &self.dsl, &args, state).map_err(|source| Error::Handler {
            call: call.name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Logger {
        log: Mutex<Vec<String>>,
    }

    impl Logger {
        fn record(&self, args: &Args, name: &str) -> HandlerResult {
            let mut log = self.log.lock().unwrap();
            match args.opt_str("tag")? {
                Some(tag) => log.push(format!("{name}:{tag}")),
                None => log.push(name.to_string()),
            }
            Ok(())
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Dsl for Logger {
        type Convention = Direct;

        fn register(registry: &mut Registry<Self, Direct>) {
            registry
                .method("a", |d, args| d.record(args, "a"))
                .method("b", |d, args| d.record(args, "b"))
                .method("c", |d, args| d.record(args, "c"))
                .method("boom", |_, _| Err(HandlerError::msg("exploded")));
        }
    }

    fn chain(names: &[&str]) -> CallChain {
        names.iter().map(|n| Call::new(*n)).collect()
    }

    #[test]
    fn calls_run_in_chain_order() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        interp
            .interpret(&chain(&["c", "a", "b", "a"]), &CancelToken::new())
            .unwrap();
        assert_eq!(interp.dsl().entries(), vec!["c", "a", "b", "a"]);
    }

    #[test]
    fn unknown_call_aborts_before_later_calls() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let err = interp
            .interpret(&chain(&["a", "nope", "b"]), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(&err, Error::UnknownCall { name } if name == "nope"));
        assert_eq!(interp.dsl().entries(), vec!["a"]);
    }

    #[test]
    fn handler_error_is_wrapped_with_call_name() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let err = interp
            .interpret(&chain(&["a", "boom", "b"]), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.call_name(), Some("boom"));
        assert_eq!(err.to_string(), "call boom failed: exploded");
        assert_eq!(interp.dsl().entries(), vec!["a"]);
    }

    #[test]
    fn argument_errors_surface_as_handler_errors() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let bad = CallChain::new(vec![Call::new("a").arg("tag", 3)]);
        let err = interp.interpret(&bad, &CancelToken::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Handler {
                source: HandlerError::Arg(ArgError::WrongKind { .. }),
                ..
            }
        ));
    }

    #[test]
    fn empty_chain_is_a_no_op() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let outputs = interp
            .interpret(&CallChain::default(), &CancelToken::new())
            .unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn cancelled_token_stops_before_next_call() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let err = interp
            .walk(&chain(&["a", "b", "c"]), &cancel, |call, _| {
                if call.name == "a" {
                    trigger.cancel();
                }
                ControlFlow::Continue(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { completed: 1 }));
        assert_eq!(interp.dsl().entries(), vec!["a"]);
    }

    #[test]
    fn sink_can_stop_the_walk() {
        let interp = Interpreter::new(Logger::default()).unwrap();
        let done = interp
            .walk(&chain(&["a", "b", "c"]), &CancelToken::new(), |_, _| {
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(done, 1);
        assert_eq!(interp.dsl().entries(), vec!["a"]);
    }

    struct Threader;

    impl Dsl for Threader {
        type Convention = TwoLayer;

        fn register(registry: &mut Registry<Self, TwoLayer>) {
            registry
                .verb("put", |_, args, ctx| {
                    let value = args.str("v")?;
                    Ok(Outcome::action(Action::new("put").with("v", value))
                        .with_context(ctx.with("k", value)))
                })
                .verb("get", |_, _, ctx| {
                    let seen = ctx.get_str("k").unwrap_or("<none>").to_string();
                    Ok(Action::new("got").with("v", seen).into())
                });
        }
    }

    #[test]
    fn context_flows_between_calls() {
        let interp = Interpreter::new(Threader).unwrap();
        let chain = CallChain::new(vec![Call::new("put").arg("v", "v"), Call::new("get")]);
        let outputs = interp.interpret(&chain, &CancelToken::new()).unwrap();
        assert_eq!(outputs[1][0].get_str("v"), Some("v"));
    }

    #[test]
    fn context_does_not_outlive_a_chain() {
        let interp = Interpreter::new(Threader).unwrap();
        let cancel = CancelToken::new();
        interp
            .interpret(&CallChain::new(vec![Call::new("put").arg("v", "x")]), &cancel)
            .unwrap();
        let outputs = interp
            .interpret(&CallChain::new(vec![Call::new("get")]), &cancel)
            .unwrap();
        assert_eq!(outputs[0][0].get_str("v"), Some("<none>"));
    }
}
