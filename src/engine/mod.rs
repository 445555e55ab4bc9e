//! Engine: parser, interpreter and runtime wired together.
//!
//! An engine is bound to one DSL type and therefore to one calling
//! convention. Surfaces available on every engine:
//!
//! - [`Engine::parse`], [`Engine::stream`]
//!
//! Direct-convention engines add [`Engine::execute`]. Two-layer engines add
//! [`Engine::compile`], [`Engine::execute_plan`] and [`Engine::run`].

pub mod cancel;
pub mod stream;

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::debug;

use crate::cfg;
use crate::config::EngineConfig;
use crate::dsl::{CallChain, DefaultParser, ParserBackend, DEFAULT_GRAMMAR};
use crate::error::Result;
use crate::interpreter::{Action, Convention, Direct, Dsl, EventOf, Interpreter, TwoLayer};
use crate::runtime::{self, PrintRuntime, Runtime};

pub use cancel::CancelToken;
pub use stream::{CallCompleted, EventSender, EventStream};

/// A configured engine for DSL type `D`.
///
/// Immutable after construction. Clones share the DSL instance, the handler
/// registry and the runtime, so several chains can be evaluated concurrently.
pub struct Engine<D: Dsl> {
    grammar: String,
    parser: Arc<dyn ParserBackend>,
    interpreter: Interpreter<D>,
    runtime: Arc<dyn Runtime>,
    config: EngineConfig,
}

impl<D: Dsl> Clone for Engine<D> {
    fn clone(&self) -> Self {
        Self {
            grammar: self.grammar.clone(),
            parser: Arc::clone(&self.parser),
            interpreter: self.interpreter.clone(),
            runtime: Arc::clone(&self.runtime),
            config: self.config.clone(),
        }
    }
}

impl<D: Dsl> fmt::Debug for Engine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("handlers", &self.handler_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`]. Everything except the DSL instance is optional.
pub struct EngineBuilder<D: Dsl> {
    dsl: D,
    grammar: Option<String>,
    parser: Option<Arc<dyn ParserBackend>>,
    runtime: Option<Arc<dyn Runtime>>,
    config: EngineConfig,
}

impl<D: Dsl> EngineBuilder<D> {
    pub fn new(dsl: D) -> Self {
        Self {
            dsl,
            grammar: None,
            parser: None,
            runtime: None,
            config: EngineConfig::default(),
        }
    }

    /// Grammar text, forwarded untouched to CFG export.
    pub fn grammar(mut self, grammar: impl Into<String>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    pub fn parser(mut self, parser: impl ParserBackend + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Default executor for two-layer engines. Ignored by direct engines.
    pub fn runtime(mut self, runtime: impl Runtime + 'static) -> Self {
        self.runtime = Some(Arc::new(runtime));
        self
    }

    pub fn shared_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the DSL's handlers and assemble the engine.
    pub fn build(self) -> Result<Engine<D>> {
        let interpreter = Interpreter::new(self.dsl)?;
        let runtime = self
            .runtime
            .unwrap_or_else(|| Arc::new(PrintRuntime::new(self.config.print_format)));

        Ok(Engine {
            grammar: self.grammar.unwrap_or_else(|| DEFAULT_GRAMMAR.to_string()),
            parser: self.parser.unwrap_or_else(|| Arc::new(DefaultParser)),
            interpreter,
            runtime,
            config: self.config,
        })
    }
}

impl<D: Dsl> Engine<D> {
    /// Engine with the default grammar, parser, runtime and config.
    pub fn new(dsl: D) -> Result<Self> {
        EngineBuilder::new(dsl).build()
    }

    pub fn builder(dsl: D) -> EngineBuilder<D> {
        EngineBuilder::new(dsl)
    }

    pub fn dsl(&self) -> &D {
        self.interpreter.dsl()
    }

    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Grammar with directive and blank lines removed, for CFG export.
    pub fn cfg_grammar(&self) -> String {
        cfg::clean_grammar_for_cfg(&self.grammar)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered handler names, sorted.
    pub fn handler_names(&self) -> Vec<&str> {
        self.interpreter.registry().names()
    }

    pub fn parse(&self, source: &str) -> Result<CallChain> {
        Ok(self.parser.parse(source)?)
    }

    /// Evaluate `source` on a producer thread, publishing events per call.
    ///
    /// Direct engines publish a [`CallCompleted`] per call; two-layer engines
    /// publish each [`Action`]. A parse failure is published as the only item.
    pub fn stream(&self, source: impl Into<String>, cancel: CancelToken) -> EventStream<EventOf<D>> {
        let source = source.into();
        let parser = Arc::clone(&self.parser);
        let interpreter = self.interpreter.clone();

        EventStream::spawn(self.config.stream_capacity, move |tx| {
            debug!("stream producer started");
            let chain = match parser.parse(&source) {
                Ok(chain) => chain,
                Err(err) => {
                    tx.send(Err(err.into()));
                    return;
                }
            };

            let walked = interpreter.walk(&chain, &cancel, |call, output| {
                for event in <D::Convention as Convention<D>>::events(call, output) {
                    if !tx.send(Ok(event)) {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            });

            match walked {
                Ok(completed) => debug!(completed, "stream producer finished"),
                Err(err) => {
                    debug!(error = %err, "stream producer failed");
                    tx.send(Err(err));
                }
            }
        })
    }
}

impl<D: Dsl<Convention = Direct>> Engine<D> {
    /// Parse and evaluate `source`, running each handler's effects directly.
    pub fn execute(&self, source: &str, cancel: &CancelToken) -> Result<()> {
        let chain = self.parse(source)?;
        self.execute_chain(&chain, cancel)
    }

    pub fn execute_chain(&self, chain: &CallChain, cancel: &CancelToken) -> Result<()> {
        self.interpreter.interpret(chain, cancel)?;
        Ok(())
    }
}

impl<D: Dsl<Convention = TwoLayer>> Engine<D> {
    /// Parse and evaluate `source` into a plan without performing any effects.
    pub fn compile(&self, source: &str) -> Result<Vec<Action>> {
        let chain = self.parse(source)?;
        self.compile_chain(&chain)
    }

    pub fn compile_chain(&self, chain: &CallChain) -> Result<Vec<Action>> {
        self.compile_chain_with(chain, &CancelToken::new())
    }

    pub fn compile_chain_with(&self, chain: &CallChain, cancel: &CancelToken) -> Result<Vec<Action>> {
        let outputs = self.interpreter.interpret(chain, cancel)?;
        Ok(outputs.into_iter().flatten().collect())
    }

    /// Run `plan` against the engine's default runtime.
    pub fn execute_plan(&self, plan: &[Action], cancel: &CancelToken) -> Result<()> {
        self.execute_plan_with(plan, self.runtime.as_ref(), cancel)
    }

    /// Run `plan` against `runtime` for this call only.
    pub fn execute_plan_with(
        &self,
        plan: &[Action],
        runtime: &dyn Runtime,
        cancel: &CancelToken,
    ) -> Result<()> {
        runtime::run_plan(runtime, plan, cancel)?;
        Ok(())
    }

    /// Compile `source` and execute the plan with the default runtime.
    pub fn run(&self, source: &str, cancel: &CancelToken) -> Result<()> {
        let chain = self.parse(source)?;
        let plan = self.compile_chain_with(&chain, cancel)?;
        self.execute_plan(&plan, cancel)
    }
}
