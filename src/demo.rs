//! Reference DSLs used by the `gs` binary and the integration tests.

use std::sync::{Arc, Mutex};

use crate::error::HandlerError;
use crate::functional::{self, FunctionalCall};
use crate::interpreter::{
    Action, Args, Context, Direct, Dsl, HandlerResult, Outcome, Registry, TwoLayer,
};

/// Two-layer DSL for arranging tracks and clips.
///
/// ```text
/// track(name="Drums", color="red").add_clip(start=0, length=8).mute()
/// ```
///
/// `track` remembers the current track in the context; later `add_clip` and
/// `mute` calls tag their actions with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MusicDsl;

impl MusicDsl {
    fn track(&self, args: &Args, ctx: &Context) -> HandlerResult<Outcome> {
        let name = args.str("name")?;
        let color = args.opt_str("color")?.unwrap_or("");
        let action = Action::new("create_track")
            .with("name", name)
            .with("color", color);
        Ok(Outcome::action(action).with_context(ctx.with("track", name)))
    }

    fn add_clip(&self, args: &Args, ctx: &Context) -> HandlerResult<Outcome> {
        let start = args.number("start")?;
        let length = args.number("length")?;
        if start < 0.0 {
            return Err(HandlerError::msg(format!("clip start must not be negative, got {start}")));
        }
        if length <= 0.0 {
            return Err(HandlerError::msg(format!("clip length must be positive, got {length}")));
        }
        let action = Action::new("add_clip")
            .with("start", args.require("start")?.to_json())
            .with("length", args.require("length")?.to_json());
        Ok(tag_with_track(action, ctx).into())
    }

    fn mute(&self, _args: &Args, ctx: &Context) -> HandlerResult<Outcome> {
        Ok(tag_with_track(Action::new("mute_track"), ctx).into())
    }
}

fn tag_with_track(action: Action, ctx: &Context) -> Action {
    match ctx.get_str("track") {
        Some(track) => action.with("track", track),
        None => action,
    }
}

impl Dsl for MusicDsl {
    type Convention = TwoLayer;

    fn register(registry: &mut Registry<Self, TwoLayer>) {
        registry
            .verb("track", Self::track)
            .verb("add_clip", Self::add_clip)
            .verb("mute", Self::mute);
        functional::register_verbs(registry);
    }
}

/// Two-layer DSL of small numeric verbs meant to be referenced from the
/// functional verbs, e.g. `map(@square, numbers)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionalDsl;

impl FunctionalDsl {
    fn unary(
        kind: &'static str,
        f: fn(f64) -> f64,
    ) -> impl Fn(&Self, &Args, &Context) -> HandlerResult<Outcome> + Send + Sync + 'static {
        move |_, args, _| {
            let x = args.number("x")?;
            Ok(Action::new(kind).with("value", f(x)).into())
        }
    }

    fn is_even(&self, args: &Args, _ctx: &Context) -> HandlerResult<Outcome> {
        let x = args.number("x")?;
        Ok(Action::new("is_even").with("value", x % 2.0 == 0.0).into())
    }
}

impl Dsl for FunctionalDsl {
    type Convention = TwoLayer;

    fn register(registry: &mut Registry<Self, TwoLayer>) {
        registry
            .verb("square", Self::unary("square", |x| x * x))
            .verb("double", Self::unary("double", |x| x * 2.0))
            .verb("is_even", Self::is_even);
        functional::register_verbs(registry);
    }
}

/// Direct DSL that records a to-do list as it runs.
///
/// ```text
/// task("write docs").note(text="draft first").done("write docs")
/// ```
///
/// Each call appends one entry to a shared log; functional verbs append
/// `<op>:<function,...>`.
#[derive(Debug, Default, Clone)]
pub struct TaskDsl {
    log: Arc<Mutex<Vec<String>>>,
}

impl TaskDsl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the shared log; stays valid after the DSL moves into an engine.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn push(&self, entry: String) -> HandlerResult {
        self.log
            .lock()
            .map_err(|_| HandlerError::msg("task log poisoned"))?
            .push(entry);
        Ok(())
    }

    fn title<'a>(args: &'a Args) -> Result<&'a str, HandlerError> {
        match args.opt_str("name")? {
            Some(name) => Ok(name),
            None => Ok(args.str("_positional_0")?),
        }
    }

    fn task(&self, args: &Args) -> HandlerResult {
        let name = Self::title(args)?;
        self.push(format!("task:{name}"))
    }

    fn done(&self, args: &Args) -> HandlerResult {
        let name = Self::title(args)?;
        self.push(format!("done:{name}"))
    }

    fn note(&self, args: &Args) -> HandlerResult {
        let text = match args.opt_str("text")? {
            Some(text) => text,
            None => args.str("_positional_0")?,
        };
        self.push(format!("note:{text}"))
    }

    fn functional(&self, call: FunctionalCall) -> HandlerResult {
        self.push(format!("{}:{}", call.op, call.functions.join(",")))
    }
}

impl Dsl for TaskDsl {
    type Convention = Direct;

    fn register(registry: &mut Registry<Self, Direct>) {
        registry
            .method("task", Self::task)
            .method("done", Self::done)
            .method("note", Self::note);
        functional::register_methods(registry, Self::functional);
    }
}
