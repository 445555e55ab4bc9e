//! Runtime executors: the side of the two-layer convention that performs effects.

pub mod plan;

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::config::PrintFormat;
use crate::engine::cancel::CancelToken;
use crate::error::{Error, Result, RuntimeError};
use crate::interpreter::Action;

/// Performs the effect one action describes.
pub trait Runtime: Send + Sync {
    fn execute(&self, action: &Action) -> Result<(), RuntimeError>;
}

/// Execute `plan` in order, stopping at the first failure.
///
/// `cancel` is checked before each action. Returns the number of actions run.
pub fn run_plan(runtime: &dyn Runtime, plan: &[Action], cancel: &CancelToken) -> Result<usize> {
    for (completed, action) in plan.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(completed, next = %action.kind, "plan cancelled");
            return Err(Error::Cancelled { completed });
        }

        debug!(kind = %action.kind, "executing action");
        runtime.execute(action).map_err(|source| Error::Runtime {
            kind: action.kind.clone(),
            source,
        })?;
    }
    Ok(plan.len())
}

/// Render one action the way [`PrintRuntime`] prints it.
pub fn render(action: &Action, format: PrintFormat) -> String {
    match format {
        PrintFormat::Text => format!(
            "Action: {} with payload: {}",
            action.kind,
            serde_json::Value::Object(action.payload.clone())
        ),
        PrintFormat::Json => serde_json::to_string(action)
            .unwrap_or_else(|_| serde_json::json!({ "kind": action.kind }).to_string()),
    }
}

/// Default executor: prints each action, one per line.
pub struct PrintRuntime {
    format: PrintFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl PrintRuntime {
    /// Print to stdout.
    pub fn new(format: PrintFormat) -> Self {
        Self::to_writer(format, io::stdout())
    }

    pub fn to_writer(format: PrintFormat, out: impl Write + Send + 'static) -> Self {
        Self {
            format,
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn format(&self) -> PrintFormat {
        self.format
    }
}

impl Default for PrintRuntime {
    fn default() -> Self {
        Self::new(PrintFormat::default())
    }
}

impl Runtime for PrintRuntime {
    fn execute(&self, action: &Action) -> Result<(), RuntimeError> {
        let line = render(action, self.format);
        let mut out = self
            .out
            .lock()
            .map_err(|_| RuntimeError::msg("print runtime output lock poisoned"))?;
        writeln!(out, "{line}")?;
        Ok(())
    }
}

/// Records every action it is given. Useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    actions: Mutex<Vec<Action>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded actions, in execution order.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.actions().into_iter().map(|a| a.kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.clear();
        }
    }
}

impl Runtime for RecordingRuntime {
    fn execute(&self, action: &Action) -> Result<(), RuntimeError> {
        self.actions
            .lock()
            .map_err(|_| RuntimeError::msg("recording runtime lock poisoned"))?
            .push(action.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared buffer so tests can read what a PrintRuntime wrote.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct FailOn(&'static str);

    impl Runtime for FailOn {
        fn execute(&self, action: &Action) -> Result<(), RuntimeError> {
            if action.kind == self.0 {
                Err(RuntimeError::msg("device offline"))
            } else {
                Ok(())
            }
        }
    }

    fn plan() -> Vec<Action> {
        vec![
            Action::new("create_track").with("name", "Drums"),
            Action::new("add_clip").with("start", 0).with("length", 8),
            Action::new("mute_track"),
        ]
    }

    #[test]
    fn text_rendering() {
        let action = Action::new("create_track").with("name", "Drums");
        assert_eq!(
            render(&action, PrintFormat::Text),
            r#"Action: create_track with payload: {"name":"Drums"}"#
        );
    }

    #[test]
    fn json_rendering() {
        let action = Action::new("mute_track");
        assert_eq!(
            render(&action, PrintFormat::Json),
            r#"{"kind":"mute_track","payload":{}}"#
        );
    }

    #[test]
    fn json_rendering_escapes_awkward_kinds() {
        let action = Action::new("say \"hi\"\u{7f}\tnow").with("n", 1);
        let line = render(&action, PrintFormat::Json);
        let back: Action = serde_json::from_str(&line).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn print_runtime_writes_one_line_per_action() {
        let buf = SharedBuf::default();
        let runtime = PrintRuntime::to_writer(PrintFormat::Text, buf.clone());
        run_plan(&runtime, &plan(), &CancelToken::new()).unwrap();
        let printed = buf.contents();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Action: add_clip with payload: "));
    }

    #[test]
    fn recording_runtime_keeps_order() {
        let runtime = RecordingRuntime::new();
        let ran = run_plan(&runtime, &plan(), &CancelToken::new()).unwrap();
        assert_eq!(ran, 3);
        assert_eq!(
            runtime.kinds(),
            vec!["create_track", "add_clip", "mute_track"]
        );
        runtime.clear();
        assert!(runtime.actions().is_empty());
    }

    #[test]
    fn first_failure_stops_the_plan() {
        let err = run_plan(&FailOn("add_clip"), &plan(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "action add_clip failed: device offline");
    }

    #[test]
    fn cancelled_plan_runs_nothing() {
        let runtime = RecordingRuntime::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = run_plan(&runtime, &plan(), &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled { completed: 0 }));
        assert!(runtime.actions().is_empty());
    }

    #[test]
    fn empty_plan_is_a_no_op() {
        assert_eq!(run_plan(&FailOn("x"), &[], &CancelToken::new()).unwrap(), 0);
    }
}
