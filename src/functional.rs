//! Functional verbs: `map`, `filter`, `reduce`, `compose`, `pipe`.
//!
//! These only package `@name` references and operand data. Applying the
//! referenced handlers is left to the runtime (two-layer) or to the DSL's
//! own callback (direct).
//!
//! Positional layout:
//!
//! | verb      | positionals                         |
//! |-----------|-------------------------------------|
//! | `map`     | `@f, data`                          |
//! | `filter`  | `@pred, data`                       |
//! | `reduce`  | `@f, data [, initial]`              |
//! | `compose` | `@f, @g, ...`                       |
//! | `pipe`    | `data, @f, @g, ...`                 |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::dsl::Value;
use crate::interpreter::{
    positional_key, Action, ArgError, Args, Direct, HandlerResult, Outcome, Registry, TwoLayer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionalOp {
    Map,
    Filter,
    Reduce,
    Compose,
    Pipe,
}

impl FunctionalOp {
    pub const ALL: [FunctionalOp; 5] = [
        FunctionalOp::Map,
        FunctionalOp::Filter,
        FunctionalOp::Reduce,
        FunctionalOp::Compose,
        FunctionalOp::Pipe,
    ];

    /// Verb name, also used as the action kind.
    pub fn name(self) -> &'static str {
        match self {
            FunctionalOp::Map => "map",
            FunctionalOp::Filter => "filter",
            FunctionalOp::Reduce => "reduce",
            FunctionalOp::Compose => "compose",
            FunctionalOp::Pipe => "pipe",
        }
    }
}

impl fmt::Display for FunctionalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments of one functional verb, pulled out of the positional slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalCall {
    pub op: FunctionalOp,
    /// Referenced handler names, in source order.
    pub functions: Vec<String>,
    pub data: Option<Value>,
    pub initial: Option<Value>,
}

impl FunctionalCall {
    pub fn extract(op: FunctionalOp, args: &Args) -> Result<Self, ArgError> {
        let data_at = |i: usize| args.require(&positional_key(i)).cloned();

        let call = match op {
            FunctionalOp::Map | FunctionalOp::Filter => Self {
                op,
                functions: vec![function_at(args, 0)?],
                data: Some(data_at(1)?),
                initial: None,
            },
            FunctionalOp::Reduce => Self {
                op,
                functions: vec![function_at(args, 0)?],
                data: Some(data_at(1)?),
                initial: args.positional(2).cloned(),
            },
            FunctionalOp::Compose => Self {
                op,
                functions: functions_from(args, 0)?,
                data: None,
                initial: None,
            },
            FunctionalOp::Pipe => Self {
                op,
                functions: functions_from(args, 1)?,
                data: Some(data_at(0)?),
                initial: None,
            },
        };
        Ok(call)
    }

    /// Single action describing this call. Payload keys per kind:
    /// `map` {func, data}, `filter` {predicate, data},
    /// `reduce` {func, data, initial?}, `compose` {functions},
    /// `pipe` {data, functions}.
    pub fn to_action(&self) -> Action {
        let mut action = Action::new(self.op.name());
        let first = self.functions.first().cloned().unwrap_or_default();

        match self.op {
            FunctionalOp::Map | FunctionalOp::Reduce => action = action.with("func", first),
            FunctionalOp::Filter => action = action.with("predicate", first),
            FunctionalOp::Compose | FunctionalOp::Pipe => {
                let names: Vec<JsonValue> = self
                    .functions
                    .iter()
                    .cloned()
                    .map(JsonValue::String)
                    .collect();
                action = action.with("functions", names);
            }
        }
        if let Some(data) = &self.data {
            action = action.with("data", data.to_json());
        }
        if let Some(initial) = &self.initial {
            action = action.with("initial", initial.to_json());
        }
        action
    }
}

fn function_at(args: &Args, index: usize) -> Result<String, ArgError> {
    args.function(&positional_key(index)).map(str::to_string)
}

/// Every function reference from slot `start` on. At least one is required.
fn functions_from(args: &Args, start: usize) -> Result<Vec<String>, ArgError> {
    let functions = (start..)
        .take_while(|i| args.positional(*i).is_some())
        .map(|i| function_at(args, i))
        .collect::<Result<Vec<_>, _>>()?;
    if functions.is_empty() {
        return Err(ArgError::Missing {
            key: positional_key(start),
        });
    }
    Ok(functions)
}

/// Add the five functional verbs to a two-layer registry. Each emits one
/// action and leaves the context untouched.
pub fn register_verbs<D: 'static>(registry: &mut Registry<D, TwoLayer>) {
    for op in FunctionalOp::ALL {
        registry.verb(op.name(), move |_, args, _| {
            let call = FunctionalCall::extract(op, args)?;
            Ok(Outcome::action(call.to_action()))
        });
    }
}

/// Add the five functional verbs to a direct registry, handing each
/// extracted call to `on_call`.
pub fn register_methods<D, F>(registry: &mut Registry<D, Direct>, on_call: F)
where
    D: 'static,
    F: Fn(&D, FunctionalCall) -> HandlerResult + Send + Sync + 'static,
{
    let on_call = Arc::new(on_call);
    for op in FunctionalOp::ALL {
        let on_call = Arc::clone(&on_call);
        registry.method(op.name(), move |dsl, args| {
            let call = FunctionalCall::extract(op, args)?;
            on_call(dsl, call)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Arg;
    use crate::interpreter::{Context, Convention};
    use serde_json::json;
    use std::sync::Mutex;

    fn args(values: Vec<Value>) -> Args {
        let args: Vec<Arg> = values.into_iter().map(Arg::positional).collect();
        Args::from_call_args(&args)
    }

    fn func(name: &str) -> Value {
        Value::Function(name.to_string())
    }

    #[test]
    fn map_extracts_function_and_data() {
        let call =
            FunctionalCall::extract(FunctionalOp::Map, &args(vec![func("square"), "xs".into()]))
                .unwrap();
        assert_eq!(call.functions, vec!["square"]);
        assert_eq!(call.data, Some(Value::from("xs")));
        assert_eq!(
            serde_json::to_value(call.to_action()).unwrap(),
            json!({"kind": "map", "payload": {"func": "square", "data": "xs"}})
        );
    }

    #[test]
    fn filter_uses_predicate_key() {
        let call = FunctionalCall::extract(
            FunctionalOp::Filter,
            &args(vec![func("is_even"), Value::Identifier("numbers".into())]),
        )
        .unwrap();
        let action = call.to_action();
        assert_eq!(action.get_str("predicate"), Some("is_even"));
        assert_eq!(action.get_str("data"), Some("numbers"));
    }

    #[test]
    fn reduce_initial_is_optional() {
        let without =
            FunctionalCall::extract(FunctionalOp::Reduce, &args(vec![func("add"), "xs".into()]))
                .unwrap();
        assert!(without.to_action().get("initial").is_none());

        let with = FunctionalCall::extract(
            FunctionalOp::Reduce,
            &args(vec![func("add"), "xs".into(), 0.into()]),
        )
        .unwrap();
        assert_eq!(with.to_action().get("initial"), Some(&json!(0)));
    }

    #[test]
    fn compose_collects_every_reference() {
        let call = FunctionalCall::extract(
            FunctionalOp::Compose,
            &args(vec![func("f"), func("g"), func("h")]),
        )
        .unwrap();
        assert_eq!(call.functions, vec!["f", "g", "h"]);
        assert_eq!(call.to_action().get("functions"), Some(&json!(["f", "g", "h"])));
    }

    #[test]
    fn pipe_takes_data_first() {
        let call = FunctionalCall::extract(
            FunctionalOp::Pipe,
            &args(vec![5.into(), func("double"), func("square")]),
        )
        .unwrap();
        let action = call.to_action();
        assert_eq!(action.get("data"), Some(&json!(5)));
        assert_eq!(action.get("functions"), Some(&json!(["double", "square"])));
    }

    #[test]
    fn plain_value_in_function_slot_is_rejected() {
        let err =
            FunctionalCall::extract(FunctionalOp::Map, &args(vec!["square".into(), "xs".into()]))
                .unwrap_err();
        assert!(matches!(err, ArgError::WrongKind { key, .. } if key == "_positional_0"));
    }

    #[test]
    fn missing_data_is_reported() {
        let err = FunctionalCall::extract(FunctionalOp::Map, &args(vec![func("square")]))
            .unwrap_err();
        assert_eq!(
            err,
            ArgError::Missing {
                key: "_positional_1".into()
            }
        );
    }

    #[test]
    fn compose_and_pipe_need_a_function() {
        let err = FunctionalCall::extract(FunctionalOp::Compose, &args(vec![])).unwrap_err();
        assert_eq!(
            err,
            ArgError::Missing {
                key: "_positional_0".into()
            }
        );

        let err = FunctionalCall::extract(FunctionalOp::Pipe, &args(vec![5.into()])).unwrap_err();
        assert_eq!(
            err,
            ArgError::Missing {
                key: "_positional_1".into()
            }
        );
    }

    struct Verbs;

    #[test]
    fn registered_verbs_emit_one_action() {
        let mut registry: Registry<Verbs, TwoLayer> = Registry::new();
        register_verbs(&mut registry);
        assert_eq!(
            registry.names(),
            vec!["compose", "filter", "map", "pipe", "reduce"]
        );

        let handler = registry.get("compose").unwrap();
        let mut ctx = Context::new().with("keep", true);
        let actions =
            TwoLayer::invoke(handler, &Verbs, &args(vec![func("f")]), &mut ctx).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, "compose");
        assert!(ctx.contains("keep"));
    }

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<FunctionalOp>>,
    }

    #[test]
    fn registered_methods_forward_extracted_calls() {
        let mut registry: Registry<Collector, Direct> = Registry::new();
        register_methods(&mut registry, |dsl: &Collector, call| {
            dsl.seen.lock().unwrap().push(call.op);
            Ok(())
        });

        let dsl = Collector::default();
        let handler = registry.get("pipe").unwrap();
        Direct::invoke(handler, &dsl, &args(vec![1.into(), func("f")]), &mut ()).unwrap();
        assert_eq!(*dsl.seen.lock().unwrap(), vec![FunctionalOp::Pipe]);

        let handler = registry.get("map").unwrap();
        assert!(Direct::invoke(handler, &dsl, &args(vec![]), &mut ()).is_err());
    }
}
