//! Actions: data-only descriptions of effects, produced by verb handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Open key/value payload. Expected keys are documented per action kind by
/// the DSL that emits it.
pub type Payload = serde_json::Map<String, JsonValue>;

/// A structured effect for a [`Runtime`](crate::runtime::Runtime) to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub payload: Payload,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Builder-style payload insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(JsonValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(JsonValue::as_f64)
    }
}
