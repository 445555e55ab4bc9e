//! Context threaded between verb handlers during one chain evaluation.
//!
//! A fresh, empty context is created for every evaluation and dropped when the
//! chain finishes. It is how one call sees what the previous call decided.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    data: BTreeMap<String, JsonValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(JsonValue::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Copy of this context with `key` set, for handlers that only see `&Context`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let mut next = self.clone();
        next.set(key, value);
        next
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
