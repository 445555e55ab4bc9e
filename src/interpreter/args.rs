//! Argument materialization: ordered [`Arg`]s → keyed [`Args`] bag.
//!
//! Named arguments are keyed by name. Positional arguments are keyed
//! `_positional_<i>`, where `i` counts positional arguments only, left to right.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::dsl::{Arg, Value, ValueKind};

pub const POSITIONAL_PREFIX: &str = "_positional_";

/// Synthetic key for the `index`-th positional argument.
pub fn positional_key(index: usize) -> String {
    format!("{POSITIONAL_PREFIX}{index}")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    #[error("missing argument '{key}'")]
    Missing { key: String },

    #[error("argument '{key}' must be a {expected}, got {found}")]
    WrongKind {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

/// The keyed argument bag handed to every handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, Value>,
}

impl Args {
    /// Materialize a call's arguments. Later duplicates overwrite earlier ones.
    pub fn from_call_args(args: &[Arg]) -> Self {
        let mut values = BTreeMap::new();
        let mut positional = 0;
        for arg in args {
            match &arg.name {
                Some(name) => {
                    values.insert(name.clone(), arg.value.clone());
                }
                None => {
                    values.insert(positional_key(positional), arg.value.clone());
                    positional += 1;
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.values.get(&positional_key(index))
    }

    /// Positional values from index 0 up to the first gap.
    pub fn positionals(&self) -> Vec<&Value> {
        (0..)
            .map_while(|i| self.positional(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn require(&self, key: &str) -> Result<&Value, ArgError> {
        self.get(key).ok_or_else(|| ArgError::Missing {
            key: key.to_string(),
        })
    }

    pub fn number(&self, key: &str) -> Result<f64, ArgError> {
        let value = self.require(key)?;
        value.as_number().ok_or_else(|| wrong_kind(key, ValueKind::Number, value))
    }

    /// Text of a string or identifier argument.
    pub fn str(&self, key: &str) -> Result<&str, ArgError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| wrong_kind(key, ValueKind::String, value))
    }

    pub fn bool(&self, key: &str) -> Result<bool, ArgError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| wrong_kind(key, ValueKind::Bool, value))
    }

    /// Name referenced by an `@name` argument.
    pub fn function(&self, key: &str) -> Result<&str, ArgError> {
        let value = self.require(key)?;
        value
            .as_function()
            .ok_or_else(|| wrong_kind(key, ValueKind::Function, value))
    }

    /// Like [`Args::str`], but a missing argument is `Ok(None)`.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, ArgError> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.str(key).map(Some),
        }
    }

    /// Like [`Args::number`], but a missing argument is `Ok(None)`.
    pub fn opt_number(&self, key: &str) -> Result<Option<f64>, ArgError> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.number(key).map(Some),
        }
    }

    /// The whole bag as a JSON object, for building action payloads.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

fn wrong_kind(key: &str, expected: ValueKind, found: &Value) -> ArgError {
    ArgError::WrongKind {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

impl FromIterator<(String, Value)> for Args {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
