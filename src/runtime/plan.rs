//! Plan persistence: save a compiled action list and load it back later.
//!
//! `.yaml` / `.yml` files are written as YAML, anything else as JSON.

use std::io;
use std::path::Path;

use crate::interpreter::Action;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load a plan written by [`save_plan`].
pub fn load_plan(path: &Path) -> Result<Vec<Action>, io::Error> {
    let content = std::fs::read_to_string(path)?;
    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    } else {
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Save a plan, creating parent directories as needed.
pub fn save_plan(path: &Path, plan: &[Action]) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let encoded = if is_yaml(path) {
        serde_yaml::to_string(plan).map_err(io::Error::other)?
    } else {
        serde_json::to_string_pretty(plan).map_err(io::Error::other)?
    };
    std::fs::write(path, encoded)
}
