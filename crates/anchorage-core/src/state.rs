//! Deep-merge routine for composite state.
//!
//! State is arbitrary nested JSON: plain objects merge recursively, arrays
//! are replaced with an independent copy, scalars overwrite. A patch that
//! names a nested object for a slot that does not already hold one is a
//! programmer error and aborts the merge without touching the stored state.

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    MergeTargetMissing { key: String },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::MergeTargetMissing { key } => {
                write!(f, "state has no mergeable object under key {key:?}")
            }
        }
    }
}

impl std::error::Error for StateError {}

/// Merge `patch` into `current`.
///
/// When `current` is not an object the patch replaces it wholesale. The merge
/// is atomic: it runs against a working copy and commits only on success, so
/// a failing call leaves `current` exactly as it was.
pub fn merge_state(current: &mut Value, patch: &Value) -> Result<(), StateError> {
    if !current.is_object() {
        *current = patch.clone();
        return Ok(());
    }
    let Some(patch_map) = patch.as_object() else {
        // Nothing enumerable to merge into an object.
        return Ok(());
    };
    let mut working = current.clone();
    if let Some(target) = working.as_object_mut() {
        merge_map(target, patch_map)?;
    }
    *current = working;
    Ok(())
}

fn merge_map(current: &mut Map<String, Value>, patch: &Map<String, Value>) -> Result<(), StateError> {
    for (key, value) in patch {
        match value {
            Value::Object(nested) => match current.get_mut(key) {
                Some(Value::Object(existing)) => merge_map(existing, nested)?,
                _ => {
                    return Err(StateError::MergeTargetMissing { key: key.clone() });
                }
            },
            Value::Array(items) => {
                current.insert(key.clone(), Value::Array(items.clone()));
            }
            scalar => {
                current.insert(key.clone(), scalar.clone());
            }
        }
    }
    Ok(())
}
