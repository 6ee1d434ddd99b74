//! Emitted patch operations.
//!
//! Operations use the RFC 6902 JSON shape, so a recorded sequence can be fed
//! to any JSON Patch implementation as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ObserverError, Result};

/// One `add`, `remove` or `replace` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl Operation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Operation::Add {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Operation::Remove { path: path.into() }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Operation::Replace {
            path: path.into(),
            value,
        }
    }

    /// The RFC 6902 `op` name.
    pub fn op_name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. } => path,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Operation::Add { value, .. } | Operation::Replace { value, .. } => Some(value),
            Operation::Remove { .. } => None,
        }
    }

    /// Encodes the operation as `{"op", "path", "value"?}`.
    pub fn to_json(&self) -> Value {
        // Plain strings and JSON values only, serialization cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Decodes an operation from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverError::InvalidOperation`] for anything other than a
    /// well-formed `add`, `remove` or `replace`.
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|err| ObserverError::InvalidOperation(err.to_string()))
    }
}

/// Encodes a sequence of operations as a JSON Patch document.
pub fn to_json_patch(ops: &[Operation]) -> Value {
    Value::Array(ops.iter().map(Operation::to_json).collect())
}

/// Decodes a JSON Patch document made of `add`, `remove` and `replace`.
///
/// # Errors
///
/// Returns [`ObserverError::InvalidOperation`] if the document is not an
/// array or any entry fails to decode.
pub fn from_json_patch(patch: &Value) -> Result<Vec<Operation>> {
    let Value::Array(ops) = patch else {
        return Err(ObserverError::InvalidOperation(
            "a patch must be an array".to_string(),
        ));
    };
    ops.iter().map(Operation::from_json).collect()
}
