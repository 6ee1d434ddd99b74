#![allow(dead_code)]

//! Sequential RFC 6902 apply over `serde_json::Value`, limited to the
//! operations an observer emits.

use json_patch_observer::{parse_pointer, Observer, Operation};
use serde_json::Value;

fn parent_mut<'a>(doc: &'a mut Value, path: &[String]) -> Result<&'a mut Value, String> {
    let mut current = doc;
    for key in path {
        current = match current {
            Value::Object(map) => map.get_mut(key),
            Value::Array(arr) => match key.parse::<usize>() {
                Ok(i) => arr.get_mut(i),
                Err(_) => None,
            },
            _ => None,
        }
        .ok_or_else(|| format!("missing parent segment '{key}'"))?;
    }
    Ok(current)
}

fn split(path: &str) -> Result<(Vec<String>, String), String> {
    let mut segments = parse_pointer(path);
    let key = segments
        .pop()
        .ok_or_else(|| format!("cannot target the root with '{path}'"))?;
    Ok((segments, key))
}

fn index(key: &str, len: usize, inclusive: bool) -> Result<usize, String> {
    let idx: usize = key.parse().map_err(|_| format!("invalid index '{key}'"))?;
    let in_bounds = if inclusive { idx <= len } else { idx < len };
    if !in_bounds {
        return Err(format!("index {idx} out of bounds for length {len}"));
    }
    Ok(idx)
}

pub fn apply_operation(doc: &mut Value, op: &Operation) -> Result<(), String> {
    let (parent_path, key) = split(op.path())?;
    let parent = parent_mut(doc, &parent_path)?;
    match (op, parent) {
        (Operation::Add { value, .. }, Value::Object(map)) => {
            map.insert(key, value.clone());
        }
        (Operation::Add { value, .. }, Value::Array(arr)) => {
            let idx = if key == "-" {
                arr.len()
            } else {
                index(&key, arr.len(), true)?
            };
            arr.insert(idx, value.clone());
        }
        (Operation::Remove { .. }, Value::Object(map)) => {
            map.shift_remove(&key)
                .ok_or_else(|| format!("nothing to remove at '{}'", op.path()))?;
        }
        (Operation::Remove { .. }, Value::Array(arr)) => {
            let idx = index(&key, arr.len(), false)?;
            arr.remove(idx);
        }
        (Operation::Replace { value, .. }, Value::Object(map)) => {
            let slot = map
                .get_mut(&key)
                .ok_or_else(|| format!("nothing to replace at '{}'", op.path()))?;
            *slot = value.clone();
        }
        (Operation::Replace { value, .. }, Value::Array(arr)) => {
            let idx = index(&key, arr.len(), false)?;
            arr[idx] = value.clone();
        }
        (_, other) => return Err(format!("cannot apply to non-container {other}")),
    }
    Ok(())
}

pub fn apply_patch(doc: &mut Value, ops: &[Operation]) -> Result<(), String> {
    ops.iter().try_for_each(|op| apply_operation(doc, op))
}

/// Applies the observer's pending operations to `before` and checks the
/// result against the observed tree.
pub fn assert_replays(observer: &Observer, before: &Value) {
    let ops = observer.generate().expect("recording observer");
    let mut doc = before.clone();
    apply_patch(&mut doc, &ops).unwrap_or_else(|err| panic!("{err}; ops: {ops:?}"));
    let root = observer.root().expect("observing");
    assert_eq!(doc, root.to_json().expect("not revoked"), "ops: {ops:?}");
}
