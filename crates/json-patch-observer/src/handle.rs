//! [`Handle`]: the wrapper through which an observed node is read and mutated.
//!
//! A handle pairs a raw [`Node`] with the observer that tracks it and the
//! node's trap capability. While the trap is active, writes and deletes are
//! interpreted into patch operations; once it is disabled they are forwarded
//! to the raw node unobserved; once revoked, every access fails.
//!
//! Array methods are expressed as the same element writes and deletes a
//! host array performs, in the same order, so moved elements keep their
//! tracking and shrinking always removes the highest index first.

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{ObserverError, Result};
use crate::interceptor::{forward_delete, forward_set, Core, DETACHED_MESSAGE};
use crate::registry::{Trap, TrapState};
use crate::value::{Node, NodeId, Value};

/// A member key: an object property name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key(key)
    }
}

impl From<&String> for Key {
    fn from(key: &String) -> Self {
        Key(key.clone())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key(index.to_string())
    }
}

/// Negative integers are plain property names, not indices.
impl From<i32> for Key {
    fn from(index: i32) -> Self {
        Key(index.to_string())
    }
}

/// Diagnostic view of a tracked node's registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub path: String,
    pub key: String,
    pub parent: Option<NodeId>,
    pub inherited: bool,
    pub state: TrapState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Intercept,
    Forward,
}

/// A wrapped object or array of an observed tree.
#[derive(Clone)]
pub struct Handle {
    core: Rc<Core>,
    node: Node,
    trap: Trap,
}

impl Handle {
    pub(crate) fn new(core: Rc<Core>, node: Node, trap: Trap) -> Self {
        Handle { core, node, trap }
    }

    fn access(&self) -> Result<Access> {
        if self.core.revoked.get() {
            return Err(ObserverError::Revoked);
        }
        match self.trap.state() {
            TrapState::Active => Ok(Access::Intercept),
            TrapState::Detached => {
                warn!(node = %self.node.id(), "{DETACHED_MESSAGE}");
                Ok(Access::Forward)
            }
            TrapState::Passthrough => Ok(Access::Forward),
            TrapState::Revoked => Err(ObserverError::Revoked),
        }
    }

    fn access_array(&self) -> Result<Access> {
        let access = self.access()?;
        if !self.node.is_array() {
            return Err(ObserverError::NotAnArray);
        }
        Ok(access)
    }

    fn write(&self, access: Access, key: &str, value: Value) -> Result<()> {
        match access {
            Access::Intercept => self.core.trap_set(&self.node, key, value),
            Access::Forward => forward_set(&self.node, key, value),
        }
    }

    fn erase(&self, access: Access, key: &str) -> bool {
        match access {
            Access::Intercept => self.core.trap_delete(&self.node, key),
            Access::Forward => forward_delete(&self.node, key),
        }
    }

    fn item(&self, index: usize) -> Value {
        self.node
            .body()
            .get(&index.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Handle for a container member, sharing its registry trap when
    /// tracked. Untracked members forward like their parent does, silently
    /// when the parent is active.
    fn handle_for(&self, node: Node) -> Handle {
        let tracked = self
            .core
            .registry
            .borrow()
            .get(node.id())
            .map(|meta| meta.trap.clone());
        let trap = tracked.unwrap_or_else(|| match self.trap.state() {
            TrapState::Active => Trap::new(TrapState::Passthrough),
            state => Trap::new(state),
        });
        Handle::new(self.core.clone(), node, trap)
    }

    // ── Identity ──────────────────────────────────────────────────────────

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The raw node behind this handle.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn state(&self) -> TrapState {
        if self.core.revoked.get() {
            return TrapState::Revoked;
        }
        self.trap.state()
    }

    pub fn is_array(&self) -> bool {
        self.node.is_array()
    }

    /// Whether both handles wrap the same raw node.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        self.node.ptr_eq(&other.node)
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Reads a member; `Undefined` when absent. On arrays, `"length"` reads
    /// the slot count.
    pub fn get(&self, key: impl Into<Key>) -> Result<Value> {
        self.access()?;
        let key = key.into();
        let body = self.node.body();
        if body.is_array() && key.as_str() == "length" {
            return Ok(Value::from(body.len()));
        }
        Ok(body.get(key.as_str()).cloned().unwrap_or_default())
    }

    /// Wrapped handle of an object or array member.
    pub fn child(&self, key: impl Into<Key>) -> Result<Handle> {
        let key = key.into();
        match self.get(key.clone())? {
            Value::Node(node) => Ok(self.handle_for(node)),
            _ => Err(ObserverError::NotAContainer {
                key: key.as_str().to_string(),
            }),
        }
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> Result<bool> {
        self.access()?;
        Ok(self.node.body().contains_key(key.into().as_str()))
    }

    /// Object member names in insertion order, or array indices.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.access()?;
        Ok(self.node.body().keys())
    }

    /// Number of object members, or array slots.
    pub fn len(&self) -> Result<usize> {
        self.access()?;
        Ok(self.node.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of the JSON projection of this node.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.access()?;
        Ok(self.node.to_json())
    }

    /// Registry entry of this node, `None` when this observer does not
    /// track it.
    pub fn metadata(&self) -> Result<Option<NodeInfo>> {
        self.access()?;
        let registry = self.core.registry.borrow();
        Ok(registry.get(self.node.id()).map(|meta| NodeInfo {
            id: self.node.id(),
            path: registry.resolve_path(self.node.id()),
            key: meta.key.clone(),
            parent: meta.parent,
            inherited: meta.inherited,
            state: meta.trap.state(),
        }))
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Writes a member. On arrays, `"length"` resizes.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let access = self.access()?;
        self.write(access, key.into().as_str(), value.into())
    }

    /// Deletes a member, returning whether one was removed.
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        let access = self.access()?;
        Ok(self.erase(access, key.into().as_str()))
    }

    // ── Array methods ─────────────────────────────────────────────────────

    /// Appends a value, returning the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        let access = self.access_array()?;
        let len = self.node.len();
        self.write(access, &len.to_string(), value.into())?;
        Ok(len + 1)
    }

    /// Removes the last element; `Undefined` when empty.
    pub fn pop(&self) -> Result<Value> {
        let access = self.access_array()?;
        let len = self.node.len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let last = self.item(len - 1);
        self.erase(access, &(len - 1).to_string());
        Ok(last)
    }

    /// Removes the first element, moving every other one down a slot.
    pub fn shift(&self) -> Result<Value> {
        let access = self.access_array()?;
        let len = self.node.len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let first = self.item(0);
        for index in 1..len {
            let value = self.item(index);
            self.write(access, &(index - 1).to_string(), value)?;
        }
        self.erase(access, &(len - 1).to_string());
        Ok(first)
    }

    /// Prepends values, returning the new length.
    pub fn unshift<I, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let access = self.access_array()?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let len = self.node.len();
        let count = values.len();
        if count > 0 {
            for index in (0..len).rev() {
                let value = self.item(index);
                self.write(access, &(index + count).to_string(), value)?;
            }
            for (index, value) in values.into_iter().enumerate() {
                self.write(access, &index.to_string(), value)?;
            }
        }
        Ok(len + count)
    }

    /// Removes `delete_count` elements at `start` and inserts `values` in
    /// their place, returning the removed elements.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, values: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let access = self.access_array()?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let len = self.node.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        let insert_count = values.len();
        let removed: Vec<Value> = (start..start + delete_count).map(|i| self.item(i)).collect();

        if insert_count < delete_count {
            for index in start..len - delete_count {
                let value = self.item(index + delete_count);
                self.write(access, &(index + insert_count).to_string(), value)?;
            }
            for index in (len - delete_count + insert_count..len).rev() {
                self.erase(access, &index.to_string());
            }
        } else if insert_count > delete_count {
            for index in (start..len - delete_count).rev() {
                let value = self.item(index + delete_count);
                self.write(access, &(index + insert_count).to_string(), value)?;
            }
        }
        for (offset, value) in values.into_iter().enumerate() {
            self.write(access, &(start + offset).to_string(), value)?;
        }
        Ok(removed)
    }

    /// Inserts a value at `index` (clamped to the length).
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value: Value = value.into();
        self.splice(index, 0, [value])?;
        Ok(())
    }

    /// Removes the element at `index`, moving later ones down a slot.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let removed = self.splice(index, 1, Vec::<Value>::new())?;
        Ok(removed.into_iter().next().unwrap_or_default())
    }

    /// Resizes the array. Shrinking removes from the highest index down,
    /// growing appends `Undefined` slots.
    pub fn set_len(&self, len: usize) -> Result<()> {
        let access = self.access_array()?;
        self.write(access, "length", Value::from(len))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("node", &self.node.id())
            .field("state", &self.state())
            .finish()
    }
}

impl From<&Handle> for Value {
    fn from(handle: &Handle) -> Self {
        Value::Node(handle.node.clone())
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Node(handle.node)
    }
}
