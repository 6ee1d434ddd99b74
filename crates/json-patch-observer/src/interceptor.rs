//! Mutation interpreter and tree walker.
//!
//! [`Core`] is the state shared by an observer and every handle it issues.
//! Writes and deletes arriving through active handles land in
//! [`Core::trap_set`] and [`Core::trap_delete`], which update the raw node,
//! keep the registry in sync with where each node now lives, and emit at most
//! one operation per call (plus back-fill operations for array writes past
//! the end).

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{ObserverError, Result};
use crate::operation::Operation;
use crate::options::ObserverOptions;
use crate::pointer::parse_array_index;
use crate::registry::{Registry, Trap, TrapState};
use crate::sink::Sink;
use crate::value::{Node, NodeId, Value};

pub(crate) const DETACHED_MESSAGE: &str =
    "accessing a node that is detached from the observed tree; the change will not emit a patch";

#[derive(Debug)]
pub(crate) struct Core {
    pub(crate) options: ObserverOptions,
    pub(crate) registry: RefCell<Registry>,
    pub(crate) sink: Sink,
    pub(crate) root: Node,
    pub(crate) observing: Cell<bool>,
    pub(crate) revoked: Cell<bool>,
    warned: RefCell<HashSet<(NodeId, String)>>,
}

impl Core {
    pub(crate) fn new(root: Node, options: ObserverOptions) -> Self {
        Core {
            options,
            registry: RefCell::new(Registry::default()),
            sink: Sink::new(),
            root,
            observing: Cell::new(false),
            revoked: Cell::new(false),
            warned: RefCell::new(HashSet::new()),
        }
    }

    // ── Tree walker ───────────────────────────────────────────────────────

    /// Wraps the whole tree, returning the root's trap.
    pub(crate) fn wrap_root(&self) -> Trap {
        let mut registry = self.registry.borrow_mut();
        let root = self.wrap_subtree(&mut registry, None, self.root.clone(), "");
        debug!(root = %root.id(), nodes = registry.len(), "wrapped observed tree");
        registry.register(&root, None, "")
    }

    /// Registers every addressable container below `node`, children first,
    /// then `node` itself under `(parent, key)`.
    ///
    /// A child that is already tracked, here or by another observer, is
    /// replaced by a deep clone so that each tracked node lives in exactly one
    /// place.
    fn wrap_subtree(
        &self,
        registry: &mut Registry,
        parent: Option<NodeId>,
        node: Node,
        key: &str,
    ) -> Node {
        let children = node.body().containers();
        for (child_key, child) in children {
            let child = if registry.contains(child.id()) || child.is_observed() {
                let clone = child.deep_clone();
                node.body_mut().put(&child_key, Value::Node(clone.clone()));
                clone
            } else {
                child
            };
            self.wrap_subtree(registry, Some(node.id()), child, &child_key);
        }
        registry.register(&node, parent, key);
        node
    }

    // ── Write trap ────────────────────────────────────────────────────────

    pub(crate) fn trap_set(&self, tree: &Node, key: &str, value: Value) -> Result<()> {
        let is_array = tree.is_array();
        if is_array && key == "length" {
            return self.set_array_len(tree, &value);
        }
        let index = if is_array { parse_array_index(key) } else { None };

        if let Value::Node(node) = &value {
            self.check_acyclic(tree, key, node)?;
        }

        if let Some(index) = index {
            self.backfill(tree, index);
        }
        self.write_member(tree, key, index, value);
        Ok(())
    }

    /// Fills the slots from the current length up to `end` (exclusive)
    /// with `Undefined`, ascending. Each skipped slot gets its own `add`, a
    /// patch may not append past the end in one step.
    fn backfill(&self, tree: &Node, end: usize) {
        for index in tree.len()..end {
            self.write_member(tree, &index.to_string(), Some(index), Value::Undefined);
        }
    }

    /// Writes one member and emits its operation. Array indices must not be
    /// past the end.
    fn write_member(&self, tree: &Node, key: &str, index: Option<usize>, value: Value) {
        let is_array = tree.is_array();
        let addressable = !is_array || index.is_some();
        let path = self.registry.borrow().path_to(tree.id(), key);

        let value = match value {
            Value::Node(node) if addressable => Value::Node(self.adopt(tree, key, node)),
            other => other,
        };

        let (old, was_present) = {
            let body = tree.body();
            match body.get(key) {
                Some(old) => (old.clone(), true),
                None => (Value::Undefined, false),
            }
        };

        tree.body_mut().put(key, value.clone());

        if !addressable {
            self.warn_non_addressable(tree, key, value.as_node().is_some());
            return;
        }

        let op = if value.is_undefined() {
            if !is_array && !was_present {
                return;
            }
            if was_present && !is_significant_change(&old, &value, is_array) {
                return;
            }
            if !is_array {
                Operation::Remove { path }
            } else if was_present {
                Operation::Replace {
                    path,
                    value: serde_json::Value::Null,
                }
            } else {
                Operation::Add {
                    path,
                    value: serde_json::Value::Null,
                }
            }
        } else if was_present && (!old.is_undefined() || is_array) {
            if !is_significant_change(&old, &value, is_array) {
                return;
            }
            Operation::Replace {
                path,
                value: value.to_json(),
            }
        } else {
            Operation::Add {
                path,
                value: value.to_json(),
            }
        };

        let keep = value.as_node().map(Node::id);
        self.release(&old, keep);
        self.sink.emit(op);
    }

    /// Registers `node` at `(tree, key)`, either by moving its existing entry
    /// or by wrapping it fresh. Returns the node to install.
    fn adopt(&self, tree: &Node, key: &str, node: Node) -> Node {
        let mut registry = self.registry.borrow_mut();
        if let Some(meta) = registry.get_mut(node.id()) {
            let moved = meta.parent != Some(tree.id()) || meta.key != key;
            if moved {
                meta.parent = Some(tree.id());
                meta.key = key.to_string();
                meta.inherited = true;
            }
            return node;
        }
        let node = if node.is_observed() {
            node.deep_clone()
        } else {
            node
        };
        self.wrap_subtree(&mut registry, Some(tree.id()), node, key)
    }

    /// Rejects `node` when `tree` is reachable from it. Containment is
    /// checked on the raw nodes: a node written to a second slot is still
    /// inside its first parent until that slot is cleared.
    fn check_acyclic(&self, tree: &Node, key: &str, node: &Node) -> Result<()> {
        if node.contains(tree) {
            return Err(ObserverError::Cycle {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn set_array_len(&self, tree: &Node, value: &Value) -> Result<()> {
        let new_len = value
            .as_array_length()
            .ok_or_else(|| ObserverError::InvalidLength(format!("{value:?}")))?;
        let len = tree.len();
        if new_len < len {
            for index in (new_len..len).rev() {
                self.delete_index(tree, index);
            }
        } else {
            self.backfill(tree, new_len);
        }
        Ok(())
    }

    fn warn_non_addressable(&self, tree: &Node, key: &str, is_container: bool) {
        let first = self
            .warned
            .borrow_mut()
            .insert((tree.id(), key.to_string()));
        if !first {
            return;
        }
        if is_container {
            warn!(
                node = %tree.id(),
                key,
                "a non-integer property ('{key}') was set on an array; no patch is emitted and \
                 the object value is not tracked because it is not addressable by JSON Pointer"
            );
        } else {
            warn!(
                node = %tree.id(),
                key,
                "a non-integer property ('{key}') was set on an array; no patch is emitted"
            );
        }
    }

    // ── Delete trap ───────────────────────────────────────────────────────

    /// Returns whether a member was removed.
    pub(crate) fn trap_delete(&self, tree: &Node, key: &str) -> bool {
        if tree.is_array() {
            return match parse_array_index(key) {
                Some(index) => self.delete_index(tree, index),
                None => tree.body_mut().take(key).is_some(),
            };
        }
        let old = tree.body().get(key).cloned();
        let Some(old) = old else {
            return false;
        };
        if old.is_undefined() {
            tree.body_mut().take(key);
            return true;
        }
        let path = self.registry.borrow().path_to(tree.id(), key);
        tree.body_mut().take(key);
        self.release(&old, None);
        self.sink.emit(Operation::Remove { path });
        true
    }

    /// Removing the last slot shrinks the array and emits `remove`. Removing
    /// an inner slot leaves a hole, which projects to `null`.
    fn delete_index(&self, tree: &Node, index: usize) -> bool {
        let len = tree.len();
        if index >= len {
            return false;
        }
        let path = self.registry.borrow().path_to(tree.id(), &index.to_string());
        let old = tree.body_mut().take(&index.to_string()).unwrap_or_default();
        self.release(&old, None);
        if index + 1 == len {
            self.sink.emit(Operation::Remove { path });
        } else if !old.is_nullish() {
            // The slot stays and projects to `null`; a `remove` would shift
            // every later index.
            self.sink.emit(Operation::Replace {
                path,
                value: serde_json::Value::Null,
            });
        }
        true
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Stops tracking a node that left its slot, unless it was moved to a
    /// new slot (`inherited`) or is the value being written (`keep`).
    fn release(&self, old: &Value, keep: Option<NodeId>) {
        let Value::Node(node) = old else {
            return;
        };
        if keep == Some(node.id()) {
            return;
        }
        let mut registry = self.registry.borrow_mut();
        match registry.get_mut(node.id()) {
            None => return,
            Some(meta) if meta.inherited => {
                meta.inherited = false;
                return;
            }
            Some(_) => {}
        }
        self.teardown(&mut registry, node);
    }

    /// Deregisters `node` and every descendant still parented to it, and
    /// disables their traps.
    fn teardown(&self, registry: &mut Registry, node: &Node) {
        let Some(meta) = registry.remove(node) else {
            return;
        };
        meta.trap.set(self.options.disabled_state());
        debug!(node = %node.id(), key = %meta.key, "stopped tracking detached node");
        let children = node.body().containers();
        for (_, child) in children {
            let Some(meta) = registry.get_mut(child.id()) else {
                continue;
            };
            if meta.parent == Some(node.id()) {
                self.teardown(registry, &child);
            } else {
                // Moved out earlier; its old slot is gone with this node.
                meta.inherited = false;
            }
        }
    }

    /// Turns every tracked node into a forwarding one.
    pub(crate) fn disable_traps(&self) {
        let state = self.options.disabled_state();
        let registry = self.registry.borrow();
        for trap in registry.traps() {
            if trap.state() != TrapState::Revoked {
                trap.set(state);
            }
        }
        debug!(nodes = registry.len(), "disabled traps");
    }

    pub(crate) fn revoke(&self) {
        self.revoked.set(true);
        self.sink.switch().pause();
        let registry = self.registry.borrow();
        for trap in registry.traps() {
            trap.set(TrapState::Revoked);
        }
        debug!(nodes = registry.len(), "revoked observed tree");
    }
}

/// Whether replacing `old` with `new` changes the JSON projection.
///
/// Inside arrays `undefined` and `null` both project to `null`; elsewhere
/// values compare by strict identity.
pub(crate) fn is_significant_change(old: &Value, new: &Value, in_array: bool) -> bool {
    if in_array && old.is_nullish() && new.is_nullish() {
        return false;
    }
    !old.same_value(new)
}

// ── Forwarding ────────────────────────────────────────────────────────────

/// Unobserved write, used once a node's traps are disabled.
pub(crate) fn forward_set(tree: &Node, key: &str, value: Value) -> Result<()> {
    if tree.is_array() && key == "length" {
        let len = value
            .as_array_length()
            .ok_or_else(|| ObserverError::InvalidLength(format!("{value:?}")))?;
        tree.body_mut().set_len(len);
        return Ok(());
    }
    if let Value::Node(node) = &value {
        if node.contains(tree) {
            return Err(ObserverError::Cycle {
                key: key.to_string(),
            });
        }
    }
    tree.body_mut().put(key, value);
    Ok(())
}

/// Unobserved delete, used once a node's traps are disabled.
pub(crate) fn forward_delete(tree: &Node, key: &str) -> bool {
    tree.body_mut().take(key).is_some()
}
