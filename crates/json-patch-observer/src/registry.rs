//! Node registry and path resolution.
//!
//! Every node an observer tracks has one [`NodeMetadata`] entry keyed by its
//! [`NodeId`]. Parent links are ids, never owning references, so ownership
//! flows strictly from the root down through the raw nodes.

use std::cell::Cell;
use std::collections::hash_map::{Entry, HashMap};
use std::rc::Rc;

use crate::pointer::format_pointer;
use crate::value::{Node, NodeId, WeakNode};

/// How a wrapped node reacts to reads, writes and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapState {
    /// Mutations are interpreted and emitted.
    Active,
    /// Accesses log a warning and are forwarded to the raw node.
    Detached,
    /// Accesses are forwarded to the raw node silently.
    Passthrough,
    /// Every access fails.
    Revoked,
}

/// Shared trap capability of one wrapped node.
///
/// Every handle issued for the node holds a clone, so changing the state
/// here affects handles cached by callers too.
#[derive(Debug, Clone)]
pub(crate) struct Trap(Rc<Cell<TrapState>>);

impl Trap {
    pub(crate) fn new(state: TrapState) -> Self {
        Trap(Rc::new(Cell::new(state)))
    }

    pub(crate) fn state(&self) -> TrapState {
        self.0.get()
    }

    pub(crate) fn set(&self, state: TrapState) {
        self.0.set(state);
    }
}

#[derive(Debug)]
pub(crate) struct NodeMetadata {
    node: WeakNode,
    pub(crate) parent: Option<NodeId>,
    pub(crate) key: String,
    /// Set when the node was moved to a new slot, so that clearing its old
    /// slot does not tear it down.
    pub(crate) inherited: bool,
    pub(crate) trap: Trap,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<NodeId, NodeMetadata>,
}

impl Registry {
    /// Creates or updates the entry of `node`, returning its trap.
    pub(crate) fn register(&mut self, node: &Node, parent: Option<NodeId>, key: &str) -> Trap {
        match self.entries.entry(node.id()) {
            Entry::Occupied(mut entry) => {
                let meta = entry.get_mut();
                meta.parent = parent;
                meta.key = key.to_string();
                meta.trap.clone()
            }
            Entry::Vacant(entry) => {
                node.retain();
                let trap = Trap::new(TrapState::Active);
                entry.insert(NodeMetadata {
                    node: node.downgrade(),
                    parent,
                    key: key.to_string(),
                    inherited: false,
                    trap: trap.clone(),
                });
                trap
            }
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeMetadata> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn remove(&mut self, node: &Node) -> Option<NodeMetadata> {
        let meta = self.entries.remove(&node.id())?;
        node.release();
        Some(meta)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn traps(&self) -> impl Iterator<Item = &Trap> {
        self.entries.values().map(|meta| &meta.trap)
    }

    /// JSON Pointer of a tracked node, `""` for the root or an untracked node.
    pub(crate) fn resolve_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = self.entries.get(&id);
        while let Some(meta) = current {
            let Some(parent) = meta.parent else {
                break;
            };
            segments.push(meta.key.as_str());
            if segments.len() > self.entries.len() {
                break;
            }
            current = self.entries.get(&parent);
        }
        format_pointer(segments.iter().rev())
    }

    /// JSON Pointer of `key` inside the tracked node `id`.
    pub(crate) fn path_to(&self, id: NodeId, key: &str) -> String {
        let mut path = self.resolve_path(id);
        path.push_str(&format_pointer([key]));
        path
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for meta in self.entries.values() {
            if let Some(node) = meta.node.upgrade() {
                node.release();
            }
        }
    }
}
