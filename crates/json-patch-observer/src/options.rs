//! Observer configuration.

use serde::{Deserialize, Serialize};

use crate::registry::TrapState;

/// Options fixed for the lifetime of an [`Observer`](crate::Observer).
///
/// # Example
///
/// ```
/// use json_patch_observer::ObserverOptions;
///
/// let options = ObserverOptions::default().warn_on_detached_access(false);
/// assert!(!options.warn_on_detached_access);
///
/// let parsed: ObserverOptions = serde_json::from_str("{}").unwrap();
/// assert!(parsed.warn_on_detached_access);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserverOptions {
    /// Log a warning whenever a node removed from the tree, or a tree whose
    /// traps were disabled, is still accessed. When false such accesses are
    /// forwarded silently.
    pub warn_on_detached_access: bool,
}

impl ObserverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn_on_detached_access(mut self, warn: bool) -> Self {
        self.warn_on_detached_access = warn;
        self
    }

    /// The trap state a node gets once it stops being observed.
    pub(crate) fn disabled_state(&self) -> TrapState {
        if self.warn_on_detached_access {
            TrapState::Detached
        } else {
            TrapState::Passthrough
        }
    }
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            warn_on_detached_access: true,
        }
    }
}
