//! [`Observer`]: attaches to a document and hands out the observed root.

use std::rc::Rc;

use tracing::debug;

use crate::error::{InvalidUsage, ObserverError, Result};
use crate::handle::Handle;
use crate::interceptor::Core;
use crate::operation::Operation;
use crate::options::ObserverOptions;
use crate::sink::{Callback, SinkSwitch};
use crate::value::{deep_clone, Value};

/// Observes one document and turns its mutations into patch operations.
///
/// The observer works on a deep clone of the attached root; the value passed
/// in is never modified. Mutations made through the handles returned by
/// [`observe`](Observer::observe) are recorded and/or passed to a callback.
#[derive(Debug)]
pub struct Observer {
    core: Rc<Core>,
}

/// Shorthand for [`Observer::with_options`].
pub fn attach(root: impl Into<Value>, options: ObserverOptions) -> Result<Observer> {
    Observer::with_options(root, options)
}

impl Observer {
    pub fn new(root: impl Into<Value>) -> Result<Self> {
        Self::with_options(root, ObserverOptions::default())
    }

    /// Fails with [`InvalidUsage::RootNotContainer`] unless `root` is an
    /// object or an array.
    pub fn with_options(root: impl Into<Value>, options: ObserverOptions) -> Result<Self> {
        let Value::Node(root) = deep_clone(&root.into()) else {
            return Err(InvalidUsage::RootNotContainer.into());
        };
        Ok(Observer {
            core: Rc::new(Core::new(root, options)),
        })
    }

    pub fn options(&self) -> ObserverOptions {
        self.core.options
    }

    /// Wraps the tree and starts emitting.
    ///
    /// With `record` set, operations are buffered until [`generate`](Self::generate).
    /// The callback, if any, is invoked synchronously for each operation.
    /// At least one of the two is required. Nothing is emitted while the
    /// tree is being wrapped.
    pub fn observe(&self, record: bool, callback: Option<Callback>) -> Result<Handle> {
        if self.core.revoked.get() {
            return Err(ObserverError::Revoked);
        }
        if !record && callback.is_none() {
            return Err(InvalidUsage::NothingToEmit.into());
        }
        if self.core.observing.get() {
            return Err(InvalidUsage::AlreadyObserving.into());
        }
        let sink = &self.core.sink;
        sink.configure(record, callback);
        sink.switch().pause();
        let trap = self.core.wrap_root();
        sink.switch().resume();
        self.core.observing.set(true);
        debug!(record, "started observing");
        Ok(Handle::new(self.core.clone(), self.core.root.clone(), trap))
    }

    /// [`observe`](Self::observe) with a closure.
    pub fn observe_with<F>(&self, record: bool, callback: F) -> Result<Handle>
    where
        F: FnMut(&Operation) + 'static,
    {
        self.observe(record, Some(Box::new(callback)))
    }

    /// Returns and clears the recorded operations.
    ///
    /// Fails with [`InvalidUsage::NotRecording`] unless observing with
    /// `record` set.
    pub fn generate(&self) -> Result<Vec<Operation>> {
        self.core.sink.drain()
    }

    /// Stops emitting until [`resume`](Self::resume). Mutations still apply.
    pub fn pause(&self) {
        self.core.sink.switch().pause();
    }

    pub fn resume(&self) {
        if self.core.revoked.get() {
            return;
        }
        self.core.sink.switch().resume();
    }

    /// A detached pause/resume switch, for use inside callbacks.
    pub fn switch(&self) -> SinkSwitch {
        self.core.sink.switch().clone()
    }

    pub fn is_observing(&self) -> bool {
        self.core.observing.get() && self.core.sink.switch().is_active()
    }

    /// The observed root, once [`observe`](Self::observe) has been called.
    pub fn root(&self) -> Option<Handle> {
        if !self.core.observing.get() {
            return None;
        }
        let trap = self
            .core
            .registry
            .borrow()
            .get(self.core.root.id())
            .map(|meta| meta.trap.clone())?;
        Some(Handle::new(self.core.clone(), self.core.root.clone(), trap))
    }

    /// Stops observing without invalidating handles: every tracked node
    /// forwards to its raw data from now on, warning first if
    /// `warn_on_detached_access` is set.
    pub fn disable_traps(&self) {
        self.core.disable_traps();
    }

    /// Permanently invalidates every handle this observer issued.
    pub fn revoke(&self) {
        self.core.revoke();
    }
}
