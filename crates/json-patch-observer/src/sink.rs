//! Emission sink: buffers operations and forwards them to the user callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{InvalidUsage, Result};
use crate::operation::Operation;

/// Synchronous per-operation callback.
pub type Callback = Box<dyn FnMut(&Operation)>;

/// Pause/resume switch of an observer's sink.
///
/// Clones share the same state, so a callback can capture one and pause or
/// resume the observer that invokes it without holding the observer itself.
#[derive(Debug, Clone)]
pub struct SinkSwitch(Rc<Cell<bool>>);

impl SinkSwitch {
    fn new(active: bool) -> Self {
        SinkSwitch(Rc::new(Cell::new(active)))
    }

    /// Stop emitting. Mutations still reach the underlying data.
    pub fn pause(&self) {
        self.0.set(false);
    }

    /// Restore forwarding to the buffer and the callback.
    pub fn resume(&self) {
        self.0.set(true);
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }
}

pub(crate) struct Sink {
    switch: SinkSwitch,
    record: Cell<bool>,
    buffer: RefCell<Vec<Operation>>,
    callback: RefCell<Option<Callback>>,
}

impl Sink {
    /// A paused sink that neither records nor calls back.
    pub(crate) fn new() -> Self {
        Sink {
            switch: SinkSwitch::new(false),
            record: Cell::new(false),
            buffer: RefCell::new(Vec::new()),
            callback: RefCell::new(None),
        }
    }

    pub(crate) fn configure(&self, record: bool, callback: Option<Callback>) {
        self.record.set(record);
        *self.callback.borrow_mut() = callback;
    }

    pub(crate) fn switch(&self) -> &SinkSwitch {
        &self.switch
    }

    pub(crate) fn emit(&self, op: Operation) {
        if !self.switch.is_active() {
            return;
        }
        trace!(op = op.op_name(), path = op.path(), "emitting patch operation");
        if self.record.get() {
            self.buffer.borrow_mut().push(op.clone());
        }
        // Taken out for the call: the callback may mutate the tree again,
        // and those nested operations are only buffered.
        let callback = self.callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(&op);
            *self.callback.borrow_mut() = Some(callback);
        }
    }

    /// Empties the buffer.
    pub(crate) fn drain(&self) -> Result<Vec<Operation>> {
        if !self.record.get() {
            return Err(InvalidUsage::NotRecording.into());
        }
        Ok(std::mem::take(&mut *self.buffer.borrow_mut()))
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("active", &self.switch.is_active())
            .field("record", &self.record.get())
            .field("pending", &self.buffer.borrow().len())
            .field("callback", &self.callback.borrow().is_some())
            .finish()
    }
}
