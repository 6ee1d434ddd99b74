//! Observe mutations of an in-memory JSON tree and emit them as JSON Patch
//! ([RFC 6902](https://tools.ietf.org/html/rfc6902)) operations.
//!
//! An [`Observer`] attaches to a document, wraps every object and array in
//! it, and returns a [`Handle`] to the root. Writes and deletes made through
//! handles are applied to the tree and interpreted into `add`, `remove` and
//! `replace` operations, which are buffered for [`Observer::generate`]
//! and/or passed to a callback as they happen. Paths stay correct while
//! subtrees move around, including the index shifts caused by array
//! methods.
//!
//! # Example
//!
//! ```
//! use json_patch_observer::{Observer, Operation};
//! use serde_json::json;
//!
//! let observer = Observer::new(json!({
//!     "firstName": "Albert",
//!     "phoneNumbers": [{"number": "12345"}, {"number": "45353"}]
//! }))?;
//! let root = observer.observe(true, None)?;
//!
//! root.set("firstName", "Joachim")?;
//! root.child("phoneNumbers")?.child(0)?.set("number", "123")?;
//!
//! assert_eq!(
//!     observer.generate()?,
//!     vec![
//!         Operation::replace("/firstName", json!("Joachim")),
//!         Operation::replace("/phoneNumbers/0/number", json!("123")),
//!     ]
//! );
//! assert!(observer.generate()?.is_empty());
//! # Ok::<(), json_patch_observer::ObserverError>(())
//! ```
//!
//! Values are [`Value`]s: JSON plus `Undefined`, which is what a cleared but
//! not removed member holds. Inside arrays `Undefined` projects to `null`,
//! elsewhere it projects to an absent member.

mod error;
mod handle;
mod interceptor;
mod observer;
mod operation;
mod options;
mod pointer;
mod registry;
mod sink;
mod value;

pub use error::{InvalidUsage, ObserverError, Result};
pub use handle::{Handle, Key, NodeInfo};
pub use observer::{attach, Observer};
pub use operation::{from_json_patch, to_json_patch, Operation};
pub use options::ObserverOptions;
pub use pointer::{
    escape_path_component, format_pointer, is_array_index, parse_pointer, unescape_path_component,
};
pub use registry::TrapState;
pub use sink::{Callback, SinkSwitch};
pub use value::{deep_clone, Node, NodeId, Value};
