//! [`Value`] and [`Node`]: the host value model of an observed document.
//!
//! A [`Value`] is JSON plus an explicit `Undefined`, which is what object
//! members and array slots hold after being cleared without being removed.
//! Objects and arrays are [`Node`]s: shared, identity-bearing containers. Two
//! values holding the same node alias the same container, which is how a
//! subtree moved inside the tree keeps its tracking.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::{Map, Number};

use crate::pointer::parse_array_index;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Value ─────────────────────────────────────────────────────────────────

/// A JSON-compatible value that can also be `Undefined`.
///
/// Equality compares containers by identity, not structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Node(Node),
}

impl Value {
    /// Builds a fresh object node from `(key, value)` pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Node(Node::from_body(Body::Object(map)))
    }

    /// Builds a fresh array node.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Value::Node(Node::from_body(Body::Array {
            items,
            props: IndexMap::new(),
        }))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `null` or `undefined`; both project to `null` inside arrays.
    pub(crate) fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Reads the value as an array length: a non-negative integral number.
    pub(crate) fn as_array_length(&self) -> Option<usize> {
        let Value::Number(n) = self else {
            return None;
        };
        if let Some(u) = n.as_u64() {
            return usize::try_from(u).ok();
        }
        match n.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Some(f as usize),
            _ => None,
        }
    }

    /// Strict identity: containers by identity, numbers by numeric value.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
            }
            (Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// JSON projection of the value.
    ///
    /// A bare `Undefined` projects to `null`, the way it does as an array
    /// element.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Node(node) => node.to_json(),
        }
    }
}

/// Deep clones a value with JSON round-trip semantics.
///
/// Containers are copied into fresh nodes, undefined object members are
/// dropped, undefined array slots become `null`, non-index array properties
/// are dropped, and a bare `Undefined` becomes `Null`.
///
/// # Example
///
/// ```
/// use json_patch_observer::{deep_clone, Value};
///
/// let original = Value::object([("a", Value::Undefined), ("b", Value::from(1))]);
/// let cloned = deep_clone(&original);
/// assert_ne!(original, cloned);
/// assert_eq!(cloned.to_json(), serde_json::json!({"b": 1}));
/// assert_eq!(deep_clone(&Value::Undefined), Value::Null);
/// ```
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Undefined => Value::Null,
        Value::Node(node) => Value::Node(node.deep_clone()),
        primitive => primitive.clone(),
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::array(arr),
            serde_json::Value::Object(obj) => Value::object(obj),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Undefined, Into::into)
    }
}

// ── Node ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) enum Body {
    Object(IndexMap<String, Value>),
    /// Dense slots plus properties that are not array indices.
    Array {
        items: Vec<Value>,
        props: IndexMap<String, Value>,
    },
}

impl Body {
    pub(crate) fn is_array(&self) -> bool {
        matches!(self, Body::Array { .. })
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Body::Object(map) => map.len(),
            Body::Array { items, .. } => items.len(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Body::Object(map) => map.get(key),
            Body::Array { items, props } => match parse_array_index(key) {
                Some(index) => items.get(index),
                None => props.get(key),
            },
        }
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        match self {
            Body::Object(map) => map.keys().cloned().collect(),
            Body::Array { items, .. } => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Container members reachable by JSON Pointer.
    pub(crate) fn containers(&self) -> Vec<(String, Node)> {
        match self {
            Body::Object(map) => map
                .iter()
                .filter_map(|(k, v)| v.as_node().map(|n| (k.clone(), n.clone())))
                .collect(),
            Body::Array { items, .. } => items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.as_node().map(|n| (i.to_string(), n.clone())))
                .collect(),
        }
    }

    /// Every container member, array properties included.
    fn all_containers(&self) -> Vec<Node> {
        let values: Box<dyn Iterator<Item = &Value>> = match self {
            Body::Object(map) => Box::new(map.values()),
            Body::Array { items, props } => Box::new(items.iter().chain(props.values())),
        };
        values.filter_map(|v| v.as_node().cloned()).collect()
    }

    /// Writes a member. Array indices past the end back-fill with `Undefined`.
    pub(crate) fn put(&mut self, key: &str, value: Value) {
        match self {
            Body::Object(map) => {
                map.insert(key.to_string(), value);
            }
            Body::Array { items, props } => match parse_array_index(key) {
                Some(index) if index < items.len() => items[index] = value,
                Some(index) => {
                    items.resize(index, Value::Undefined);
                    items.push(value);
                }
                None => {
                    props.insert(key.to_string(), value);
                }
            },
        }
    }

    /// Removes a member. Removing the last array slot shrinks the array,
    /// removing an inner slot leaves an `Undefined` hole.
    pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
        match self {
            Body::Object(map) => map.shift_remove(key),
            Body::Array { items, props } => match parse_array_index(key) {
                Some(index) if index + 1 == items.len() => items.pop(),
                Some(index) if index < items.len() => {
                    Some(std::mem::replace(&mut items[index], Value::Undefined))
                }
                Some(_) => None,
                None => props.shift_remove(key),
            },
        }
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        if let Body::Array { items, .. } = self {
            items.resize(len, Value::Undefined);
        }
    }
}

#[derive(Debug)]
struct NodeInner {
    id: NodeId,
    body: RefCell<Body>,
    /// Number of observers currently tracking this node.
    observers: Cell<usize>,
}

/// A shared object or array container.
///
/// Cloning a `Node` clones the reference, not the container. Nodes are
/// read-only from outside the crate: mutations go through a
/// [`Handle`](crate::Handle).
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    pub(crate) fn from_body(body: Body) -> Self {
        Node(Rc::new(NodeInner {
            id: NodeId::next(),
            body: RefCell::new(body),
            observers: Cell::new(0),
        }))
    }

    /// A fresh, empty object.
    pub fn object() -> Self {
        Node::from_body(Body::Object(IndexMap::new()))
    }

    /// A fresh, empty array.
    pub fn array() -> Self {
        Node::from_body(Body::Array {
            items: Vec::new(),
            props: IndexMap::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn is_array(&self) -> bool {
        self.body().is_array()
    }

    /// Number of object members, or array slots.
    pub fn len(&self) -> usize {
        self.body().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both references point at the same container.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshot of the node's JSON projection.
    pub fn to_json(&self) -> serde_json::Value {
        match &*self.body() {
            Body::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Body::Array { items, .. } => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// Structural copy into fresh nodes, with JSON round-trip semantics.
    pub fn deep_clone(&self) -> Node {
        let body = match &*self.body() {
            Body::Object(map) => Body::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), deep_clone(v)))
                    .collect(),
            ),
            Body::Array { items, .. } => Body::Array {
                items: items.iter().map(deep_clone).collect(),
                props: IndexMap::new(),
            },
        };
        Node::from_body(body)
    }

    /// Whether `target` is this node or reachable from it.
    pub(crate) fn contains(&self, target: &Node) -> bool {
        if self.ptr_eq(target) {
            return true;
        }
        let children = self.body().all_containers();
        children.iter().any(|child| child.contains(target))
    }

    pub(crate) fn body(&self) -> Ref<'_, Body> {
        self.0.body.borrow()
    }

    pub(crate) fn body_mut(&self) -> RefMut<'_, Body> {
        self.0.body.borrow_mut()
    }

    /// Whether any observer currently tracks this node.
    pub(crate) fn is_observed(&self) -> bool {
        self.0.observers.get() > 0
    }

    pub(crate) fn retain(&self) {
        self.0.observers.set(self.0.observers.get() + 1);
    }

    pub(crate) fn release(&self) {
        self.0.observers.set(self.0.observers.get().saturating_sub(1));
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}, {})", self.id(), self.to_json())
    }
}

/// Non-owning reference to a [`Node`].
#[derive(Debug, Clone)]
pub(crate) struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub(crate) fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}
