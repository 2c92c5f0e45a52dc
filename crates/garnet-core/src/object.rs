//! Heap object model
//!
//! Every heap object records its class id and a payload. The payload variant
//! is fixed at allocation; mutable payloads (String, Array, Hash, instance
//! variables) are replaced in place behind a per-object lock so that any
//! single built-in operation is atomic with respect to other threads.

use crate::channel::ChannelObject;
use crate::class::ClassId;
use crate::error::ErrorKind;
use crate::value::Value;
use crate::vm::Environment;
use garnet_bytecode::Module;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Heap-allocated object
#[derive(Debug)]
pub struct HeapObject {
    /// Class ID (index into the class registry)
    pub class_id: ClassId,
    /// Payload
    pub kind: ObjectKind,
}

impl HeapObject {
    /// Create a new heap object
    pub fn new(class_id: ClassId, kind: ObjectKind) -> Self {
        Self { class_id, kind }
    }

    /// Render like `inspect`; `open` holds the containers being rendered
    pub(crate) fn inspect(&self, open: &mut Vec<*const HeapObject>) -> String {
        let this = self as *const HeapObject;
        match &self.kind {
            ObjectKind::String(s) => format!("{:?}", s.lock().as_str()),
            ObjectKind::Array(_) if open.contains(&this) => "[...]".to_string(),
            ObjectKind::Array(items) => {
                let items = items.lock().clone();
                open.push(this);
                let parts: Vec<String> = items.iter().map(|v| v.inspect_nested(open)).collect();
                open.pop();
                format!("[{}]", parts.join(", "))
            }
            ObjectKind::Hash(_) if open.contains(&this) => "{...}".to_string(),
            ObjectKind::Hash(entries) => {
                let entries = entries.lock().clone();
                if entries.is_empty() {
                    return "{}".to_string();
                }
                open.push(this);
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.inspect_nested(open)))
                    .collect();
                open.pop();
                format!("{{ {} }}", parts.join(", "))
            }
            ObjectKind::Range(r) => format!("({}..{})", r.from, r.to),
            ObjectKind::Channel(_) => "#<Channel>".to_string(),
            ObjectKind::Error(e) => format!("#<{}>", e.message),
            ObjectKind::Class(c) => c.name.to_string(),
            ObjectKind::Instance(i) => format!("#<{}>", i.class_name),
            ObjectKind::Block(_) => "#<Block>".to_string(),
        }
    }
}

/// Object payload
pub enum ObjectKind {
    /// Mutable Unicode text
    String(Mutex<String>),
    /// Mutable ordered list
    Array(Mutex<Vec<Value>>),
    /// Mutable map with String keys, iterated in key order
    Hash(Mutex<BTreeMap<String, Value>>),
    /// Inclusive integer range
    Range(RangeObject),
    /// One-slot rendezvous channel
    Channel(ChannelObject),
    /// Language-level error
    Error(ErrorObject),
    /// Class object
    Class(ClassRef),
    /// Instance of a user-defined class
    Instance(InstanceObject),
    /// Closure over a block body
    Block(BlockObject),
}

impl ObjectKind {
    /// String payload
    pub fn string(s: String) -> Self {
        ObjectKind::String(Mutex::new(s))
    }

    /// Array payload
    pub fn array(items: Vec<Value>) -> Self {
        ObjectKind::Array(Mutex::new(items))
    }

    /// Hash payload
    pub fn hash(entries: BTreeMap<String, Value>) -> Self {
        ObjectKind::Hash(Mutex::new(entries))
    }

    /// Variant name for diagnostics
    pub fn variant_name(&self) -> &'static str {
        match self {
            ObjectKind::String(_) => "String",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Hash(_) => "Hash",
            ObjectKind::Range(_) => "Range",
            ObjectKind::Channel(_) => "Channel",
            ObjectKind::Error(_) => "Error",
            ObjectKind::Class(_) => "Class",
            ObjectKind::Instance(_) => "Instance",
            ObjectKind::Block(_) => "Block",
        }
    }
}

impl fmt::Debug for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Channel(c) => fmt::Debug::fmt(c, f),
            ObjectKind::Block(b) => f
                .debug_struct("Block")
                .field("function_id", &b.function_id)
                .finish(),
            other => f.write_str(other.variant_name()),
        }
    }
}

/// Inclusive integer range; may be empty or reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeObject {
    /// First element
    pub from: i64,
    /// Last element
    pub to: i64,
}

impl RangeObject {
    /// Number of elements when iterated upwards
    pub fn len(&self) -> usize {
        if self.to < self.from {
            0
        } else {
            self.to.abs_diff(self.from) as usize + 1
        }
    }

    /// Whether iteration yields nothing
    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

/// Language-level error payload
#[derive(Debug, Clone)]
pub struct ErrorObject {
    /// Error kind
    pub kind: ErrorKind,
    /// Fully rendered message, `"<Kind>: <text>"`
    pub message: String,
}

/// Payload of a class object
#[derive(Debug, Clone)]
pub struct ClassRef {
    /// Registry id of the class
    pub id: ClassId,
    /// Class name
    pub name: Arc<str>,
}

/// Instance of a user class
#[derive(Debug)]
pub struct InstanceObject {
    /// Class name, for rendering
    pub class_name: Arc<str>,
    /// Instance variables
    pub ivars: Mutex<FxHashMap<String, Value>>,
}

impl InstanceObject {
    /// Create an instance with no instance variables set
    pub fn new(class_name: Arc<str>) -> Self {
        Self {
            class_name,
            ivars: Mutex::new(FxHashMap::default()),
        }
    }
}

/// Closure: a block body plus the scope and `self` it was created in
pub struct BlockObject {
    /// Module owning the body
    pub module: Arc<Module>,
    /// Function index of the body
    pub function_id: usize,
    /// Environment of the defining frame
    pub env: Arc<Environment>,
    /// `self` of the defining frame
    pub self_value: Value,
}
