//! Runtime value representation
//!
//! Immediates (nil, booleans, integers, floats) are stored inline. Everything
//! else lives on the shared heap behind an [`Arc`], so handing a value to
//! another thread or through a channel shares the same object rather than
//! copying it.

use crate::class::{ids, ClassId};
use crate::error::ErrorKind;
use crate::object::{ErrorObject, HeapObject, ObjectKind, RangeObject};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A Garnet runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// nil
    #[default]
    Nil,
    /// true / false
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Heap object
    Object(Arc<HeapObject>),
}

impl Value {
    // ===== Constructors =====

    /// Create nil
    #[inline]
    pub const fn nil() -> Self {
        Value::Nil
    }

    /// Create a boolean
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Value::Boolean(b)
    }

    /// Create an integer
    #[inline]
    pub const fn int(i: i64) -> Self {
        Value::Integer(i)
    }

    /// Create a float
    #[inline]
    pub const fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Wrap a heap object
    pub fn object(class_id: ClassId, kind: ObjectKind) -> Self {
        Value::Object(Arc::new(HeapObject::new(class_id, kind)))
    }

    /// Allocate a new String
    pub fn string(s: impl Into<String>) -> Self {
        Self::object(ids::STRING, ObjectKind::string(s.into()))
    }

    /// Allocate a new Array
    pub fn array(items: Vec<Value>) -> Self {
        Self::object(ids::ARRAY, ObjectKind::array(items))
    }

    /// Allocate a new Hash
    pub fn hash(entries: BTreeMap<String, Value>) -> Self {
        Self::object(ids::HASH, ObjectKind::hash(entries))
    }

    /// Allocate a new inclusive Range
    pub fn range(from: i64, to: i64) -> Self {
        Self::object(ids::RANGE, ObjectKind::Range(RangeObject { from, to }))
    }

    /// Allocate an Error whose message is rendered as `"<Kind>: <text>"`
    pub fn error(kind: ErrorKind, text: impl fmt::Display) -> Self {
        Self::object(
            kind.class_id(),
            ObjectKind::Error(ErrorObject {
                kind,
                message: format!("{}: {}", kind.class_name(), text),
            }),
        )
    }

    // ===== Predicates & accessors =====

    /// Everything except nil and false is truthy
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Check for nil
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Borrow the heap object
    pub fn as_object(&self) -> Option<&Arc<HeapObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Heap payload, if any
    pub fn kind(&self) -> Option<&ObjectKind> {
        self.as_object().map(|obj| &obj.kind)
    }

    /// Snapshot of a String's contents
    pub fn as_string(&self) -> Option<String> {
        match self.kind() {
            Some(ObjectKind::String(s)) => Some(s.lock().clone()),
            _ => None,
        }
    }

    /// Check for a String
    pub fn is_string(&self) -> bool {
        matches!(self.kind(), Some(ObjectKind::String(_)))
    }

    /// Bounds of a Range
    pub fn as_range(&self) -> Option<(i64, i64)> {
        match self.kind() {
            Some(ObjectKind::Range(r)) => Some((r.from, r.to)),
            _ => None,
        }
    }

    /// Snapshot of an Array's elements
    pub fn as_array(&self) -> Option<Vec<Value>> {
        match self.kind() {
            Some(ObjectKind::Array(items)) => Some(items.lock().clone()),
            _ => None,
        }
    }

    /// Class id of this value
    pub fn class_id(&self) -> ClassId {
        match self {
            Value::Nil => ids::NULL,
            Value::Boolean(_) => ids::BOOLEAN,
            Value::Integer(_) => ids::INTEGER,
            Value::Float(_) => ids::FLOAT,
            Value::Object(obj) => obj.class_id,
        }
    }

    /// Class name used in diagnostics (`got=<TypeName>`)
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "Null".to_string(),
            Value::Boolean(_) => "Boolean".to_string(),
            Value::Integer(_) => "Integer".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Object(obj) => match &obj.kind {
                ObjectKind::Error(e) => e.kind.class_name().to_string(),
                ObjectKind::Instance(i) => i.class_name.to_string(),
                kind => kind.variant_name().to_string(),
            },
        }
    }

    /// Check for an Error object
    pub fn is_error(&self) -> bool {
        matches!(self.kind(), Some(ObjectKind::Error(_)))
    }

    /// Kind of an Error object
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.kind() {
            Some(ObjectKind::Error(e)) => Some(e.kind),
            _ => None,
        }
    }

    /// Rendered message of an Error object
    pub fn error_message(&self) -> Option<String> {
        match self.kind() {
            Some(ObjectKind::Error(e)) => Some(e.message.clone()),
            _ => None,
        }
    }

    /// Identity comparison: same heap object, or equal immediates
    pub fn same_object(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => self == other,
        }
    }

    /// Stable identity number
    pub fn object_id(&self) -> i64 {
        match self {
            Value::Nil => 8,
            Value::Boolean(false) => 0,
            Value::Boolean(true) => 20,
            Value::Integer(i) => i.wrapping_mul(2).wrapping_add(1),
            Value::Float(f) => f.to_bits() as i64,
            Value::Object(obj) => Arc::as_ptr(obj) as usize as i64,
        }
    }

    // ===== Rendering =====

    /// Render like `to_s`
    pub fn to_s(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Object(obj) => match &obj.kind {
                ObjectKind::String(s) => s.lock().clone(),
                ObjectKind::Error(e) => e.message.clone(),
                _ => self.inspect(),
            },
            _ => self.inspect(),
        }
    }

    /// Render like `inspect` (strings quoted)
    ///
    /// A container that holds itself renders the inner reference as `[...]`
    /// or `{...}`.
    pub fn inspect(&self) -> String {
        self.inspect_nested(&mut Vec::new())
    }

    pub(crate) fn inspect_nested(&self, open: &mut Vec<*const HeapObject>) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Object(obj) => obj.inspect(open),
        }
    }

    /// `==` over possibly cyclic containers
    ///
    /// A pair of containers already under comparison is assumed equal, so
    /// self-referencing arrays and hashes compare structurally.
    fn eq_nested(
        &self,
        other: &Value,
        open: &mut Vec<(*const HeapObject, *const HeapObject)>,
    ) -> bool {
        let (a, b) = match (self, other) {
            (Value::Object(a), Value::Object(b)) => (a, b),
            _ => return self.eq_immediate(other),
        };
        if Arc::ptr_eq(a, b) {
            return true;
        }
        let pair = (Arc::as_ptr(a), Arc::as_ptr(b));
        match (&a.kind, &b.kind) {
            (ObjectKind::String(x), ObjectKind::String(y)) => {
                let left = x.lock().clone();
                let right = y.lock().clone();
                left == right
            }
            (ObjectKind::Range(x), ObjectKind::Range(y)) => x == y,
            (ObjectKind::Array(_), ObjectKind::Array(_))
            | (ObjectKind::Hash(_), ObjectKind::Hash(_))
                if open.contains(&pair) =>
            {
                true
            }
            (ObjectKind::Array(x), ObjectKind::Array(y)) => {
                let left = x.lock().clone();
                let right = y.lock().clone();
                if left.len() != right.len() {
                    return false;
                }
                open.push(pair);
                let equal = left.iter().zip(&right).all(|(l, r)| l.eq_nested(r, open));
                open.pop();
                equal
            }
            (ObjectKind::Hash(x), ObjectKind::Hash(y)) => {
                let left = x.lock().clone();
                let right = y.lock().clone();
                if left.len() != right.len() {
                    return false;
                }
                open.push(pair);
                let equal = left.iter().zip(&right).all(|((lk, lv), (rk, rv))| {
                    lk == rk && lv.eq_nested(rv, open)
                });
                open.pop();
                equal
            }
            _ => false,
        }
    }

    fn eq_immediate(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            _ => false,
        }
    }
}

/// Floats always show a fractional part
pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Value equality as seen by `==`: contents for Strings, Arrays and Ranges,
/// identity for other heap objects.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_nested(other, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_s())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}
