//! Classes, method tables and the class registry
//!
//! Classes live in an arena indexed by [`ClassId`]. Each class owns two
//! dispatch tables: instance methods, and class-side (singleton) methods.
//! Lookup walks from the receiver's class toward the root; the first match
//! wins, which is what makes overriding work.

use crate::object::{ClassRef, HeapObject, ObjectKind};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;
use garnet_bytecode::Module;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a class in the registry
pub type ClassId = usize;

/// Ids of the classes every registry starts with
pub mod ids {
    use super::ClassId;

    /// Root of the hierarchy
    pub const OBJECT: ClassId = 0;
    /// Class of class objects
    pub const CLASS: ClassId = 1;
    /// Integer
    pub const INTEGER: ClassId = 2;
    /// Float
    pub const FLOAT: ClassId = 3;
    /// String
    pub const STRING: ClassId = 4;
    /// true / false
    pub const BOOLEAN: ClassId = 5;
    /// nil
    pub const NULL: ClassId = 6;
    /// Array
    pub const ARRAY: ClassId = 7;
    /// Hash
    pub const HASH: ClassId = 8;
    /// Range
    pub const RANGE: ClassId = 9;
    /// Channel
    pub const CHANNEL: ClassId = 10;
    /// Generic Error
    pub const ERROR: ClassId = 11;
    /// TypeError
    pub const TYPE_ERROR: ClassId = 12;
    /// ArgumentError
    pub const ARGUMENT_ERROR: ClassId = 13;
    /// Block
    pub const BLOCK: ClassId = 14;
}

/// Built-in classes in id order, with their superclass
const BUILTIN_CLASSES: [(&str, Option<ClassId>); 15] = [
    ("Object", None),
    ("Class", Some(ids::OBJECT)),
    ("Integer", Some(ids::OBJECT)),
    ("Float", Some(ids::OBJECT)),
    ("String", Some(ids::OBJECT)),
    ("Boolean", Some(ids::OBJECT)),
    ("Null", Some(ids::OBJECT)),
    ("Array", Some(ids::OBJECT)),
    ("Hash", Some(ids::OBJECT)),
    ("Range", Some(ids::OBJECT)),
    ("Channel", Some(ids::OBJECT)),
    ("Error", Some(ids::OBJECT)),
    ("TypeError", Some(ids::ERROR)),
    ("ArgumentError", Some(ids::ERROR)),
    ("Block", Some(ids::OBJECT)),
];

/// Arguments of a native method invocation
#[derive(Clone, Copy)]
pub struct Call<'a> {
    /// Method name as sent
    pub name: &'a str,
    /// Receiver (`self`)
    pub receiver: &'a Value,
    /// Positional arguments
    pub args: &'a [Value],
    /// Block passed with the call
    pub block: Option<&'a Value>,
}

impl<'a> Call<'a> {
    /// Argument `index`, or nil when absent
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }
}

/// Native method body
pub type NativeFn = fn(&mut Interpreter, Call<'_>) -> VmResult<Value>;

/// Method implementation: native code or a compiled bytecode body
#[derive(Clone)]
pub enum MethodImpl {
    /// Implemented in Rust
    Native(NativeFn),
    /// Bytecode function in a loaded module
    Compiled {
        /// Owning module
        module: Arc<Module>,
        /// Function index within the module
        function_id: usize,
    },
}

impl fmt::Debug for MethodImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodImpl::Native(_) => f.write_str("Native"),
            MethodImpl::Compiled {
                module,
                function_id,
            } => write!(f, "Compiled({}#{})", module.metadata.name, function_id),
        }
    }
}

/// Class metadata and dispatch tables
#[derive(Debug)]
pub struct Class {
    /// Class ID (unique identifier)
    pub id: ClassId,
    /// Class name
    pub name: Arc<str>,
    /// Superclass (None only for Object)
    pub superclass: Option<ClassId>,
    methods: FxHashMap<String, MethodImpl>,
    class_methods: FxHashMap<String, MethodImpl>,
    object: Value,
}

impl Class {
    fn new(id: ClassId, name: &str, superclass: Option<ClassId>) -> Self {
        let name: Arc<str> = Arc::from(name);
        let object = Value::Object(Arc::new(HeapObject::new(
            ids::CLASS,
            ObjectKind::Class(ClassRef {
                id,
                name: name.clone(),
            }),
        )));
        Self {
            id,
            name,
            superclass,
            methods: FxHashMap::default(),
            class_methods: FxHashMap::default(),
            object,
        }
    }

    /// The canonical class object
    pub fn object(&self) -> &Value {
        &self.object
    }
}

/// Registry of all classes
#[derive(Debug)]
pub struct ClassRegistry {
    classes: Vec<Class>,
    by_name: FxHashMap<Arc<str>, ClassId>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Create a registry holding the built-in hierarchy (no methods yet)
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::with_capacity(32),
            by_name: FxHashMap::default(),
        };
        for (name, superclass) in BUILTIN_CLASSES {
            registry.register_class(name, superclass);
        }
        registry
    }

    /// Register a class, returning its id
    ///
    /// Registering an existing name returns the existing id unchanged.
    pub fn register_class(&mut self, name: &str, superclass: Option<ClassId>) -> ClassId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.classes.len();
        let class = Class::new(id, name, superclass);
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        log::debug!("registered class {} (id {})", name, id);
        id
    }

    /// Get a class by ID
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id)
    }

    /// Get a class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.by_name.get(name).and_then(|&id| self.classes.get(id))
    }

    /// Class id for a name
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Name of a class
    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.classes.get(id).map(|c| &*c.name)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Define (or override) an instance method
    pub fn define_method(&mut self, class: ClassId, name: &str, method: MethodImpl) {
        if let Some(class) = self.classes.get_mut(class) {
            class.methods.insert(name.to_string(), method);
        }
    }

    /// Define (or override) a class-side method
    pub fn define_class_method(&mut self, class: ClassId, name: &str, method: MethodImpl) {
        if let Some(class) = self.classes.get_mut(class) {
            class.class_methods.insert(name.to_string(), method);
        }
    }

    /// Define a native instance method
    pub fn define_native(&mut self, class: ClassId, name: &str, f: NativeFn) {
        self.define_method(class, name, MethodImpl::Native(f));
    }

    /// Define a native class-side method
    pub fn define_native_class_method(&mut self, class: ClassId, name: &str, f: NativeFn) {
        self.define_class_method(class, name, MethodImpl::Native(f));
    }

    /// Iterate a class and its ancestors, leaf first
    pub fn ancestors(&self, id: ClassId) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: Some(id),
        }
    }

    /// Whether `id` is `ancestor` or inherits from it
    pub fn is_subclass(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.ancestors(id).any(|c| c.id == ancestor)
    }

    /// Resolve an instance method, first match from leaf to root
    pub fn resolve(&self, id: ClassId, name: &str) -> Option<MethodImpl> {
        self.ancestors(id)
            .find_map(|class| class.methods.get(name))
            .cloned()
    }

    /// Resolve a method sent to a class object
    ///
    /// Singleton tables of the class and its ancestors come first, then the
    /// instance methods every class object has (those of `Class`).
    pub fn resolve_class_method(&self, id: ClassId, name: &str) -> Option<MethodImpl> {
        self.ancestors(id)
            .find_map(|class| class.class_methods.get(name))
            .cloned()
            .or_else(|| self.resolve(ids::CLASS, name))
    }

    /// Resolve a method for any receiver
    pub fn resolve_for(&self, receiver: &Value, name: &str) -> Option<MethodImpl> {
        match receiver.kind() {
            Some(ObjectKind::Class(class)) => self.resolve_class_method(class.id, name),
            _ => self.resolve(receiver.class_id(), name),
        }
    }
}

/// Iterator over a class chain
pub struct Ancestors<'a> {
    registry: &'a ClassRegistry,
    next: Option<ClassId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let class = self.registry.classes.get(self.next?)?;
        self.next = class.superclass;
        Some(class)
    }
}
