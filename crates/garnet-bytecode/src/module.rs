//! Bytecode module
//!
//! A [`Module`] is what a compiler hands to the VM: the constant pool, every
//! function body (methods, blocks and the `main` entry), and the class
//! definitions that bind method names to function bodies. Modules are
//! in-memory values only; the VM never reads or writes them as files.

use crate::constants::ConstantPool;
use thiserror::Error;

/// Block operand of `SEND` meaning "no block attached"
pub const NO_BLOCK: u16 = u16::MAX;

/// Structural problems found by [`Module::validate`]
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A class binds a method to a function the module does not contain
    #[error("Method {class}#{method} refers to missing function {function_id}")]
    MissingFunction {
        /// Class holding the binding
        class: String,
        /// Bound method name
        method: String,
        /// Function index that does not exist
        function_id: usize,
    },
}

/// A compiled Garnet module
#[derive(Debug, Clone)]
pub struct Module {
    /// Constant pool
    pub constants: ConstantPool,
    /// Function definitions
    pub functions: Vec<Function>,
    /// Class definitions
    pub classes: Vec<ClassDef>,
    /// Module metadata
    pub metadata: Metadata,
}

/// Function body: a method, a block, or the entry point
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Number of parameters (bound to the first locals)
    pub param_count: usize,
    /// Number of local slots, parameters included
    pub local_count: usize,
    /// Bytecode instructions
    pub code: Vec<u8>,
}

/// Class definition
///
/// Loading a module whose class name is already registered reopens that
/// class and adds the listed methods to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name
    pub name: String,
    /// Superclass name (`None` means `Object`)
    pub superclass: Option<String>,
    /// Instance methods
    pub methods: Vec<Method>,
    /// Class-side (singleton) methods
    pub class_methods: Vec<Method>,
}

impl ClassDef {
    /// Create an empty class definition
    pub fn new(name: impl Into<String>, superclass: Option<String>) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods: Vec::new(),
            class_methods: Vec::new(),
        }
    }

    /// Bind an instance method name to a function
    pub fn method(&mut self, name: impl Into<String>, function_id: usize) -> &mut Self {
        self.methods.push(Method {
            name: name.into(),
            function_id,
        });
        self
    }

    /// Bind a class-side method name to a function
    pub fn class_method(&mut self, name: impl Into<String>, function_id: usize) -> &mut Self {
        self.class_methods.push(Method {
            name: name.into(),
            function_id,
        });
        self
    }
}

/// Method binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Function ID in the module
    pub function_id: usize,
}

/// Module metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Module name
    pub name: String,
}

impl Module {
    /// Create a new empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            constants: ConstantPool::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            metadata: Metadata { name: name.into() },
        }
    }

    /// Check cross-references between the class and function tables
    pub fn validate(&self) -> Result<(), ModuleError> {
        for class in &self.classes {
            for method in class.methods.iter().chain(&class.class_methods) {
                if method.function_id >= self.functions.len() {
                    return Err(ModuleError::MissingFunction {
                        class: class.name.clone(),
                        method: method.name.clone(),
                        function_id: method.function_id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Index of the function named `name`
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave_nil() -> Vec<u8> {
        vec![crate::Opcode::PutNil.to_u8(), crate::Opcode::Leave.to_u8()]
    }

    #[test]
    fn test_module_creation() {
        let module = Module::new("test");
        assert_eq!(module.metadata.name, "test");
        assert!(module.functions.is_empty());
        assert!(module.validate().is_ok());
    }

    #[test]
    fn test_class_bindings_resolve_to_functions() {
        let mut module = Module::new("shapes");
        module.functions.push(Function {
            name: "bar".to_string(),
            param_count: 0,
            local_count: 0,
            code: leave_nil(),
        });
        let mut class = ClassDef::new("Foo", Some("Object".to_string()));
        class.method("bar", 0).class_method("build", 0);
        module.classes.push(class);

        assert!(module.validate().is_ok());
        assert_eq!(module.function_index("bar"), Some(0));
        assert_eq!(module.function_index("main"), None);
        assert_eq!(module.classes[0].class_methods[0].name, "build");
    }

    #[test]
    fn test_validate_rejects_dangling_method() {
        let mut module = Module::new("test");
        let mut class = ClassDef::new("Foo", None);
        class.method("bar", 3);
        module.classes.push(class);

        assert!(matches!(
            module.validate(),
            Err(ModuleError::MissingFunction { function_id: 3, .. })
        ));
    }
}
