//! Virtual machine execution and shared state

mod context;
mod environment;
mod interpreter;

pub use context::VmOptions;
pub(crate) use context::VmShared;
pub use environment::Environment;
pub use interpreter::Interpreter;

use crate::builtin;
use crate::class::{ids, ClassId, ClassRegistry, MethodImpl, NativeFn};
use crate::scheduler::{Scheduler, ThreadId};
use crate::value::Value;
use crate::{VmError, VmResult};
use garnet_bytecode::{verify_module, Module};
use parking_lot::RwLockReadGuard;
use std::sync::Arc;

/// Garnet virtual machine
///
/// Owns the class registry and the thread scheduler. [`Vm::run`] executes a
/// module's `main` function on the calling thread; threads spawned by the
/// program keep running after `run` returns unless joined through
/// [`Vm::scheduler`].
pub struct Vm {
    shared: Arc<VmShared>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmOptions::default())
    }
}

impl Vm {
    /// Create a VM with the built-in classes installed
    pub fn new(options: VmOptions) -> Self {
        let mut classes = ClassRegistry::new();
        builtin::install(&mut classes);
        log::debug!(
            "vm created: {} classes, max call depth {}",
            classes.len(),
            options.max_call_depth
        );
        Self {
            shared: Arc::new(VmShared::new(options, classes)),
        }
    }

    /// Options this VM was created with
    pub fn options(&self) -> &VmOptions {
        &self.shared.options
    }

    /// Read access to the class registry
    pub fn classes(&self) -> RwLockReadGuard<'_, ClassRegistry> {
        self.shared.classes.read()
    }

    /// Thread registry
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// The top-level `main` object
    pub fn main_object(&self) -> Value {
        self.shared.main_object().clone()
    }

    /// Register a native instance method
    pub fn define_native(&self, class: ClassId, name: &str, f: NativeFn) {
        self.shared.classes.write().define_native(class, name, f);
    }

    /// Verify a module and register its classes and methods
    pub fn load(&self, module: &Arc<Module>) -> VmResult<()> {
        verify_module(module)?;

        let mut classes = self.shared.classes.write();
        for def in &module.classes {
            let superclass = match &def.superclass {
                Some(name) => classes.class_id(name).ok_or_else(|| {
                    VmError::InvalidBytecode(format!(
                        "unknown superclass {} of {}",
                        name, def.name
                    ))
                })?,
                None => ids::OBJECT,
            };
            let id = classes.register_class(&def.name, Some(superclass));
            for method in &def.methods {
                classes.define_method(id, &method.name, compiled(module, method.function_id));
            }
            for method in &def.class_methods {
                classes.define_class_method(
                    id,
                    &method.name,
                    compiled(module, method.function_id),
                );
            }
        }
        log::debug!(
            "loaded module {} ({} functions, {} classes)",
            module.metadata.name,
            module.functions.len(),
            module.classes.len()
        );
        Ok(())
    }

    /// Load `module` and run its `main` function
    ///
    /// An Error raised by the program and not rescued becomes the result
    /// value; only host faults (bad bytecode, failed verification) are
    /// returned as `Err`.
    pub fn run(&self, module: &Module) -> VmResult<Value> {
        let module = Arc::new(module.clone());
        self.load(&module)?;

        let main = module
            .function_index("main")
            .ok_or_else(|| VmError::NoEntryPoint(module.metadata.name.clone()))?;

        let mut interpreter = Interpreter::new(self.shared.clone(), ThreadId::MAIN);
        match interpreter.run_function(module, main, self.main_object()) {
            Err(VmError::Raised(error)) => {
                log::debug!("program ended with {}", error.to_s());
                Ok(error)
            }
            other => other,
        }
    }

    /// An interpreter on the main thread, for calling into loaded code
    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new(self.shared.clone(), ThreadId::MAIN)
    }
}

fn compiled(module: &Arc<Module>, function_id: usize) -> MethodImpl {
    MethodImpl::Compiled {
        module: module.clone(),
        function_id,
    }
}
