//! VM configuration and state shared by every thread
//!
//! All interpreters of one VM hold an `Arc<VmShared>`: the class registry,
//! the thread scheduler and the top-level `main` object are process-wide.

use crate::class::{ids, ClassRegistry};
use crate::object::{InstanceObject, ObjectKind};
use crate::scheduler::Scheduler;
use crate::stack::DEFAULT_MAX_STACK_SIZE;
use crate::value::Value;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;

/// VM construction options
#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Maximum number of nested call frames per thread
    pub max_call_depth: usize,

    /// Maximum operand stack slots per thread
    pub max_stack_slots: usize,

    /// Native stack size of spawned language threads, in bytes
    pub thread_stack_size: usize,

    /// Prefix of spawned thread names
    pub thread_name_prefix: String,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
            max_stack_slots: DEFAULT_MAX_STACK_SIZE,
            thread_stack_size: 8 * 1024 * 1024, // 8 MiB
            thread_name_prefix: "garnet".to_string(),
        }
    }
}

impl VmOptions {
    /// Override the frame depth limit
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Override the operand stack size
    pub fn with_stack_size(mut self, slots: usize) -> Self {
        self.max_stack_slots = slots;
        self
    }

    /// Override the native stack size of spawned threads
    pub fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }
}

/// State shared across all interpreters of a VM
pub(crate) struct VmShared {
    pub(crate) options: VmOptions,
    pub(crate) classes: RwLock<ClassRegistry>,
    pub(crate) scheduler: Scheduler,
    main_object: OnceCell<Value>,
}

impl VmShared {
    pub(crate) fn new(options: VmOptions, classes: ClassRegistry) -> Self {
        let scheduler = Scheduler::new(
            options.thread_name_prefix.clone(),
            options.thread_stack_size,
        );
        Self {
            options,
            classes: RwLock::new(classes),
            scheduler,
            main_object: OnceCell::new(),
        }
    }

    /// The top-level `self`, an instance of Object
    pub(crate) fn main_object(&self) -> &Value {
        self.main_object.get_or_init(|| {
            Value::object(
                ids::OBJECT,
                ObjectKind::Instance(InstanceObject::new(Arc::from("Object"))),
            )
        })
    }
}
