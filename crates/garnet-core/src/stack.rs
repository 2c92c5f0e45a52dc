//! Stack and call frame management
//!
//! Each interpreter owns one operand stack and one stack of call frames.
//! A frame remembers where its operand region starts (`base_pointer`); on
//! return or unwind the stack is truncated back to that point so nothing the
//! callee pushed can leak into its caller.
//!
//! # Memory Layout
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ Operands of frame N                 │  ← top
//! ├─────────────────────────────────────┤  ← frames[N].base_pointer
//! │ Operands of frame N-1               │
//! │   ...                               │
//! └─────────────────────────────────────┘
//! ```
//!
//! Locals are not stored here. They live in the frame's [`Environment`] so
//! that blocks created by the frame can capture and mutate them.

use crate::value::Value;
use crate::vm::Environment;
use crate::{VmError, VmResult};
use garnet_bytecode::Module;
use std::sync::Arc;

/// Default maximum stack size (in slots)
pub const DEFAULT_MAX_STACK_SIZE: usize = 1024 * 64;

/// Activation record for one method or block invocation
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Module holding the executing function
    pub module: Arc<Module>,

    /// Function index within the module
    pub function_id: usize,

    /// Instruction pointer (byte offset into the function's code)
    pub ip: usize,

    /// Operand stack depth when the frame was entered
    pub base_pointer: usize,

    /// Local variable scope
    pub env: Arc<Environment>,

    /// Receiver
    pub self_value: Value,

    /// Block passed to this invocation, if any
    pub block: Option<Value>,
}

impl CallFrame {
    /// Create a frame positioned at the start of `function_id`
    pub fn new(
        module: Arc<Module>,
        function_id: usize,
        base_pointer: usize,
        env: Arc<Environment>,
        self_value: Value,
        block: Option<Value>,
    ) -> Self {
        Self {
            module,
            function_id,
            ip: 0,
            base_pointer,
            env,
            self_value,
            block,
        }
    }
}

/// Operand and call frame stack for one interpreter
pub struct Stack {
    /// Operand slots
    slots: Vec<Value>,

    /// Call frames
    frames: Vec<CallFrame>,

    /// Maximum operand slots
    max_size: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Create a new stack with default size
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_STACK_SIZE)
    }

    /// Create a stack with specific capacity
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(256),
            frames: Vec::with_capacity(64),
            max_size,
        }
    }

    // ===== Operand Stack Operations =====

    /// Push a value onto the stack
    ///
    /// # Errors
    ///
    /// Returns `VmError::StackOverflow` if the stack is full.
    #[inline]
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.slots.len() >= self.max_size {
            return Err(VmError::StackOverflow);
        }
        self.slots.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    ///
    /// # Errors
    ///
    /// Returns `VmError::StackUnderflow` if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> VmResult<Value> {
        self.slots.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peek at the top value without popping
    #[inline]
    pub fn peek(&self) -> VmResult<&Value> {
        self.slots.last().ok_or(VmError::StackUnderflow)
    }

    /// Pop the top `n` values, preserving their push order
    pub fn pop_n(&mut self, n: usize) -> VmResult<Vec<Value>> {
        let len = self.slots.len();
        if len < n {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.slots.split_off(len - n))
    }

    /// Swap the top two values
    pub fn swap(&mut self) -> VmResult<()> {
        let len = self.slots.len();
        if len < 2 {
            return Err(VmError::StackUnderflow);
        }
        self.slots.swap(len - 1, len - 2);
        Ok(())
    }

    /// Get current stack depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    // ===== Call Frame Management =====

    /// Push a new call frame
    pub fn push_frame(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    /// Pop the current call frame and discard its operand region
    ///
    /// # Errors
    ///
    /// Returns `VmError::StackUnderflow` if no frame is active.
    pub fn pop_frame(&mut self) -> VmResult<CallFrame> {
        let frame = self.frames.pop().ok_or(VmError::StackUnderflow)?;
        self.slots.truncate(frame.base_pointer);
        Ok(frame)
    }

    /// Get the current call frame
    #[inline]
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Get mutable reference to current call frame
    #[inline]
    pub fn current_frame_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Get the number of active frames
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
