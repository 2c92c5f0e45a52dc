//! Garnet VM Core Runtime
//!
//! This crate provides the virtual machine runtime including:
//! - Bytecode interpreter with explicit call frames
//! - Object model, class registry and method dispatch
//! - Native threads sharing one heap, synchronized through channels
//! - The language-level error model (TypeError, ArgumentError, Error)
//! - Built-in classes and their native methods

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builtin;
pub mod channel;
pub mod class;
pub mod error;
pub mod object;
pub mod scheduler;
pub mod stack;
pub mod value;
pub mod vm;

pub use channel::ChannelObject;
pub use class::{Call, Class, ClassId, ClassRegistry, MethodImpl, NativeFn};
pub use error::ErrorKind;
pub use object::{HeapObject, ObjectKind};
pub use scheduler::{Scheduler, ThreadHandle, ThreadId, ThreadState};
pub use stack::{CallFrame, Stack};
pub use value::Value;
pub use vm::{Environment, Interpreter, Vm, VmOptions};

/// VM execution errors
///
/// `Raised` carries a language-level Error object unwinding through the
/// frame stack. Every other variant is a host fault: the bytecode or the
/// embedder broke an invariant the VM relies on.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// A language Error object is propagating
    #[error("{}", .0.error_message().unwrap_or_default())]
    Raised(Value),

    /// Operand stack exceeded its slot budget
    #[error("Stack overflow")]
    StackOverflow,

    /// Stack underflow
    #[error("Stack underflow")]
    StackUnderflow,

    /// Invalid opcode
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u8),

    /// Malformed instruction stream or operand
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    /// Module failed verification
    #[error("Verification failed: {0}")]
    Verify(#[from] garnet_bytecode::VerifyError),

    /// Module has no entry function
    #[error("Module {0} has no main function")]
    NoEntryPoint(String),

    /// A native thread could not be started
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// Joining a thread that panicked
    #[error("Thread {0} panicked")]
    ThreadPanicked(u64),
}

impl From<garnet_bytecode::DecodeError> for VmError {
    fn from(err: garnet_bytecode::DecodeError) -> Self {
        VmError::InvalidBytecode(err.to_string())
    }
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
