//! Garnet VM Bytecode Definitions
//!
//! This crate provides the instruction set, the module container handed to the
//! VM by a compiler, a verifier, and a small
//! assembler used by embedders and tests to produce modules without a
//! compiler.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod constants;
pub mod encoder;
pub mod module;
pub mod opcode;
pub mod verify;

pub use builder::{AssembleError, FunctionBuilder, Label, ModuleBuilder};
pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use module::{ClassDef, Function, Metadata, Method, Module, ModuleError, NO_BLOCK};
pub use opcode::Opcode;
pub use verify::{verify_module, VerifyError};
