//! Programmatic assembler
//!
//! [`ModuleBuilder`] produces verified modules without a compiler. Function
//! bodies are written through a [`FunctionBuilder`], which interns names into
//! the shared constant pool and resolves forward jumps through [`Label`]s.
//!
//! ```
//! use garnet_bytecode::ModuleBuilder;
//!
//! let mut mb = ModuleBuilder::new("demo");
//! mb.function("main", 0, 0, |f| {
//!     f.put_string("Go");
//!     f.put_string("by");
//!     f.send("+", 1);
//!     f.leave();
//! })
//! .unwrap();
//! let module = mb.finish().unwrap();
//! assert_eq!(module.functions.len(), 1);
//! ```

use crate::constants::ConstantPool;
use crate::encoder::BytecodeWriter;
use crate::module::{ClassDef, Function, Module, NO_BLOCK};
use crate::opcode::Opcode;
use crate::verify::{verify_module, VerifyError};
use std::collections::HashMap;
use thiserror::Error;

/// Assembly errors
#[derive(Debug, Error)]
pub enum AssembleError {
    /// A jump refers to a label that was never bound
    #[error("Label {0} used in {1} but never bound")]
    UnboundLabel(usize, String),

    /// A label was bound twice
    #[error("Label {0} bound twice in {1}")]
    LabelRebound(usize, String),

    /// More functions than a block operand can address
    #[error("Too many functions in module (limit {0})")]
    TooManyFunctions(usize),
}

/// Jump target inside a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Interns strings into a constant pool
#[derive(Debug, Default)]
struct Interner {
    pool: ConstantPool,
    index: HashMap<String, u32>,
}

impl Interner {
    fn intern(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.index.get(value) {
            return index;
        }
        let index = self.pool.add_string(value.to_string());
        self.index.insert(value.to_string(), index);
        index
    }
}

/// Builds a [`Module`] one function and class at a time
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    strings: Interner,
    functions: Vec<Function>,
    classes: Vec<ClassDef>,
}

impl ModuleBuilder {
    /// Start an empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strings: Interner::default(),
            functions: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Intern a string in the constant pool
    pub fn intern(&mut self, value: &str) -> u32 {
        self.strings.intern(value)
    }

    /// Assemble a function body and return its index
    ///
    /// The index doubles as the block operand of `SEND`, so blocks must be
    /// assembled before the functions that pass them.
    pub fn function<F>(
        &mut self,
        name: &str,
        param_count: usize,
        local_count: usize,
        body: F,
    ) -> Result<u16, AssembleError>
    where
        F: FnOnce(&mut FunctionBuilder<'_>),
    {
        let id = self.functions.len();
        if id >= NO_BLOCK as usize {
            return Err(AssembleError::TooManyFunctions(NO_BLOCK as usize));
        }

        let mut fb = FunctionBuilder {
            name,
            strings: &mut self.strings,
            writer: BytecodeWriter::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            rebound: None,
        };
        body(&mut fb);
        let code = fb.resolve()?;

        self.functions.push(Function {
            name: name.to_string(),
            param_count,
            local_count: local_count.max(param_count),
            code,
        });
        Ok(id as u16)
    }

    /// Open (or reopen) a class definition
    pub fn class(&mut self, name: &str, superclass: Option<&str>) -> &mut ClassDef {
        let pos = match self.classes.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.classes
                    .push(ClassDef::new(name, superclass.map(str::to_string)));
                self.classes.len() - 1
            }
        };
        &mut self.classes[pos]
    }

    /// Build the module without verifying it
    pub fn build(self) -> Module {
        let mut module = Module::new(self.name);
        module.constants = self.strings.pool;
        module.functions = self.functions;
        module.classes = self.classes;
        module
    }

    /// Build and verify the module
    pub fn finish(self) -> Result<Module, VerifyError> {
        let module = self.build();
        verify_module(&module)?;
        Ok(module)
    }
}

/// Emits the instructions of one function body
pub struct FunctionBuilder<'a> {
    name: &'a str,
    strings: &'a mut Interner,
    writer: BytecodeWriter,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
    rebound: Option<Label>,
}

impl FunctionBuilder<'_> {
    /// Current byte offset
    pub fn offset(&self) -> usize {
        self.writer.offset()
    }

    /// Raw opcode without operands
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.writer.emit_opcode(opcode);
        self
    }

    /// Discard the top of stack
    pub fn pop(&mut self) -> &mut Self {
        self.op(Opcode::Pop)
    }

    /// Duplicate the top of stack
    pub fn dup(&mut self) -> &mut Self {
        self.op(Opcode::Dup)
    }

    /// Push nil
    pub fn put_nil(&mut self) -> &mut Self {
        self.op(Opcode::PutNil)
    }

    /// Push a boolean
    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.op(if value { Opcode::PutTrue } else { Opcode::PutFalse })
    }

    /// Push an Integer
    pub fn put_int(&mut self, value: i64) -> &mut Self {
        self.writer.emit_put_int(value);
        self
    }

    /// Push a Float
    pub fn put_float(&mut self, value: f64) -> &mut Self {
        self.writer.emit_put_float(value);
        self
    }

    /// Push a new String
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        let index = self.strings.intern(value);
        self.writer.emit_put_string(index);
        self
    }

    /// Push `self`
    pub fn put_self(&mut self) -> &mut Self {
        self.op(Opcode::PutSelf)
    }

    /// Push local `index` of the scope `depth` levels out
    pub fn get_local(&mut self, depth: u8, index: u16) -> &mut Self {
        self.writer.emit_local(Opcode::GetLocal, depth, index);
        self
    }

    /// Pop into local `index` of the scope `depth` levels out
    pub fn set_local(&mut self, depth: u8, index: u16) -> &mut Self {
        self.writer.emit_local(Opcode::SetLocal, depth, index);
        self
    }

    /// Push instance variable `name` of `self`
    pub fn get_ivar(&mut self, name: &str) -> &mut Self {
        let index = self.strings.intern(name);
        self.writer.emit_named(Opcode::GetIvar, index);
        self
    }

    /// Pop into instance variable `name` of `self`
    pub fn set_ivar(&mut self, name: &str) -> &mut Self {
        let index = self.strings.intern(name);
        self.writer.emit_named(Opcode::SetIvar, index);
        self
    }

    /// Push the class named `name`
    pub fn get_constant(&mut self, name: &str) -> &mut Self {
        let index = self.strings.intern(name);
        self.writer.emit_named(Opcode::GetConstant, index);
        self
    }

    /// Collect the top `count` values into an Array
    pub fn new_array(&mut self, count: u16) -> &mut Self {
        self.writer.emit_counted(Opcode::NewArray, count);
        self
    }

    /// Collect the top `pairs` key/value pairs into a Hash
    pub fn new_hash(&mut self, pairs: u16) -> &mut Self {
        self.writer.emit_counted(Opcode::NewHash, pairs);
        self
    }

    /// Build a Range from the top two values
    pub fn new_range(&mut self) -> &mut Self {
        self.op(Opcode::NewRange)
    }

    /// Send `name` to the receiver below `argc` arguments
    pub fn send(&mut self, name: &str, argc: u8) -> &mut Self {
        let index = self.strings.intern(name);
        self.writer.emit_send(index, argc, NO_BLOCK);
        self
    }

    /// Send `name` passing function `block` as the block
    pub fn send_with_block(&mut self, name: &str, argc: u8, block: u16) -> &mut Self {
        let index = self.strings.intern(name);
        self.writer.emit_send(index, argc, block);
        self
    }

    /// Call the current frame's block
    pub fn invoke_block(&mut self, argc: u8) -> &mut Self {
        self.writer.emit_invoke_block(argc);
        self
    }

    /// Return the top of stack
    pub fn leave(&mut self) -> &mut Self {
        self.op(Opcode::Leave)
    }

    // ===== Labels =====

    /// Allocate an unbound label
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the current offset
    pub fn bind(&mut self, label: Label) -> &mut Self {
        if self.labels[label.0].is_some() {
            self.rebound.get_or_insert(label);
        }
        self.labels[label.0] = Some(self.writer.offset());
        self
    }

    /// Unconditional jump
    pub fn jump(&mut self, label: Label) -> &mut Self {
        self.jump_op(Opcode::Jump, label)
    }

    /// Pop and jump when falsy
    pub fn jump_if_false(&mut self, label: Label) -> &mut Self {
        self.jump_op(Opcode::JumpIfFalse, label)
    }

    /// Pop and jump when truthy
    pub fn jump_if_true(&mut self, label: Label) -> &mut Self {
        self.jump_op(Opcode::JumpIfTrue, label)
    }

    fn jump_op(&mut self, opcode: Opcode, label: Label) -> &mut Self {
        let at = self.writer.emit_jump_placeholder(opcode);
        self.fixups.push((at, label));
        self
    }

    fn resolve(mut self) -> Result<Vec<u8>, AssembleError> {
        if let Some(label) = self.rebound {
            return Err(AssembleError::LabelRebound(label.0, self.name.to_string()));
        }
        for (at, label) in std::mem::take(&mut self.fixups) {
            let target = self.labels[label.0]
                .ok_or_else(|| AssembleError::UnboundLabel(label.0, self.name.to_string()))?;
            self.writer
                .patch_i32(at, target as i32 - (at as i32 + 4));
        }
        Ok(self.writer.into_bytes())
    }
}
