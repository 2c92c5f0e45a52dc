//! Bytecode verification
//!
//! Checks that every function decodes into whole instructions, that jumps
//! land on instruction boundaries, that constant, local and block operands
//! refer to existing entries, that control cannot run off the end of a body,
//! and that the operand stack height agrees wherever control flow merges.

use crate::encoder::BytecodeReader;
use crate::module::{Function, Module, ModuleError, NO_BLOCK};
use crate::opcode::Opcode;
use std::collections::HashMap;

/// Bytecode verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset} in {function}")]
    InvalidOpcode {
        /// Function name
        function: String,
        /// Offending byte
        opcode: u8,
        /// Byte offset
        offset: usize,
    },

    /// Operands run past the end of the body
    #[error("Truncated instruction at offset {offset} in {function}")]
    Truncated {
        /// Function name
        function: String,
        /// Byte offset
        offset: usize,
    },

    /// Invalid jump target
    #[error("Invalid jump target {target} at offset {offset} in {function}")]
    InvalidJumpTarget {
        /// Function name
        function: String,
        /// Computed target
        target: i64,
        /// Offset of the jump
        offset: usize,
    },

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference: index {index} at offset {offset} in {function}")]
    InvalidConstantRef {
        /// Function name
        function: String,
        /// Referenced index
        index: u32,
        /// Byte offset
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset} in {function}")]
    InvalidLocalRef {
        /// Function name
        function: String,
        /// Referenced slot
        index: usize,
        /// Number of slots in the frame
        max: usize,
        /// Byte offset
        offset: usize,
    },

    /// Block operand names a missing function
    #[error("Invalid block function {index} at offset {offset} in {function}")]
    InvalidBlockRef {
        /// Function name
        function: String,
        /// Referenced function
        index: u16,
        /// Byte offset
        offset: usize,
    },

    /// Instruction pops more than the stack holds
    #[error("Stack underflow at offset {offset} in {function}")]
    StackUnderflow {
        /// Function name
        function: String,
        /// Byte offset
        offset: usize,
    },

    /// Two paths reach an instruction with different stack heights
    #[error("Stack height mismatch at offset {offset} in {function}: {left} vs {right}")]
    StackMismatch {
        /// Function name
        function: String,
        /// Byte offset
        offset: usize,
        /// Height recorded first
        left: i32,
        /// Height seen on another path
        right: i32,
    },

    /// Execution falls off end
    #[error("Execution falls off end of {function} at offset {offset}")]
    FallOffEnd {
        /// Function name
        function: String,
        /// Offset of the last instruction
        offset: usize,
    },

    /// Parameter count exceeds local count
    #[error("Function {function} declares {params} parameters but only {locals} locals")]
    BadFrameLayout {
        /// Function name
        function: String,
        /// Declared parameters
        params: usize,
        /// Declared locals
        locals: usize,
    },

    /// Module validation error
    #[error("Module validation error: {0}")]
    Module(#[from] ModuleError),
}

/// Verify a module's bytecode
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    module.validate()?;

    for function in &module.functions {
        verify_function(function, module)?;
    }

    Ok(())
}

/// Decoded instruction
#[derive(Debug, Clone)]
struct Instruction {
    offset: usize,
    opcode: Opcode,
    operands: Vec<u8>,
}

impl Instruction {
    fn end(&self) -> usize {
        self.offset + 1 + self.operands.len()
    }

    fn u8_at(&self, at: usize) -> u8 {
        self.operands[at]
    }

    fn u16_at(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.operands[at], self.operands[at + 1]])
    }

    fn u32_at(&self, at: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.operands[at..at + 4]);
        u32::from_le_bytes(bytes)
    }

    fn jump_target(&self) -> i64 {
        self.end() as i64 + self.u32_at(0) as i32 as i64
    }

    /// Stack effect (pops, pushes)
    fn stack_effect(&self) -> (i32, i32) {
        match self.opcode {
            Opcode::Nop => (0, 0),
            Opcode::Pop => (1, 0),
            Opcode::Dup => (1, 2),
            Opcode::Swap => (2, 2),
            Opcode::PutNil
            | Opcode::PutTrue
            | Opcode::PutFalse
            | Opcode::PutInt
            | Opcode::PutFloat
            | Opcode::PutString
            | Opcode::PutSelf
            | Opcode::GetLocal
            | Opcode::GetIvar
            | Opcode::GetConstant => (0, 1),
            Opcode::SetLocal | Opcode::SetIvar => (1, 0),
            Opcode::NewArray => (self.u16_at(0) as i32, 1),
            Opcode::NewHash => (self.u16_at(0) as i32 * 2, 1),
            Opcode::NewRange => (2, 1),
            Opcode::Jump => (0, 0),
            Opcode::JumpIfFalse | Opcode::JumpIfTrue => (1, 0),
            Opcode::Send => (self.u8_at(4) as i32 + 1, 1),
            Opcode::InvokeBlock => (self.u8_at(0) as i32, 1),
            Opcode::Leave => (1, 0),
        }
    }
}

fn verify_function(function: &Function, module: &Module) -> Result<(), VerifyError> {
    let name = || function.name.clone();

    if function.param_count > function.local_count {
        return Err(VerifyError::BadFrameLayout {
            function: name(),
            params: function.param_count,
            locals: function.local_count,
        });
    }

    let instructions = parse_instructions(function)?;
    let Some(last) = instructions.last() else {
        return Err(VerifyError::FallOffEnd {
            function: name(),
            offset: 0,
        });
    };
    if !last.opcode.is_terminator() {
        return Err(VerifyError::FallOffEnd {
            function: name(),
            offset: last.offset,
        });
    }

    let index_of: HashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.offset, i))
        .collect();

    for instr in &instructions {
        verify_operands(instr, function, module, &index_of)?;
    }

    verify_stack_heights(function, &instructions, &index_of)
}

fn parse_instructions(function: &Function) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(&function.code);

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader.read_u8().map_err(|_| VerifyError::Truncated {
            function: function.name.clone(),
            offset,
        })?;
        let opcode = Opcode::from_u8(byte).ok_or_else(|| VerifyError::InvalidOpcode {
            function: function.name.clone(),
            opcode: byte,
            offset,
        })?;
        let operands = reader
            .read_bytes(opcode.operand_size())
            .map_err(|_| VerifyError::Truncated {
                function: function.name.clone(),
                offset,
            })?;

        instructions.push(Instruction {
            offset,
            opcode,
            operands,
        });
    }

    Ok(instructions)
}

fn verify_operands(
    instr: &Instruction,
    function: &Function,
    module: &Module,
    index_of: &HashMap<usize, usize>,
) -> Result<(), VerifyError> {
    if instr.opcode.references_constant() {
        let index = instr.u32_at(0);
        if module.constants.get_string(index).is_none() {
            return Err(VerifyError::InvalidConstantRef {
                function: function.name.clone(),
                index,
                offset: instr.offset,
            });
        }
    }

    match instr.opcode {
        Opcode::GetLocal | Opcode::SetLocal => {
            // Outer scopes belong to other functions; only depth 0 is checkable here
            let index = instr.u16_at(1) as usize;
            if instr.u8_at(0) == 0 && index >= function.local_count {
                return Err(VerifyError::InvalidLocalRef {
                    function: function.name.clone(),
                    index,
                    max: function.local_count,
                    offset: instr.offset,
                });
            }
        }
        Opcode::Send => {
            let block = instr.u16_at(5);
            if block != NO_BLOCK && block as usize >= module.functions.len() {
                return Err(VerifyError::InvalidBlockRef {
                    function: function.name.clone(),
                    index: block,
                    offset: instr.offset,
                });
            }
        }
        op if op.is_jump() => {
            let target = instr.jump_target();
            let valid = usize::try_from(target)
                .map(|t| index_of.contains_key(&t))
                .unwrap_or(false);
            if !valid {
                return Err(VerifyError::InvalidJumpTarget {
                    function: function.name.clone(),
                    target,
                    offset: instr.offset,
                });
            }
        }
        _ => {}
    }

    Ok(())
}

/// Propagate stack heights along every control-flow edge
fn verify_stack_heights(
    function: &Function,
    instructions: &[Instruction],
    index_of: &HashMap<usize, usize>,
) -> Result<(), VerifyError> {
    let mut heights: Vec<Option<i32>> = vec![None; instructions.len()];
    let mut worklist = vec![(0usize, 0i32)];

    while let Some((index, height)) = worklist.pop() {
        let instr = &instructions[index];
        match heights[index] {
            Some(seen) if seen == height => continue,
            Some(seen) => {
                return Err(VerifyError::StackMismatch {
                    function: function.name.clone(),
                    offset: instr.offset,
                    left: seen,
                    right: height,
                })
            }
            None => heights[index] = Some(height),
        }

        let (pops, pushes) = instr.stack_effect();
        if height < pops {
            return Err(VerifyError::StackUnderflow {
                function: function.name.clone(),
                offset: instr.offset,
            });
        }
        let next = height - pops + pushes;

        if instr.opcode.is_jump() {
            if let Some(&target) = usize::try_from(instr.jump_target())
                .ok()
                .and_then(|t| index_of.get(&t))
            {
                worklist.push((target, next));
            }
        }
        if !instr.opcode.is_terminator() && index + 1 < instructions.len() {
            worklist.push((index + 1, next));
        }
    }

    Ok(())
}
