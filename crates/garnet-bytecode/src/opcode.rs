//! Bytecode opcodes for the Garnet VM
//!
//! Every instruction is a single opcode byte followed by a fixed number of
//! operand bytes (see [`Opcode::operand_size`]). Multi-byte operands are
//! little-endian.
//!
//! Opcodes are organized into categories:
//! - 0x00-0x0F: Stack manipulation & literals
//! - 0x10-0x1F: Variables (locals, instance variables, constants)
//! - 0x20-0x2F: Container construction
//! - 0x30-0x3F: Control flow
//! - 0x40-0x4F: Method dispatch & blocks

/// Bytecode opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Literals (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,
    /// Swap top two stack values
    Swap = 0x03,
    /// Push nil
    PutNil = 0x04,
    /// Push true
    PutTrue = 0x05,
    /// Push false
    PutFalse = 0x06,
    /// Push an Integer (operand: i64)
    PutInt = 0x07,
    /// Push a Float (operand: f64)
    PutFloat = 0x08,
    /// Push a fresh String copied from the constant pool (operand: u32 index)
    PutString = 0x09,
    /// Push the current frame's `self`
    PutSelf = 0x0A,

    // ===== Variables (0x10-0x1F) =====
    /// Push a local (operands: u8 scope depth, u16 slot)
    GetLocal = 0x10,
    /// Pop into a local (operands: u8 scope depth, u16 slot)
    SetLocal = 0x11,
    /// Push an instance variable of `self` (operand: u32 name index)
    GetIvar = 0x12,
    /// Pop into an instance variable of `self` (operand: u32 name index)
    SetIvar = 0x13,
    /// Push the class registered under a name (operand: u32 name index)
    GetConstant = 0x14,

    // ===== Containers (0x20-0x2F) =====
    /// Pop N values into a new Array (operand: u16 count)
    NewArray = 0x20,
    /// Pop N key/value pairs into a new Hash (operand: u16 pair count)
    NewHash = 0x21,
    /// Pop `to` then `from` into a new Range
    NewRange = 0x22,

    // ===== Control Flow (0x30-0x3F) =====
    /// Unconditional jump (operand: i32 offset from the next instruction)
    Jump = 0x30,
    /// Pop; jump when falsy (operand: i32 offset)
    JumpIfFalse = 0x31,
    /// Pop; jump when truthy (operand: i32 offset)
    JumpIfTrue = 0x32,

    // ===== Dispatch (0x40-0x4F) =====
    /// Send a message (operands: u32 name index, u8 argc, u16 block function
    /// or [`crate::NO_BLOCK`])
    Send = 0x40,
    /// Call the block passed to the current frame (operand: u8 argc)
    InvokeBlock = 0x41,
    /// Pop the return value and leave the current frame
    Leave = 0x42,
}

impl Opcode {
    /// Convert byte to opcode
    ///
    /// Returns None if the byte does not correspond to a valid opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x03 => Some(Self::Swap),
            0x04 => Some(Self::PutNil),
            0x05 => Some(Self::PutTrue),
            0x06 => Some(Self::PutFalse),
            0x07 => Some(Self::PutInt),
            0x08 => Some(Self::PutFloat),
            0x09 => Some(Self::PutString),
            0x0A => Some(Self::PutSelf),

            0x10 => Some(Self::GetLocal),
            0x11 => Some(Self::SetLocal),
            0x12 => Some(Self::GetIvar),
            0x13 => Some(Self::SetIvar),
            0x14 => Some(Self::GetConstant),

            0x20 => Some(Self::NewArray),
            0x21 => Some(Self::NewHash),
            0x22 => Some(Self::NewRange),

            0x30 => Some(Self::Jump),
            0x31 => Some(Self::JumpIfFalse),
            0x32 => Some(Self::JumpIfTrue),

            0x40 => Some(Self::Send),
            0x41 => Some(Self::InvokeBlock),
            0x42 => Some(Self::Leave),

            _ => None,
        }
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the mnemonic of this opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::Swap => "SWAP",
            Self::PutNil => "PUT_NIL",
            Self::PutTrue => "PUT_TRUE",
            Self::PutFalse => "PUT_FALSE",
            Self::PutInt => "PUT_INT",
            Self::PutFloat => "PUT_FLOAT",
            Self::PutString => "PUT_STRING",
            Self::PutSelf => "PUT_SELF",
            Self::GetLocal => "GET_LOCAL",
            Self::SetLocal => "SET_LOCAL",
            Self::GetIvar => "GET_IVAR",
            Self::SetIvar => "SET_IVAR",
            Self::GetConstant => "GET_CONSTANT",
            Self::NewArray => "NEW_ARRAY",
            Self::NewHash => "NEW_HASH",
            Self::NewRange => "NEW_RANGE",
            Self::Jump => "JUMP",
            Self::JumpIfFalse => "JUMP_IF_FALSE",
            Self::JumpIfTrue => "JUMP_IF_TRUE",
            Self::Send => "SEND",
            Self::InvokeBlock => "INVOKE_BLOCK",
            Self::Leave => "LEAVE",
        }
    }

    /// Number of operand bytes following the opcode byte
    pub fn operand_size(self) -> usize {
        match self {
            Self::Nop
            | Self::Pop
            | Self::Dup
            | Self::Swap
            | Self::PutNil
            | Self::PutTrue
            | Self::PutFalse
            | Self::PutSelf
            | Self::NewRange
            | Self::Leave => 0,

            Self::InvokeBlock => 1,
            Self::NewArray | Self::NewHash => 2,
            Self::GetLocal | Self::SetLocal => 3,

            Self::PutString
            | Self::GetIvar
            | Self::SetIvar
            | Self::GetConstant
            | Self::Jump
            | Self::JumpIfFalse
            | Self::JumpIfTrue => 4,

            // u32 name + u8 argc + u16 block
            Self::Send => 7,

            Self::PutInt | Self::PutFloat => 8,
        }
    }

    /// Check if this opcode is a jump instruction
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue)
    }

    /// Check if control never falls through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Jump | Self::Leave)
    }

    /// Check if the first operand is a constant pool string index
    pub fn references_constant(self) -> bool {
        matches!(
            self,
            Self::PutString | Self::GetIvar | Self::SetIvar | Self::GetConstant | Self::Send
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 25] = [
        Opcode::Nop,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Swap,
        Opcode::PutNil,
        Opcode::PutTrue,
        Opcode::PutFalse,
        Opcode::PutInt,
        Opcode::PutFloat,
        Opcode::PutString,
        Opcode::PutSelf,
        Opcode::GetLocal,
        Opcode::SetLocal,
        Opcode::GetIvar,
        Opcode::SetIvar,
        Opcode::GetConstant,
        Opcode::NewArray,
        Opcode::NewHash,
        Opcode::NewRange,
        Opcode::Jump,
        Opcode::JumpIfFalse,
        Opcode::JumpIfTrue,
        Opcode::Send,
        Opcode::InvokeBlock,
        Opcode::Leave,
    ];

    #[test]
    fn test_opcode_roundtrip() {
        for opcode in ALL {
            assert_eq!(Opcode::from_u8(opcode.to_u8()), Some(opcode), "{:?}", opcode);
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0x0B), None);
        assert_eq!(Opcode::from_u8(0x43), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::Nop.name(), "NOP");
        assert_eq!(Opcode::PutString.name(), "PUT_STRING");
        assert_eq!(Opcode::Send.name(), "SEND");
        assert_eq!(Opcode::Leave.name(), "LEAVE");
    }

    #[test]
    fn test_terminator_detection() {
        assert!(Opcode::Jump.is_terminator());
        assert!(Opcode::Leave.is_terminator());
        assert!(!Opcode::JumpIfFalse.is_terminator());
        assert!(!Opcode::Send.is_terminator());
    }

    #[test]
    fn test_operand_sizes() {
        assert_eq!(Opcode::Send.operand_size(), 7);
        assert_eq!(Opcode::GetLocal.operand_size(), 3);
        assert_eq!(Opcode::PutInt.operand_size(), 8);
        assert_eq!(Opcode::Leave.operand_size(), 0);
    }
}
