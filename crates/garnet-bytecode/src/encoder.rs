//! Bytecode encoding and decoding utilities

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors that can occur during bytecode decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpected end of bytecode stream
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid opcode
    #[error("Invalid opcode {0} at offset {1}")]
    InvalidOpcode(u8, usize),
}

/// Bytecode writer for encoding instructions
///
/// Provides methods for emitting opcodes and their operands into a binary buffer.
#[derive(Debug, Default)]
pub struct BytecodeWriter {
    buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create a new bytecode writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Get the current bytecode buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the bytecode buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of bytecode)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    // ===== Basic Emission =====

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (little-endian)
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit signed integer (little-endian)
    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit signed integer (little-endian)
    pub fn emit_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit float (little-endian)
    pub fn emit_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an opcode without operands
    pub fn emit_opcode(&mut self, opcode: Opcode) {
        self.emit_u8(opcode.to_u8());
    }

    // ===== Instructions =====

    /// Emit PUT_INT
    pub fn emit_put_int(&mut self, value: i64) {
        self.emit_opcode(Opcode::PutInt);
        self.emit_i64(value);
    }

    /// Emit PUT_FLOAT
    pub fn emit_put_float(&mut self, value: f64) {
        self.emit_opcode(Opcode::PutFloat);
        self.emit_f64(value);
    }

    /// Emit PUT_STRING
    pub fn emit_put_string(&mut self, index: u32) {
        self.emit_opcode(Opcode::PutString);
        self.emit_u32(index);
    }

    /// Emit GET_LOCAL / SET_LOCAL
    pub fn emit_local(&mut self, opcode: Opcode, depth: u8, index: u16) {
        self.emit_opcode(opcode);
        self.emit_u8(depth);
        self.emit_u16(index);
    }

    /// Emit an instruction whose single operand is a constant pool index
    pub fn emit_named(&mut self, opcode: Opcode, name_index: u32) {
        self.emit_opcode(opcode);
        self.emit_u32(name_index);
    }

    /// Emit NEW_ARRAY / NEW_HASH
    pub fn emit_counted(&mut self, opcode: Opcode, count: u16) {
        self.emit_opcode(opcode);
        self.emit_u16(count);
    }

    /// Emit SEND
    pub fn emit_send(&mut self, name_index: u32, argc: u8, block: u16) {
        self.emit_opcode(Opcode::Send);
        self.emit_u32(name_index);
        self.emit_u8(argc);
        self.emit_u16(block);
    }

    /// Emit INVOKE_BLOCK
    pub fn emit_invoke_block(&mut self, argc: u8) {
        self.emit_opcode(Opcode::InvokeBlock);
        self.emit_u8(argc);
    }

    /// Emit a jump with a placeholder offset, returning the operand position
    pub fn emit_jump_placeholder(&mut self, opcode: Opcode) -> usize {
        self.emit_opcode(opcode);
        self.reserve_i32()
    }

    // ===== Patching =====

    /// Reserve 4 bytes and return their offset
    pub fn reserve_i32(&mut self) -> usize {
        let offset = self.offset();
        self.emit_i32(0);
        offset
    }

    /// Overwrite a previously reserved i32
    pub fn patch_i32(&mut self, offset: usize, value: i32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Bytecode reader for decoding instructions
pub struct BytecodeReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a new reader over a byte slice
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Seek to a specific position
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self
            .position
            .checked_add(N)
            .filter(|end| *end <= self.buffer.len())
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..end]);
        self.position = end;
        Ok(bytes)
    }

    // ===== Basic Reading =====

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.take().map(u16::from_le_bytes)
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.take().map(u32::from_le_bytes)
    }

    /// Read a 32-bit signed integer (little-endian)
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.take().map(i32::from_le_bytes)
    }

    /// Read a 64-bit signed integer (little-endian)
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.take().map(i64::from_le_bytes)
    }

    /// Read a 64-bit float (little-endian)
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.take().map(f64::from_le_bytes)
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = self.buffer[self.position..self.position + count].to_vec();
        self.position += count;
        Ok(bytes)
    }

    /// Read an opcode
    pub fn read_opcode(&mut self) -> Result<Opcode, DecodeError> {
        let byte = self.read_u8()?;
        Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte, self.position - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_emission() {
        let mut writer = BytecodeWriter::new();
        writer.emit_u8(0x42);
        writer.emit_u16(0x1234);
        writer.emit_u32(0xABCD_EF01);

        let bytes = writer.buffer();
        assert_eq!(bytes[0], 0x42);
        assert_eq!(bytes[1], 0x34); // Little-endian
        assert_eq!(bytes[2], 0x12);
        assert_eq!(bytes[3], 0x01);
        assert_eq!(bytes[6], 0xAB);
    }

    #[test]
    fn test_send_layout() {
        let mut writer = BytecodeWriter::new();
        writer.emit_send(7, 2, 0x0102);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.read_opcode().unwrap(), Opcode::Send);
        assert_eq!(reader.read_u32().unwrap(), 7);
        assert_eq!(reader.read_u8().unwrap(), 2);
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert!(!reader.has_more());
        assert_eq!(writer.offset(), 1 + Opcode::Send.operand_size());
    }

    #[test]
    fn test_jump_patching() {
        let mut writer = BytecodeWriter::new();
        let patch_offset = writer.emit_jump_placeholder(Opcode::JumpIfFalse);
        writer.emit_put_int(42);

        let jump_offset = writer.offset() as i32 - (patch_offset as i32 + 4);
        writer.patch_i32(patch_offset, jump_offset);

        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(reader.read_opcode().unwrap(), Opcode::JumpIfFalse);
        assert_eq!(reader.read_i32().unwrap(), 9);
    }

    #[test]
    fn test_reader_bounds_checking() {
        let bytes = vec![0x01, 0x02];
        let mut reader = BytecodeReader::new(&bytes);

        assert!(reader.read_u32().is_err());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u8().unwrap(), 0x02);
        assert!(matches!(reader.read_u8(), Err(DecodeError::UnexpectedEnd(2))));
    }

    #[test]
    fn test_reader_invalid_opcode() {
        let bytes = vec![0xFF];
        let mut reader = BytecodeReader::new(&bytes);
        assert!(matches!(
            reader.read_opcode(),
            Err(DecodeError::InvalidOpcode(0xFF, 0))
        ));
    }

    #[test]
    fn test_reader_seek() {
        let bytes = vec![0x01, 0x02, 0x03, 0x04];
        let mut reader = BytecodeReader::new(&bytes);

        reader.read_u8().unwrap();
        reader.seek(3);
        assert_eq!(reader.read_u8().unwrap(), 0x04);
    }
}
