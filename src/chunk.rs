//! # Chunk
//!
//! A module which represents a sequence of bytecode,
//! with it's dependent components.

use crate::{utils::Init, value::Value, value::ValueArray};
use enum_repr::EnumFromU8;

/// ## OpCode
///
/// An enum which represents the different opcodes used in the
/// virtual machine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumFromU8)]
pub enum OpCode {
  Constant = 0,
  ConstantLong,
  Nil,
  True,
  False,
  Pop,
  GetLocal,
  SetLocal,
  GetGlobal,
  DefineGlobal,
  SetGlobal,
  Equal,
  Greater,
  Less,
  Add,
  Subtract,
  Multiply,
  Divide,
  Not,
  Negate,
  Print,
  Jump,
  JumpIfFalse,
  Loop,
  Call,
  Return,
}

/// ## Chunk
///
/// A struct which represents a chunk/sequence of bytecode: the opcode
/// stream, a parallel line-number array (one entry per byte, satisfying
/// `code.len() == lines.len()`), and the constant pool it indexes into.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
  pub(crate) code: Vec<u8>,
  pub(crate) lines: Vec<usize>,
  pub(crate) constants: ValueArray,
}

impl Chunk {
  /// Write a byte to the given chunk, tagged with its source line.
  pub fn write_chunk(&mut self, byte: u8, line: usize) {
    self.code.push(byte);
    self.lines.push(line);
  }

  /// Add a constant to the given chunk, then return its index.
  pub fn add_constant(&mut self, value: Value) -> usize {
    self.constants.write(value);
    self.constants.values.len() - 1
  }

  /// Line number of the instruction at the given byte offset.
  pub fn line_of(&self, offset: usize) -> usize {
    self.lines[offset]
  }

  /// Clear the given chunk.
  pub fn clear(&mut self) {
    self.code.clear();
    self.lines.clear();
    self.constants.clear();
  }

  /// Free the chunk's backing storage. Chunks own no heap objects directly
  /// (those live on the VM's intrusive object list); this just drops the
  /// byte/line/constant vectors.
  pub fn free(&mut self) {
    self.clear();
  }
}

impl Init for Chunk {}
