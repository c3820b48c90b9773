//! # Debug
//!
//! A module which represents the debugging utilities for the virtual machine.
//! This is a read-only formatter over `Chunk`: it never mutates state, and
//! is only exercised on the hot path when a `debug_*` feature is enabled.

use crate::chunk::{Chunk, OpCode};

pub trait Debug {
  /// Disassemble the given chunk.
  fn disassemble(&self, name: &str);

  /// Disassemble the given instruction.
  fn disassemble_instruction(&self, offset: usize) -> usize;

  /// Print a simple (operand-less) instruction.
  fn simple_instruction(&self, name: &str, offset: usize) -> usize;

  /// Print an instruction with a one-byte constant-pool operand.
  fn constant_instruction(&self, name: &str, offset: usize) -> usize;

  /// Print an instruction with a one-byte stack-slot/argc operand.
  fn byte_instruction(&self, name: &str, offset: usize) -> usize;

  /// Print a jump/loop instruction with a two-byte offset operand.
  fn jump_instruction(&self, name: &str, sign: isize, offset: usize) -> usize;

  /// Get the line number of the given offset.
  fn line_number(&self, offset: usize) -> usize;
}

impl Debug for Chunk {
  /// Disassemble the given chunk.
  fn disassemble(&self, name: &str) {
    println!("== {} ==", name);

    let mut offset = 0;
    while offset < self.code.len() {
      offset = self.disassemble_instruction(offset);
    }
  }

  /// Disassemble the given instruction.
  fn disassemble_instruction(&self, offset: usize) -> usize {
    print!("{:04} ", offset);

    if offset > 0 && self.line_number(offset) == self.line_number(offset - 1) {
      print!("   | ");
    } else {
      print!("{:4} ", self.line_number(offset));
    }

    let instruction = self.code[offset];
    match OpCode::from(instruction) {
      OpCode::Constant => self.constant_instruction("OP_CONSTANT", offset),
      OpCode::ConstantLong => self.constant_long_instruction(offset),
      OpCode::Nil => self.simple_instruction("OP_NIL", offset),
      OpCode::True => self.simple_instruction("OP_TRUE", offset),
      OpCode::False => self.simple_instruction("OP_FALSE", offset),
      OpCode::Pop => self.simple_instruction("OP_POP", offset),
      OpCode::GetLocal => self.byte_instruction("OP_GET_LOCAL", offset),
      OpCode::SetLocal => self.byte_instruction("OP_SET_LOCAL", offset),
      OpCode::GetGlobal => self.constant_instruction("OP_GET_GLOBAL", offset),
      OpCode::DefineGlobal => self.constant_instruction("OP_DEFINE_GLOBAL", offset),
      OpCode::SetGlobal => self.constant_instruction("OP_SET_GLOBAL", offset),
      OpCode::Equal => self.simple_instruction("OP_EQUAL", offset),
      OpCode::Greater => self.simple_instruction("OP_GREATER", offset),
      OpCode::Less => self.simple_instruction("OP_LESS", offset),
      OpCode::Add => self.simple_instruction("OP_ADD", offset),
      OpCode::Subtract => self.simple_instruction("OP_SUBTRACT", offset),
      OpCode::Multiply => self.simple_instruction("OP_MULTIPLY", offset),
      OpCode::Divide => self.simple_instruction("OP_DIVIDE", offset),
      OpCode::Not => self.simple_instruction("OP_NOT", offset),
      OpCode::Negate => self.simple_instruction("OP_NEGATE", offset),
      OpCode::Print => self.simple_instruction("OP_PRINT", offset),
      OpCode::Jump => self.jump_instruction("OP_JUMP", 1, offset),
      OpCode::JumpIfFalse => self.jump_instruction("OP_JUMP_IF_FALSE", 1, offset),
      OpCode::Loop => self.jump_instruction("OP_LOOP", -1, offset),
      OpCode::Call => self.byte_instruction("OP_CALL", offset),
      OpCode::Return => self.simple_instruction("OP_RETURN", offset),
    }
  }

  /// Print a simple instruction.
  fn simple_instruction(&self, name: &str, offset: usize) -> usize {
    println!("{}", name);
    offset + 1
  }

  fn constant_instruction(&self, name: &str, offset: usize) -> usize {
    let constant = self.code[offset + 1];
    println!(
      "{:<16} {:4} '{}'",
      name, constant, self.constants.values[constant as usize]
    );
    offset + 2
  }

  fn byte_instruction(&self, name: &str, offset: usize) -> usize {
    let slot = self.code[offset + 1];
    println!("{:<16} {:4}", name, slot);
    offset + 2
  }

  fn jump_instruction(&self, name: &str, sign: isize, offset: usize) -> usize {
    let jump = u16::from_be_bytes([self.code[offset + 1], self.code[offset + 2]]) as isize;
    let target = offset as isize + 3 + sign * jump;
    println!("{:<16} {:4} -> {}", name, offset, target);
    offset + 3
  }

  /// Get the line number of the given offset.
  fn line_number(&self, offset: usize) -> usize {
    self.lines[offset]
  }
}

impl Chunk {
  fn constant_long_instruction(&self, offset: usize) -> usize {
    let constant = u32::from_be_bytes([
      0,
      self.code[offset + 1],
      self.code[offset + 2],
      self.code[offset + 3],
    ]);
    println!(
      "{:<16} {:4} '{}'",
      "OP_CONSTANT_LONG", constant, self.constants.values[constant as usize]
    );
    offset + 4
  }
}
