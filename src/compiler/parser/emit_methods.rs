use super::*;

impl<'src, 'vm> Parser<'src, 'vm> {
  /// Emit(pre) jump instructions, and tells `ip`
  /// which instruction to jump to **iff** the condition is false.
  ///
  /// (Jump back, only need to jump ahead over `if` and `condition` statement)
  pub(crate) fn emit_jump(&mut self, instruction: u8) -> Result<usize, InterpretError> {
    self.emit_byte(instruction)?;
    self.emit_bytes(&[0xff, 0xff])?;
    // -2 => the two placeholder jump-offset bytes just emitted
    Ok(self.current_chunk().code.len() - 2)
  }

  /// Patch the jump instruction correctly.
  pub(crate) fn patch_jump(&mut self, offset: usize) -> Result<(), InterpretError> {
    // -2 to adjust for the bytecode for the jump offset itself
    let jump = self.current_chunk().code.len() - offset - 2;

    if jump > u16::MAX as usize {
      return Err(InterpretError::CompileError(
        "Too much code to jump over.".into(),
      ));
    }

    let chunk = self.current_chunk();
    chunk.code[offset] = ((jump >> 8) & 0xff) as u8;
    chunk.code[offset + 1] = (jump & 0xff) as u8;

    Ok(())
  }

  /// Emit a backward jump to `loop_start`, used to close `while`/`for` bodies.
  pub(crate) fn emit_loop(&mut self, loop_start: usize) -> Result<(), InterpretError> {
    self.emit_byte(OpCode::Loop as u8)?;

    let offset = self.current_chunk().code.len() - loop_start + 2;
    if offset > u16::MAX as usize {
      return Err(InterpretError::CompileError("Loop body too large.".into()));
    }

    self.emit_bytes(&[((offset >> 8) & 0xff) as u8, (offset & 0xff) as u8])
  }

  /// Appending a sequence of bytes to the chunk (in order).
  pub(crate) fn emit_bytes(&mut self, bytes: &[u8]) -> Result<(), InterpretError> {
    for &byte in bytes {
      self.emit_byte(byte)?;
    }
    Ok(())
  }

  /// Appending a single byte to the chunk.
  pub(crate) fn emit_byte(&mut self, byte: u8) -> Result<(), InterpretError> {
    let line = self.previous.line;
    self.current_chunk().write_chunk(byte, line);
    Ok(())
  }

  /// Specifically appending the return instruction to the chunk.
  ///
  /// Every function implicitly returns `nil` if control runs off the end
  /// of its body, so the return value `OP_RETURN` pops must always be on
  /// the stack beforehand.
  pub(crate) fn emit_return(&mut self) -> Result<(), InterpretError> {
    self.emit_byte(OpCode::Nil as u8)?;
    self.emit_byte(OpCode::Return as u8)
  }

  /// Wrapper for appending `constant`/`constant_long` and its operand to
  /// the chunk, choosing the encoding based on the constant pool's size.
  pub(crate) fn emit_constant(&mut self, value: Value) -> Result<(), InterpretError> {
    let index = self.current_chunk().add_constant(value);
    if index > 0xFF_FFFF {
      return Err(InterpretError::CompileError(
        "Too many constants in one chunk.".into(),
      ));
    }
    if index > u8::MAX as usize {
      let bytes = (index as u32).to_be_bytes();
      self.emit_bytes(&[OpCode::ConstantLong as u8, bytes[1], bytes[2], bytes[3]])
    } else {
      self.emit_bytes(&[OpCode::Constant as u8, index as u8])
    }
  }

  /// Operations after end of compilation.
  pub(crate) fn end_compiler(&mut self) -> Result<(), InterpretError> {
    self.emit_return()
  }
}
