use super::*;

impl<'src, 'vm> Parser<'src, 'vm> {
  pub(crate) fn parse_variable(&mut self, message: String) -> Result<u8, InterpretError> {
    self.consume_token(TokenType::Identifier, message)?;

    // record if it's a local variable (scope_depth > 0)
    self.declare_variable()?;

    // if in local scope, simply exit (with a fake index)
    if self.compiler.scope_depth > 0 {
      return Ok(0);
    }

    self.identifier_constant()
  }

  pub(crate) fn mark_initialized(&mut self) {
    if self.compiler.scope_depth == 0 {
      return;
    }
    self.compiler.locals.last_mut().unwrap().is_captured = true;
  }

  pub(crate) fn define_variable(&mut self, global_index: u8) -> Result<(), InterpretError> {
    if self.compiler.scope_depth > 0 {
      self.mark_initialized();
      Ok(())
    } else {
      self.emit_bytes(&[OpCode::DefineGlobal as u8, global_index])
    }
  }

  /// Records the existence of variable (only for locals).
  fn declare_variable(&mut self) -> Result<(), InterpretError> {
    if self.compiler.scope_depth == 0 {
      return Ok(());
    }

    // Detect error => two variables with same name
    // in the same local scope.
    for local in self
      .compiler
      .locals
      .iter()
      .rev()
      .take(self.compiler.local_count)
    {
      if local.depth < self.compiler.scope_depth {
        break;
      }
      if local.name.lexeme == self.previous.lexeme {
        return Err(InterpretError::CompileError(
          "Already a variable with this name in this scope.".into(),
        ));
      }
    }

    self.add_local()
  }

  fn add_local(&mut self) -> Result<(), InterpretError> {
    if self.compiler.local_count >= crate::common::LOCAL_MAX {
      return Err(InterpretError::CompileError(
        "Too many local variables in function(At most: 256).".into(),
      ));
    }
    self.compiler.locals.push(Local {
      depth: self.compiler.scope_depth,
      name: self.previous,
      is_captured: false,
    });
    self.compiler.local_count += 1;
    Ok(())
  }

  pub(crate) fn identifier_constant(&mut self) -> Result<u8, InterpretError> {
    let interned = self.vm.intern_string(self.previous.lexeme);
    self.make_constant(Value::obj_val(interned.cast()))
  }

  /// Try to find the local variable in the current scope.
  ///
  /// Scans innermost-declared first, so shadowing a name in a nested
  /// block resolves to the new local rather than the one it shadows.
  ///
  /// If find, return the index of the local variable.
  pub(crate) fn resolve_local(&mut self) -> Result<Option<usize>, InterpretError> {
    let pos = self
      .compiler
      .locals
      .iter()
      .rev()
      .take(self.compiler.local_count)
      .position(|local| local.name.lexeme == self.previous.lexeme)
      .map(|rev_pos| self.compiler.locals.len() - 1 - rev_pos);
    if let Some(pos) = pos {
      if !self.compiler.locals[pos].is_captured {
        return Err(InterpretError::CompileError(
          "Can't read local variable in its own initializer.".into(),
        ));
      };
    }
    Ok(pos)
  }

  /// Declare: bind a new variable.
  pub(crate) fn var_declaration(&mut self) -> Result<(), InterpretError> {
    let global_index = self.parse_variable("Expect variable name.".into())?;

    if self.match_token(TokenType::Equal)? {
      self.expression()?;
    } else {
      self.emit_byte(OpCode::Nil as u8)?;
    }

    self.consume_token(
      TokenType::Semicolon,
      "Expect `;` after variable declaration.".into(),
    )?;

    self.define_variable(global_index)
  }

  /// Declare: bind a new function, then compile its body.
  ///
  /// The function's own name is marked initialized before its body is
  /// compiled so the body can call it recursively by name.
  pub(crate) fn fun_declaration(&mut self) -> Result<(), InterpretError> {
    let global_index = self.parse_variable("Expect function name.".into())?;
    self.mark_initialized();
    self.function(super::super::FunctionType::Function)?;
    self.define_variable(global_index)
  }
}
