use super::*;

impl<'src, 'vm> Parser<'src, 'vm> {
  pub(crate) fn print_statement(&mut self) -> Result<(), InterpretError> {
    self.expression()?;
    self.consume_token(TokenType::Semicolon, "Expect `;` after value.".into())?;
    self.emit_byte(OpCode::Print as u8)
  }

  pub(crate) fn if_statement(&mut self) -> Result<(), InterpretError> {
    /* condition */
    self.consume_token(TokenType::LeftParen, "Expect `(` after `if`.".into())?;
    self.expression()?;
    self.consume_token(TokenType::RightParen, "Expect `)` after condition.".into())?;

    /* `consume`: if {...} */
    let then_jump = self.emit_jump(OpCode::JumpIfFalse as u8)?;
    // pop top of stack **iff** `condition` is true
    self.emit_byte(OpCode::Pop as u8)?;
    self.statement()?;

    /* patch `if` jump */
    let else_jump = self.emit_jump(OpCode::Jump as u8)?;
    self.patch_jump(then_jump)?;

    /* `consume`: else {...} */
    // pop top of stack **iff** `condition` is false
    self.emit_byte(OpCode::Pop as u8)?;
    if self.match_token(TokenType::Else)? {
      self.statement()?;
    }

    /* patch `else` jump */
    self.patch_jump(else_jump)
  }

  pub(crate) fn while_statement(&mut self) -> Result<(), InterpretError> {
    let loop_start = self.current_chunk().code.len();

    self.consume_token(TokenType::LeftParen, "Expect `(` after `while`.".into())?;
    self.expression()?;
    self.consume_token(TokenType::RightParen, "Expect `)` after condition.".into())?;

    let exit_jump = self.emit_jump(OpCode::JumpIfFalse as u8)?;
    self.emit_byte(OpCode::Pop as u8)?;
    self.statement()?;
    self.emit_loop(loop_start)?;

    self.patch_jump(exit_jump)?;
    self.emit_byte(OpCode::Pop as u8)
  }

  /// `for (init; cond; incr) body` desugars to a `while` wrapped in a
  /// scope that holds `init`, with `incr` spliced onto the end of `body`.
  pub(crate) fn for_statement(&mut self) -> Result<(), InterpretError> {
    self.begin_scope();
    self.consume_token(TokenType::LeftParen, "Expect `(` after `for`.".into())?;

    if self.match_token(TokenType::Semicolon)? {
      // no initializer clause
    } else if self.match_token(TokenType::Var)? {
      self.var_declaration()?;
    } else {
      self.expression_statement()?;
    }

    let mut loop_start = self.current_chunk().code.len();
    let mut exit_jump: Option<usize> = None;

    if !self.match_token(TokenType::Semicolon)? {
      self.expression()?;
      self.consume_token(
        TokenType::Semicolon,
        "Expect `;` after loop condition.".into(),
      )?;

      exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse as u8)?);
      self.emit_byte(OpCode::Pop as u8)?;
    }

    if !self.match_token(TokenType::RightParen)? {
      let body_jump = self.emit_jump(OpCode::Jump as u8)?;
      let increment_start = self.current_chunk().code.len();

      self.expression()?;
      self.emit_byte(OpCode::Pop as u8)?;
      self.consume_token(TokenType::RightParen, "Expect `)` after for clauses.".into())?;

      self.emit_loop(loop_start)?;
      loop_start = increment_start;
      self.patch_jump(body_jump)?;
    }

    self.statement()?;
    self.emit_loop(loop_start)?;

    if let Some(exit_jump) = exit_jump {
      self.patch_jump(exit_jump)?;
      self.emit_byte(OpCode::Pop as u8)?;
    }

    self.end_scope()
  }

  pub(crate) fn return_statement(&mut self) -> Result<(), InterpretError> {
    if self.compiler.fn_type == super::super::FunctionType::Script {
      return Err(
        self
          .error("Can't return from top-level code.".into())
          .unwrap_err(),
      );
    }
    if self.match_token(TokenType::Semicolon)? {
      self.emit_return()
    } else {
      self.expression()?;
      self.consume_token(TokenType::Semicolon, "Expect `;` after return value.".into())?;
      self.emit_byte(OpCode::Return as u8)
    }
  }

  /// If in panic_mode, then synchronize (for better recognizing what error has occurred).
  ///
  /// Synchronize means that, we will skip tokens indiscriminately
  /// until we reach something that looks like a statement boundary.
  ///
  /// E.g.: class | fun | var | for | if | while | print | return
  pub(crate) fn synchronize(&mut self) -> Result<(), InterpretError> {
    self.panic_mode = false;
    while self.current.token_type != TokenType::Eof {
      if self.previous.token_type == TokenType::Semicolon {
        return Ok(());
      }
      match self.current.token_type {
        TokenType::Class
        | TokenType::Fun
        | TokenType::Var
        | TokenType::For
        | TokenType::If
        | TokenType::While
        | TokenType::Print
        | TokenType::Return => return Ok(()),
        _ => {}
      }
      self.advance_token()?;
    }
    Ok(())
  }

  pub(crate) fn expression_statement(&mut self) -> Result<(), InterpretError> {
    self.expression()?;
    self.consume_token(TokenType::Semicolon, "Expect `;` after expression.".into())?;
    self.emit_byte(OpCode::Pop as u8)
  }
}
