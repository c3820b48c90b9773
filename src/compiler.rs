//! # Compiler
//!
//! The compiler is a single-pass Pratt parser: it walks the token stream
//! exactly once and emits bytecode directly into a `Chunk`, with no
//! intermediate AST. `parser` holds the token-stream plumbing and the
//! expression/statement grammar; this module holds the per-function
//! compilation state that the grammar closes over.

use crate::{
  object::{ObjFunction, ObjString},
  scanner::Token,
  vm::{InterpretError, VM},
};
use std::ptr::NonNull;

pub mod parser;

use parser::Parser;

/// ## Precedence
///
/// Ascending binding power, lowest first. `parse_precedence` consumes
/// every infix operator whose precedence is at least the level it was
/// called with.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
  None,
  Assignment, // =
  Or,         // or
  And,        // and
  Equality,   // == !=
  Comparison, // < > <= >=
  Term,       // + -
  Factor,     // * /
  Unary,      // ! -
  Call,       // . ()
  Primary,
}

impl Default for Precedence {
  fn default() -> Self {
    Precedence::None
  }
}

impl Precedence {
  /// The next tighter-binding level, used to parse the right operand of a
  /// left-associative binary operator at `precedence + 1`.
  pub fn next(self) -> Self {
    match self {
      Precedence::None => Precedence::Assignment,
      Precedence::Assignment => Precedence::Or,
      Precedence::Or => Precedence::And,
      Precedence::And => Precedence::Equality,
      Precedence::Equality => Precedence::Comparison,
      Precedence::Comparison => Precedence::Term,
      Precedence::Term => Precedence::Factor,
      Precedence::Factor => Precedence::Unary,
      Precedence::Unary => Precedence::Call,
      Precedence::Call => Precedence::Primary,
      Precedence::Primary => Precedence::Primary,
    }
  }
}

/// ## FunctionType
///
/// Distinguishes the implicit top-level script function from a `fun`
/// body, so `return` can be rejected at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
  Script,
  Function,
}

/// ## Local
///
/// A local variable tracked at compile time. `depth` is the scope it was
/// declared in; `is_captured` doubles as the "fully initialized" flag
/// (false for the brief window between a `var` declaration binding its
/// name and its initializer expression finishing compilation, which is
/// what makes `var a = a;` a compile error).
pub struct Local<'a> {
  pub(crate) name: Token<'a>,
  pub(crate) depth: i32,
  pub(crate) is_captured: bool,
}

/// ## Compiler
///
/// Per-function compilation state. Compiling a `fun` body pushes a fresh
/// `Compiler` with `enclosing` pointing at the caller's, mirroring the
/// call stack of the functions being compiled; finishing the body pops
/// it back off.
pub struct Compiler<'a> {
  pub(crate) function: ObjFunction,
  pub(crate) fn_type: FunctionType,
  pub(crate) enclosing: Option<Box<Compiler<'a>>>,
  pub(crate) locals: Vec<Local<'a>>,
  pub(crate) local_count: usize,
  pub(crate) scope_depth: i32,
}

impl<'a> Compiler<'a> {
  /// Slot 0 of every frame is reserved for the function being called
  /// (mirrored by `Token::default()`'s empty lexeme, which no real
  /// identifier can ever match), so every new compiler starts with it
  /// already declared and initialized.
  pub(crate) fn new(fn_type: FunctionType, name: Option<NonNull<ObjString>>) -> Self {
    let mut function = ObjFunction::new();
    function.name = name;
    Self {
      function,
      fn_type,
      enclosing: None,
      locals: vec![Local {
        name: Token::default(),
        depth: 0,
        is_captured: true,
      }],
      local_count: 1,
      scope_depth: 0,
    }
  }
}

impl<'a> Default for Compiler<'a> {
  fn default() -> Self {
    Self {
      function: ObjFunction::default(),
      fn_type: FunctionType::Script,
      enclosing: None,
      locals: Vec::new(),
      local_count: 0,
      scope_depth: 0,
    }
  }
}

impl<'src, 'vm> Parser<'src, 'vm> {
  /// Compile a `fun` body: swap in a fresh nested `Compiler`, parse the
  /// parameter list and block, then pop the nested compiler back off and
  /// emit the finished function as a constant in the *enclosing* chunk.
  pub(crate) fn function(&mut self, fn_type: FunctionType) -> Result<(), InterpretError> {
    let name = self.vm.intern_string(self.previous.lexeme);
    let enclosing = std::mem::take(&mut self.compiler);
    self.compiler = Compiler::new(fn_type, Some(name));
    self.compiler.enclosing = Some(Box::new(enclosing));

    self.begin_scope();

    self.consume_token(
      crate::scanner::TokenType::LeftParen,
      "Expect `(` after function name.".into(),
    )?;
    if !self.check_token(crate::scanner::TokenType::RightParen) {
      loop {
        self.compiler.function.arity += 1;
        if self.compiler.function.arity as usize > crate::common::ARGS_MAX {
          self.error_at_current("Can't have more than 255 parameters.".into())?;
        }
        let constant = self.parse_variable("Expect parameter name.".into())?;
        self.define_variable(constant)?;
        if !self.match_token(crate::scanner::TokenType::Comma)? {
          break;
        }
      }
    }
    self.consume_token(
      crate::scanner::TokenType::RightParen,
      "Expect `)` after parameters.".into(),
    )?;
    self.consume_token(
      crate::scanner::TokenType::LeftBrace,
      "Expect `{` before function body.".into(),
    )?;
    self.block()?;

    self.end_compiler()?;

    #[cfg(feature = "debug_print_code")]
    {
      let name = match self.compiler.function.name {
        Some(name) => unsafe { name.as_ref() }.to_string(),
        None => "<script>".to_owned(),
      };
      self.current_chunk().disassemble(&name);
    }

    let mut finished = std::mem::take(&mut self.compiler);
    let enclosing = finished
      .enclosing
      .take()
      .expect("function compiler always has an enclosing compiler");
    self.compiler = *enclosing;

    let function_ptr = self.vm.alloc_function(finished.function);
    self.emit_constant(crate::value::Value::obj_val(function_ptr.cast()))
  }
}

/// Compile `source` into the implicit top-level script function.
///
/// Returns the compiled function on success, or the first compile error
/// encountered (compilation stops at the first error rather than
/// collecting all of them).
pub fn compile<'src, 'vm>(
  vm: &'vm mut VM,
  source: &'src str,
) -> Result<NonNull<ObjFunction>, InterpretError> {
  let mut parser = Parser::new(vm, source);
  parser.advance_token()?;
  while !parser.match_token(crate::scanner::TokenType::Eof)? {
    parser.declaration()?;
  }
  parser.end_compiler()?;

  #[cfg(feature = "debug_print_code")]
  if !parser.had_error {
    parser.current_chunk().disassemble("<script>");
  }

  let function = parser.compiler.function;
  Ok(parser.vm.alloc_function(function))
}
