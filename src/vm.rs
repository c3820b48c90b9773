//! # VM
//!
//! ## Based on Stack
//!
//! The VM (aka. Virtual Machine) is the core of the interpreter.
//!
//! It is responsible for:
//!
//! - compiling source to bytecode (via `compiler::compile`)
//! - executing the bytecode, one call frame per active function
//! - owning every heap object allocated during a run (strings, functions,
//!   natives), so it can free them all at once when the run ends

#[cfg(feature = "debug_trace_execution")]
use crate::debug::Debug;
use crate::{
  chunk::OpCode,
  common::FRAMES_MAX,
  object::{NativeFn, Obj, ObjFunction, ObjNative, ObjString, ObjTrait},
  table::{InternTable, Table},
  utils::Init,
  value::Value,
};
use std::ptr::NonNull;

/// ## InterpretError
///
/// An enum which represents the different errors that can occur
/// during the interpretation.
#[derive(Debug, Clone)]
pub enum InterpretError {
  CompileError(String),
  RuntimeError(String),
}

/// ## InterpretResult
///
/// The outcome of a top-level `VM::interpret` call. Exists (rather than
/// just returning `Result<(), InterpretError>`) because the caller (`main`)
/// needs to distinguish compile-time from run-time failure to pick an exit
/// code, after the error has already been printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
  Ok,
  CompileError,
  RuntimeError,
}

/// ## CallFrame
///
/// One activation record: which function is executing, where its
/// instruction pointer is, and where its stack window begins. `slot_base`
/// is the index of slot 0 of this frame within the VM's single shared
/// stack — slot 0 holds the function (or receiver) being called.
#[derive(Debug)]
pub(crate) struct CallFrame {
  pub(crate) function: NonNull<ObjFunction>,
  pub(crate) ip: usize,
  pub(crate) slot_base: usize,
}

/// ## VM
///
/// A struct which represents the virtual machine.
#[derive(Debug, Default)]
pub struct VM {
  /// Active call frames, innermost last.
  pub(crate) frames: Vec<CallFrame>,
  /// The single value stack shared by every frame.
  pub(crate) stack: Vec<Value>,
  /// Interned strings, keyed by hash (see `table::InternTable`).
  pub(crate) strings: InternTable,
  /// Global variables.
  pub(crate) globals: Table,
  /// Head of the intrusive list of every heap object the VM has allocated.
  pub(crate) objects: Option<NonNull<Obj>>,
}

impl VM {
  /// Create a VM with the standard library of natives already registered.
  pub fn new() -> Self {
    let mut vm = Self::default();
    vm.define_native("clock", clock_native);
    vm
  }

  /// Compile and run `source`. Errors are printed to stderr before
  /// returning, matching clox's `main`/`interpret` split: the returned
  /// `InterpretResult` only needs to decide an exit code.
  pub fn interpret(&mut self, source: &str) -> InterpretResult {
    let function = match crate::compiler::compile(self, source) {
      Ok(function) => function,
      Err(InterpretError::CompileError(message)) => {
        eprintln!("{}", message);
        return InterpretResult::CompileError;
      }
      Err(InterpretError::RuntimeError(message)) => {
        eprintln!("{}", message);
        return InterpretResult::CompileError;
      }
    };

    self.stack.push(Value::obj_val(function.cast()));
    if let Err(error) = self.call_function(function, 0) {
      self.report_runtime_error(&error);
      return InterpretResult::RuntimeError;
    }

    match self.run() {
      Ok(()) => InterpretResult::Ok,
      Err(error) => {
        self.report_runtime_error(&error);
        InterpretResult::RuntimeError
      }
    }
  }

  /// Free every heap object the VM has allocated, then drop its own
  /// bookkeeping. Safe to call even if `interpret` never ran.
  pub fn free(&mut self) {
    self.frames.clear();
    self.stack.clear();
    self.strings.free();
    self.globals.free();
    self.free_objects();
  }
}

impl VM {
  fn unary_op<T>(&mut self, op: T) -> Result<(), InterpretError>
  where
    T: Fn(Value) -> Result<Value, InterpretError>,
  {
    let value = self
      .stack
      .pop()
      .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
    self.stack.push(op(value)?);
    Ok(())
  }

  fn binary_op<T>(&mut self, op: T) -> Result<(), InterpretError>
  where
    T: Fn(Value, Value) -> Result<Value, InterpretError>,
  {
    let b = self
      .stack
      .pop()
      .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
    let a = self
      .stack
      .pop()
      .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
    self.stack.push(op(a, b)?);
    Ok(())
  }

  /// `+` special-cases string concatenation: two numbers add numerically,
  /// two strings concatenate (and the result is interned like any other
  /// string), anything else is a runtime error.
  fn op_add(&mut self) -> Result<(), InterpretError> {
    let b = self
      .stack
      .pop()
      .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
    let a = self
      .stack
      .pop()
      .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;

    if a.is_number() && b.is_number() {
      self.stack.push((a + b)?);
    } else if a.is_string() && b.is_string() {
      let mut concatenated = unsafe { a.as_string()?.as_ref() }.data.clone();
      concatenated.push_str(&unsafe { b.as_string()?.as_ref() }.data);
      let interned = self.intern_string(&concatenated);
      self.stack.push(Value::obj_val(interned.cast()));
    } else {
      return Err(InterpretError::RuntimeError(
        "Operands must be two numbers or two strings.".into(),
      ));
    }
    Ok(())
  }
}

impl VM {
  /// Read a byte from the current frame's chunk (update its ip).
  fn read_byte(&mut self) -> u8 {
    let frame = self.frames.last_mut().expect("no active call frame");
    let function = unsafe { frame.function.as_ref() };
    let byte = function.chunk.code[frame.ip];
    frame.ip += 1;
    byte
  }

  /// Read a one-byte constant-pool index from the current frame (`OP_CONSTANT`).
  fn read_constant(&mut self) -> Value {
    let index = self.read_byte();
    let frame = self.frames.last().expect("no active call frame");
    let function = unsafe { frame.function.as_ref() };
    function.chunk.constants.values[index as usize]
  }

  /// Read a three-byte big-endian constant-pool index (`OP_CONSTANT_LONG`).
  fn read_constant_long(&mut self) -> Value {
    let bytes = [0, self.read_byte(), self.read_byte(), self.read_byte()];
    let index = u32::from_be_bytes(bytes) as usize;
    let frame = self.frames.last().expect("no active call frame");
    let function = unsafe { frame.function.as_ref() };
    function.chunk.constants.values[index]
  }

  /// Read a two-byte big-endian jump offset from the current frame.
  fn read_u16(&mut self) -> u16 {
    let frame = self.frames.last_mut().expect("no active call frame");
    let function = unsafe { frame.function.as_ref() };
    let bytes = [function.chunk.code[frame.ip], function.chunk.code[frame.ip + 1]];
    frame.ip += 2;
    u16::from_be_bytes(bytes)
  }
}

impl VM {
  /// Disassemble the instruction the current frame is about to execute.
  ///
  /// This function is only available when the feature
  /// `debug_trace_execution` is enabled.
  #[cfg(feature = "debug_trace_execution")]
  fn disassemble_instruction(&self) {
    let frame = self.frames.last().expect("no active call frame");
    let function = unsafe { frame.function.as_ref() };
    function.chunk.disassemble_instruction(frame.ip);
  }

  /// Trace VM's stack.
  ///
  /// This function is only available when the feature
  /// `debug_trace_stack` is enabled.
  #[cfg(feature = "debug_trace_stack")]
  pub fn trace_stack(&self) {
    print!("        | ");
    print!("[");
    for (i, value) in self.stack.iter().enumerate() {
      print!("{}", value);
      if i != self.stack.len() - 1 {
        print!(", ");
      }
    }
    println!("]")
  }
}

impl VM {
  /// Run until the outermost call frame returns.
  pub fn run(&mut self) -> Result<(), InterpretError> {
    loop {
      #[cfg(feature = "debug_trace_stack")]
      self.trace_stack();
      #[cfg(feature = "debug_trace_execution")]
      self.disassemble_instruction();

      if self.run_one_step()? {
        return Ok(());
      }
    }
  }

  /// Execute a single instruction. Returns `true` once the outermost
  /// frame (the implicit top-level script) has returned.
  #[inline]
  fn run_one_step(&mut self) -> Result<bool, InterpretError> {
    let instruction = self.read_byte();
    let halt = match OpCode::from(instruction) {
      /* Constants */
      OpCode::Constant => {
        let constant = self.read_constant();
        self.stack.push(constant);
        false
      }
      OpCode::ConstantLong => {
        let constant = self.read_constant_long();
        self.stack.push(constant);
        false
      }
      OpCode::Nil => {
        self.stack.push(Value::nil_val());
        false
      }
      OpCode::True => {
        self.stack.push(Value::bool_val(true));
        false
      }
      OpCode::False => {
        self.stack.push(Value::bool_val(false));
        false
      }
      /* Comparisons */
      OpCode::Equal => {
        let b = self
          .stack
          .pop()
          .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
        let a = self
          .stack
          .pop()
          .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
        self.stack.push(Value::bool_val(a == b));
        false
      }
      OpCode::Greater => {
        self.binary_op(|a, b| {
          if a.is_number() && b.is_number() {
            Ok(Value::bool_val(a.as_number() > b.as_number()))
          } else {
            Err(InterpretError::RuntimeError(
              "Operands must be numbers.".into(),
            ))
          }
        })?;
        false
      }
      OpCode::Less => {
        self.binary_op(|a, b| {
          if a.is_number() && b.is_number() {
            Ok(Value::bool_val(a.as_number() < b.as_number()))
          } else {
            Err(InterpretError::RuntimeError(
              "Operands must be numbers.".into(),
            ))
          }
        })?;
        false
      }
      /* Binary Arith Opts */
      OpCode::Add => {
        self.op_add()?;
        false
      }
      OpCode::Subtract => {
        self.binary_op(|a, b| a - b)?;
        false
      }
      OpCode::Multiply => {
        self.binary_op(|a, b| a * b)?;
        false
      }
      OpCode::Divide => {
        self.binary_op(|a, b| a / b)?;
        false
      }
      /* Unary Arith Opts */
      OpCode::Not => {
        self.unary_op(|v| !v)?;
        false
      }
      OpCode::Negate => {
        self.unary_op(|v| -v)?;
        false
      }
      /* Control Flow Opts */
      OpCode::Jump => {
        let offset = self.read_u16();
        self.frames.last_mut().unwrap().ip += offset as usize;
        false
      }
      OpCode::JumpIfFalse => {
        let offset = self.read_u16();
        if self.stack.last().unwrap().is_falsey() {
          self.frames.last_mut().unwrap().ip += offset as usize;
        }
        false
      }
      OpCode::Loop => {
        let offset = self.read_u16();
        self.frames.last_mut().unwrap().ip -= offset as usize;
        false
      }
      /* Helper Opts */
      OpCode::Print => {
        let value = self
          .stack
          .pop()
          .ok_or_else(|| InterpretError::RuntimeError("Operate on an empty stack.".into()))?;
        println!("{}", value);
        false
      }
      OpCode::Pop => {
        self.stack.pop();
        false
      }
      /* Variable Getters/Setters */
      OpCode::DefineGlobal => {
        let name = self.read_constant().as_string()?;
        let value = self.stack.pop().unwrap();
        self.globals.set(name, value);
        false
      }
      OpCode::GetGlobal => {
        let name = self.read_constant().as_string()?;
        match self.globals.get(name) {
          Some(&value) => self.stack.push(value),
          None => {
            return Err(InterpretError::RuntimeError(format!(
              "Undefined variable '{}'.",
              unsafe { name.as_ref() }
            )))
          }
        }
        false
      }
      OpCode::SetGlobal => {
        let name = self.read_constant().as_string()?;
        let value = *self.stack.last().unwrap();
        if self.globals.set(name, value).is_none() {
          self.globals.remove(name);
          return Err(InterpretError::RuntimeError(format!(
            "Undefined variable '{}'.",
            unsafe { name.as_ref() }
          )));
        }
        false
      }
      OpCode::GetLocal => {
        let slot = self.read_byte();
        let base = self.frames.last().unwrap().slot_base;
        self.stack.push(self.stack[base + slot as usize]);
        false
      }
      OpCode::SetLocal => {
        let slot = self.read_byte();
        let base = self.frames.last().unwrap().slot_base;
        let top = *self.stack.last().unwrap();
        self.stack[base + slot as usize] = top;
        false
      }
      /* Calls */
      OpCode::Call => {
        let arg_count = self.read_byte();
        let callee = self.stack[self.stack.len() - 1 - arg_count as usize];
        self.call_value(callee, arg_count)?;
        false
      }
      /* Return */
      OpCode::Return => {
        let result = self.stack.pop().unwrap();
        let frame = self.frames.pop().unwrap();
        if self.frames.is_empty() {
          self.stack.pop();
          true
        } else {
          self.stack.truncate(frame.slot_base);
          self.stack.push(result);
          false
        }
      }
    };
    Ok(halt)
  }
}

impl VM {
  /// Dispatch a call expression's callee: only functions and natives are
  /// callable, matching Lox's "classes are the only other callable and
  /// this VM has no classes" stage.
  fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), InterpretError> {
    if callee.is_function() {
      self.call_function(callee.as_function()?, arg_count)
    } else if callee.is_native() {
      self.call_native(callee.as_native()?, arg_count)
    } else {
      Err(InterpretError::RuntimeError(
        "Can only call functions and classes.".into(),
      ))
    }
  }

  fn call_function(
    &mut self,
    function: NonNull<ObjFunction>,
    arg_count: u8,
  ) -> Result<(), InterpretError> {
    let arity = unsafe { function.as_ref() }.arity;
    if arg_count != arity {
      return Err(InterpretError::RuntimeError(format!(
        "Expected {} arguments but got {}.",
        arity, arg_count
      )));
    }
    if self.frames.len() >= FRAMES_MAX {
      return Err(InterpretError::RuntimeError("Stack overflow.".into()));
    }
    let slot_base = self.stack.len() - arg_count as usize - 1;
    self.frames.push(CallFrame {
      function,
      ip: 0,
      slot_base,
    });
    Ok(())
  }

  fn call_native(
    &mut self,
    native: NonNull<ObjNative>,
    arg_count: u8,
  ) -> Result<(), InterpretError> {
    let function = unsafe { native.as_ref() }.function;
    let start = self.stack.len() - arg_count as usize;
    let result = function(&self.stack[start..])?;
    self.stack.truncate(start - 1);
    self.stack.push(result);
    Ok(())
  }
}

impl VM {
  /// Print the runtime error and a frame-by-frame backtrace to stderr,
  /// then reset the VM to a clean (empty) state.
  fn report_runtime_error(&mut self, error: &InterpretError) {
    if let InterpretError::RuntimeError(message) = error {
      eprintln!("{}", message);
      for frame in self.frames.iter().rev() {
        let function = unsafe { frame.function.as_ref() };
        let line = function.chunk.line_of(frame.ip.saturating_sub(1));
        match function.name {
          Some(name) => eprintln!("[line {}] in {}()", line, unsafe { name.as_ref() }),
          None => eprintln!("[line {}] in script", line),
        }
      }
    }
    self.stack.clear();
    self.frames.clear();
  }
}

impl VM {
  /// Intern `bytes`, returning the existing string if one with the same
  /// content was already allocated, or allocating and tracking a new one.
  /// Every string allocation in the VM (compiler literals, runtime
  /// concatenation) routes through this one path.
  pub(crate) fn intern_string(&mut self, bytes: &str) -> NonNull<ObjString> {
    let hash = ObjString::hash_bytes(bytes.as_bytes());
    if let Some(existing) = self.strings.find(bytes.as_bytes(), hash) {
      return existing;
    }
    let obj_ptr = ObjString::from(bytes.to_owned()).cast_to_obj_ptr();
    self.track_object(obj_ptr);
    let str_ptr: NonNull<ObjString> = obj_ptr.cast();
    self.strings.insert(hash, str_ptr);
    str_ptr
  }

  /// Allocate a compiled function on the VM's heap and track it for
  /// freeing, returning a handle the compiler can embed as a constant.
  pub(crate) fn alloc_function(&mut self, function: ObjFunction) -> NonNull<ObjFunction> {
    let obj_ptr = function.cast_to_obj_ptr();
    self.track_object(obj_ptr);
    obj_ptr.cast()
  }

  /// Register a Rust function as a Lox global callable by `name`.
  pub fn define_native(&mut self, name: &str, function: NativeFn) {
    let name_ptr = self.intern_string(name);
    let obj_ptr = ObjNative::new(function).cast_to_obj_ptr();
    self.track_object(obj_ptr);
    self.globals.set(name_ptr, Value::obj_val(obj_ptr));
  }
}

/// `clock()`: seconds since the Unix epoch, as a Lox number. The one
/// native the ambient standard library ships with, matching clox.
fn clock_native(_args: &[Value]) -> Result<Value, InterpretError> {
  use std::time::{SystemTime, UNIX_EPOCH};
  let elapsed = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map_err(|_| InterpretError::RuntimeError("System clock is before the Unix epoch.".into()))?;
  Ok(Value::number_val(elapsed.as_secs_f64()))
}

impl Init for VM {}
