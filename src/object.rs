//! # Object
//!
//! This module mainly defines the `Object` type, which is the type of the
//! heap-allocated objects in the virtual machine: strings, functions, and
//! natives. Every object shares the same `Obj` header and is threaded onto
//! a single intrusive list rooted at the VM (see `vm::VM::objects`), which
//! is what lets `freeVM` reclaim every allocation without a garbage
//! collector.

use crate::{
  chunk::Chunk,
  value::{ValUnion, Value, ValueType},
  vm::InterpretError,
};
use std::{
  fmt::{Debug, Display},
  ptr::NonNull,
};

/// ## Object Type
///
/// An enum which represents the type of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
  String,
  Function,
  Native,
}

/// ## Object
///
/// The meta type of all `objects` in the virtual machine. Every concrete
/// object type starts with an `Obj` so a `NonNull<Obj>` can be cast back
/// to its real shape once `obj_type` is known.
#[derive(Debug, PartialEq, Eq)]
pub struct Obj {
  pub(crate) obj_type: ObjType,
  /// Next object in the VM's intrusive allocation list.
  pub(crate) next: Option<NonNull<Obj>>,
}

impl Obj {
  pub fn new(obj_type: ObjType) -> Self {
    Self {
      obj_type,
      next: None,
    }
  }
}

/// ## Object Trait
///
/// A helper trait of meta type `Object`
pub trait ObjTrait {
  fn cast_to_obj_ptr(self) -> NonNull<Obj>;
}

impl Value {
  pub(crate) fn format_object(&self) -> String {
    match self.obj_type().unwrap() {
      ObjType::String => format!("\"{}\"", self.as_rust_string().unwrap()),
      ObjType::Function => {
        let function = self.as_function().unwrap();
        let function = unsafe { function.as_ref() };
        match function.name {
          Some(name) => format!("<fn {}>", unsafe { name.as_ref() }),
          None => "<script>".to_owned(),
        }
      }
      ObjType::Native => "<native fn>".to_owned(),
    }
  }
}

impl Value {
  pub fn obj_val(value: NonNull<Obj>) -> Self {
    Self {
      value_type: ValueType::Obj,
      val_union: ValUnion { obj: value },
    }
  }

  pub fn is_obj(&self) -> bool {
    self.value_type == ValueType::Obj
  }

  pub fn as_obj(&self) -> NonNull<Obj> {
    unsafe { self.val_union.obj }
  }
}

impl Value {
  pub fn obj_type(&self) -> Result<ObjType, InterpretError> {
    match self.value_type {
      ValueType::Obj => Ok(unsafe { self.val_union.obj.as_ref() }.obj_type),
      ValueType::Nil => Err(InterpretError::RuntimeError("Value is `nil`.".into())),
      _ => Err(InterpretError::RuntimeError(
        "Value is not an object.".into(),
      )),
    }
  }

  fn is_obj_type(&self, expect: ObjType) -> bool {
    self.is_obj() && self.obj_type().unwrap() == expect
  }
}

/// ## Object String
///
/// The type of the string object. Strings are interned: the `hash` field is
/// the FNV-1a hash of `data`'s bytes, computed once at construction, used by
/// `vm::InternTable` to find an existing equal string before allocating.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct ObjString {
  pub(crate) obj: Obj,
  pub(crate) data: String,
  pub(crate) hash: u32,
}

impl ObjString {
  /// FNV-1a over the raw bytes, matching the hash clox computes at
  /// `copyString`/`takeString` time.
  pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in bytes {
      hash ^= byte as u32;
      hash = hash.wrapping_mul(16777619);
    }
    hash
  }
}

impl From<String> for ObjString {
  fn from(rust_string: String) -> Self {
    let hash = ObjString::hash_bytes(rust_string.as_bytes());
    Self {
      obj: Obj::new(ObjType::String),
      data: rust_string,
      hash,
    }
  }
}

impl ObjTrait for ObjString {
  fn cast_to_obj_ptr(self) -> NonNull<Obj> {
    NonNull::new(Box::into_raw(Box::new(self))).unwrap().cast()
  }
}

impl Display for ObjString {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.data)
  }
}

impl Value {
  pub fn is_string(&self) -> bool {
    self.is_obj_type(ObjType::String)
  }

  pub fn as_string(&self) -> Result<NonNull<ObjString>, InterpretError> {
    if self.is_string() {
      Ok(self.as_obj().cast())
    } else {
      Err(InterpretError::RuntimeError(
        "Value is not a string.".into(),
      ))
    }
  }

  pub fn as_rust_string(&self) -> Result<&mut String, InterpretError> {
    let str_ref = &mut unsafe { self.as_string()?.as_mut() }.data;
    Ok(str_ref)
  }
}

/// ## Object Function
///
/// A compiled Lox function: its arity, its own `Chunk`, and an optional
/// name (absent for the anonymous top-level script function).
#[repr(C)]
#[derive(Debug)]
pub struct ObjFunction {
  pub(crate) obj: Obj,
  pub(crate) arity: u8,
  pub(crate) chunk: Chunk,
  pub(crate) name: Option<NonNull<ObjString>>,
}

impl ObjFunction {
  pub fn new() -> Self {
    Self {
      obj: Obj::new(ObjType::Function),
      arity: 0,
      chunk: Chunk::default(),
      name: None,
    }
  }
}

impl Default for ObjFunction {
  fn default() -> Self {
    Self::new()
  }
}

impl ObjTrait for ObjFunction {
  fn cast_to_obj_ptr(self) -> NonNull<Obj> {
    NonNull::new(Box::into_raw(Box::new(self))).unwrap().cast()
  }
}

impl Value {
  pub fn is_function(&self) -> bool {
    self.is_obj_type(ObjType::Function)
  }

  pub fn as_function(&self) -> Result<NonNull<ObjFunction>, InterpretError> {
    if self.is_function() {
      Ok(self.as_obj().cast())
    } else {
      Err(InterpretError::RuntimeError(
        "Value is not a function.".into(),
      ))
    }
  }
}

/// A host function callable from Lox: `clock`, etc. Takes the argument
/// slice (not a leading arg-count, since Rust slices already carry their
/// length) and returns the call's result.
pub type NativeFn = fn(&[Value]) -> Result<Value, InterpretError>;

/// ## Object Native
///
/// Wraps a Rust function pointer so it can be stored as a `Value` and
/// invoked through `OP_CALL` exactly like a Lox function.
#[repr(C)]
#[derive(Debug)]
pub struct ObjNative {
  pub(crate) obj: Obj,
  pub(crate) function: NativeFn,
}

impl ObjNative {
  pub fn new(function: NativeFn) -> Self {
    Self {
      obj: Obj::new(ObjType::Native),
      function,
    }
  }
}

impl ObjTrait for ObjNative {
  fn cast_to_obj_ptr(self) -> NonNull<Obj> {
    NonNull::new(Box::into_raw(Box::new(self))).unwrap().cast()
  }
}

impl Value {
  pub fn is_native(&self) -> bool {
    self.is_obj_type(ObjType::Native)
  }

  pub fn as_native(&self) -> Result<NonNull<ObjNative>, InterpretError> {
    if self.is_native() {
      Ok(self.as_obj().cast())
    } else {
      Err(InterpretError::RuntimeError(
        "Value is not a native function.".into(),
      ))
    }
  }
}
