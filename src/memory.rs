//! # Memory
//!
//! This module is mainly about memory management.
//!
//! You could also find functions which manage:
//!
//! - transformation between `rust_defined_types` and `obj_types`
//! - linking and freeing objects on the VM's intrusive allocation list
//!
//! There is no collector here: objects are freed exactly once, at
//! `VM::free`, by walking the list from the head. Reclaiming unreachable
//! objects earlier would require a mark-sweep pass; that is out of scope
//! (see spec.md §9).

use crate::{
  object::{Obj, ObjFunction, ObjNative, ObjString, ObjType},
  vm::VM,
};
use std::ptr::NonNull;

impl From<ObjString> for String {
  fn from(obj_string: ObjString) -> Self {
    obj_string.data
  }
}

impl VM {
  /// Link a freshly allocated object onto the head of the VM's object list.
  pub(crate) fn track_object(&mut self, mut obj: NonNull<Obj>) {
    unsafe { obj.as_mut().next = self.objects };
    self.objects = Some(obj);
  }

  /// Walk the object list, freeing every object's payload, then clear the
  /// list. Called once, from `free`.
  pub(crate) fn free_objects(&mut self) {
    let mut current = self.objects.take();
    while let Some(obj) = current {
      current = unsafe { obj.as_ref() }.next;
      Self::free_object(obj);
    }
  }

  /// Drop a single object by reconstructing the `Box` of its concrete type.
  fn free_object(obj: NonNull<Obj>) {
    let obj_type = unsafe { obj.as_ref() }.obj_type;
    match obj_type {
      ObjType::String => drop(unsafe { Box::from_raw(obj.cast::<ObjString>().as_ptr()) }),
      ObjType::Function => drop(unsafe { Box::from_raw(obj.cast::<ObjFunction>().as_ptr()) }),
      ObjType::Native => drop(unsafe { Box::from_raw(obj.cast::<ObjNative>().as_ptr()) }),
    }
  }
}
