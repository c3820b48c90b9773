//! # Table
//!
//! A module which wraps [`std::collections::HashMap`].
//!
//! Keys are `NonNull<ObjString>` rather than owned strings: because every
//! string reachable from the VM is interned (§3.3), two equal strings are
//! always the same pointer, so pointer identity already implements the
//! map's equality — no need to hash or compare string contents here.

use std::{collections::HashMap, ptr::NonNull};

use crate::{object::ObjString, utils::Init, value::Value};

#[derive(Debug, Clone, Default)]
pub struct Table(HashMap<NonNull<ObjString>, Value>);

impl Table {
  pub fn get(&self, key: NonNull<ObjString>) -> Option<&Value> {
    self.0.get(&key)
  }

  pub fn get_mut(&mut self, key: NonNull<ObjString>) -> Option<&mut Value> {
    self.0.get_mut(&key)
  }

  pub fn set(&mut self, key: NonNull<ObjString>, value: Value) -> Option<Value> {
    self.0.insert(key, value)
  }

  pub fn remove(&mut self, key: NonNull<ObjString>) -> Option<Value> {
    self.0.remove(&key)
  }

  pub fn contains_key(&self, key: NonNull<ObjString>) -> bool {
    self.0.contains_key(&key)
  }

  pub fn free(&mut self) {
    self.0.clear()
  }
}

impl Init for Table {}

/// The VM's string intern pool: buckets candidate strings by their
/// precomputed FNV-1a hash, then does a byte-equality tiebreak among
/// same-hash entries. This is the one place `interned(bytes)` can be
/// answered without first allocating an `ObjString` for `bytes`, which is
/// the whole point — `Table` above can't do that lookup because its keys
/// are already-allocated strings.
#[derive(Debug, Clone, Default)]
pub struct InternTable(HashMap<u32, Vec<NonNull<ObjString>>>);

impl InternTable {
  /// Find an already-interned string with these exact bytes, if any.
  pub fn find(&self, bytes: &[u8], hash: u32) -> Option<NonNull<ObjString>> {
    self
      .0
      .get(&hash)?
      .iter()
      .copied()
      .find(|candidate| unsafe { candidate.as_ref() }.data.as_bytes() == bytes)
  }

  /// Register a newly allocated string under its precomputed hash.
  pub fn insert(&mut self, hash: u32, string: NonNull<ObjString>) {
    self.0.entry(hash).or_default().push(string);
  }

  pub fn free(&mut self) {
    self.0.clear()
  }
}

impl Init for InternTable {}
