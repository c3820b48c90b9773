//! # Common
//!
//! Process-wide constants shared across the scanner, compiler and VM.

#![allow(dead_code)]

/// Maximum number of local variables in scope at once (one byte operand).
pub const LOCAL_MAX: usize = u8::MAX as usize + 1;

/// Maximum number of call frames (bounds recursion depth).
pub const FRAMES_MAX: usize = 64;

/// Maximum number of value-stack slots.
pub const STACK_MAX: usize = FRAMES_MAX * LOCAL_MAX;

/// Maximum number of arguments a call expression may pass.
pub const ARGS_MAX: usize = u8::MAX as usize;
