//! End-to-end VM tests, driven through the public `VM::interpret` entry
//! point. Hand-assembling a `Chunk` directly (as this file used to) is no
//! longer meaningful from outside the crate: every chunk now lives inside
//! an `ObjFunction` the compiler allocates on the VM's heap, and running
//! one always goes through `compile`.

use rlox::vm::{InterpretResult, VM};

#[test]
fn arithmetic_precedence() {
  let mut vm = VM::new();
  // `-((1.2 + 2.3) / 5.6)` — exercises NEGATE/ADD/DIVIDE together.
  let result = vm.interpret("print -((1.2 + 2.3) / 5.6);");
  assert_eq!(result, InterpretResult::Ok);
  vm.free();
}

#[test]
fn global_variable_roundtrip() {
  let mut vm = VM::new();
  let result =
    vm.interpret("var greeting = \"hello\"; greeting = greeting + \" world\"; print greeting;");
  assert_eq!(result, InterpretResult::Ok);
  vm.free();
}

#[test]
fn undefined_global_is_a_runtime_error() {
  let mut vm = VM::new();
  let result = vm.interpret("print undefined_name;");
  assert_eq!(result, InterpretResult::RuntimeError);
  vm.free();
}

#[test]
fn local_scoping_and_shadowing() {
  let mut vm = VM::new();
  let source = r#"
    var a = "outer";
    {
      var a = "inner";
      print a;
    }
    print a;
  "#;
  assert_eq!(vm.interpret(source), InterpretResult::Ok);
  vm.free();
}

#[test]
fn while_and_for_loops_terminate() {
  let mut vm = VM::new();
  let source = r#"
    var sum = 0;
    var i = 0;
    while (i < 5) {
      sum = sum + i;
      i = i + 1;
    }
    for (var j = 0; j < 5; j = j + 1) {
      sum = sum + j;
    }
    print sum;
  "#;
  assert_eq!(vm.interpret(source), InterpretResult::Ok);
  vm.free();
}

#[test]
fn short_circuit_and_or() {
  let mut vm = VM::new();
  let source = r#"
    fun boom() {
      print "should not run";
      return true;
    }
    print false and boom();
    print true or boom();
  "#;
  assert_eq!(vm.interpret(source), InterpretResult::Ok);
  vm.free();
}

#[test]
fn recursive_function_call() {
  let mut vm = VM::new();
  let source = r#"
    fun fib(n) {
      if (n < 2) return n;
      return fib(n - 1) + fib(n - 2);
    }
    print fib(10);
  "#;
  assert_eq!(vm.interpret(source), InterpretResult::Ok);
  vm.free();
}

#[test]
fn wrong_arity_is_a_runtime_error() {
  let mut vm = VM::new();
  let source = r#"
    fun add(a, b) { return a + b; }
    print add(1);
  "#;
  assert_eq!(vm.interpret(source), InterpretResult::RuntimeError);
  vm.free();
}

#[test]
fn syntax_error_is_reported_as_compile_error() {
  let mut vm = VM::new();
  let result = vm.interpret("print 1 +;");
  assert_eq!(result, InterpretResult::CompileError);
  vm.free();
}

#[test]
fn clock_native_is_callable() {
  let mut vm = VM::new();
  let result = vm.interpret("print clock();");
  assert_eq!(result, InterpretResult::Ok);
  vm.free();
}
