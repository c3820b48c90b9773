//! # rlox
//!
//! Command-line entry point: a REPL when invoked with no arguments, or a
//! script runner when given a path. Mirrors clox's `main()` — read a line
//! or a whole file, hand it to the VM, and translate the result into an
//! exit code.

use std::{
  io::{self, Write},
  path::PathBuf,
  process::ExitCode,
};

use clap::Parser as ClapParser;
use rlox::vm::{InterpretResult, VM};
use tracing_subscriber::EnvFilter;

#[derive(Debug, ClapParser)]
#[command(name = "rlox", about = "A bytecode virtual machine for Lox.")]
struct Cli {
  /// Lox script to run. Omit to start an interactive REPL.
  script: Option<PathBuf>,
}

const EX_OK: u8 = 0;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let mut vm = VM::new();

  let exit_code = match cli.script {
    Some(path) => run_file(&mut vm, &path),
    None => {
      repl(&mut vm);
      EX_OK
    }
  };

  vm.free();
  ExitCode::from(exit_code)
}

/// Read-eval-print loop: one line at a time, never exits on a Lox error.
fn repl(vm: &mut VM) {
  let mut line = String::new();
  loop {
    print!("> ");
    if io::stdout().flush().is_err() {
      return;
    }

    line.clear();
    match io::stdin().read_line(&mut line) {
      Ok(0) => {
        println!();
        return;
      }
      Ok(_) => {
        vm.interpret(&line);
      }
      Err(error) => {
        tracing::error!(%error, "failed to read from stdin");
        return;
      }
    }
  }
}

/// Run a whole script file, translating the result into a process exit code.
fn run_file(vm: &mut VM, path: &PathBuf) -> u8 {
  let source = match std::fs::read_to_string(path) {
    Ok(source) => source,
    Err(error) => {
      tracing::error!(path = %path.display(), %error, "failed to read script");
      eprintln!("Could not read file \"{}\".", path.display());
      return EX_IOERR;
    }
  };

  match vm.interpret(&source) {
    InterpretResult::Ok => EX_OK,
    InterpretResult::CompileError => EX_DATAERR,
    InterpretResult::RuntimeError => EX_SOFTWARE,
  }
}
