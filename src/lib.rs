//! A small line-oriented shell.
//!
//! Each input line is split on `|` into at most two stages and on whitespace into
//! arguments. The first stage is checked against the builtins (`exit`, `hello`);
//! anything else is launched as an external program, or as two programs joined by a
//! pipe. There is no quoting, globbing, redirection or job control.
//!
//! The main entry point is [`Interpreter`]. [`Interpreter::repl`] runs the loop on
//! the terminal through [`rustyline`]; [`Interpreter::run_loop`] accepts any
//! [`LineSource`] and output stream, which is how the loop is tested.

pub mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod external;
mod interpreter;
pub mod lexer;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Flow, Interpreter, LineSource, RustylineSource};
