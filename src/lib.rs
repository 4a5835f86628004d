//! Core library for the `lispr` language: a tokenizer, a recursive-descent
//! parser and an evaluator over a single value type that is both AST and
//! runtime datum.

pub mod builtin;
pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod value;

pub use builtin::BuiltinRegistry;
pub use diagnostics::{EvalError, LexError, LispError, ParseError};
pub use environment::{Environment, EnvironmentRef};
pub use repl::Repl;
pub use runtime::{apply, eval, ExecutionContext, Interpreter};
pub use value::{Value, ValueKind};
