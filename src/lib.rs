//! Core library for the Selene scripting language runtime and tooling.
//! Implements lexing, parsing, evaluation, and REPL utilities.

pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, SeleneError, SourcePos};
pub use repl::Repl;
pub use runtime::Interpreter;
pub use value::Value;
