//! Dusk interpreter library
//!
//! A small dynamically typed scripting language: lexer, Pratt parser, and a
//! tree-walking evaluator with closures, reference-semantics collections,
//! and decimal arithmetic.

pub mod ast;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;

pub use interp::{eval_program, Environment, Interpreter, RuntimeError, Value};
pub use parser::{parse, ParseError};
