//! Tree-walking interpreter: values, environments, builtins, evaluator.

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod value;

pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::eval_program;
pub use value::{Function, HashKey, Value};

use crate::ast::Program;

/// Session-scoped interpreter: one root environment reused across inputs, so
/// bindings, config changes, and captured logs persist between evaluations.
/// The REPL holds one of these; `run` uses a fresh one per file.
pub struct Interpreter {
    env: EnvRef,
    logs_seen: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            env: Environment::new_root(),
            logs_seen: 0,
        }
    }

    /// The root environment of this session.
    pub fn env(&self) -> &EnvRef {
        &self.env
    }

    /// Evaluate a program against the session's root environment.
    pub fn run(&mut self, program: &Program) -> InterpResult<Value> {
        eval_program(program, &self.env)
    }

    /// Log lines appended since the previous drain.
    pub fn drain_logs(&mut self) -> Vec<String> {
        let buffer = env::root_buffer(&self.env);
        let lines = buffer.borrow();
        let fresh = lines[self.logs_seen..].to_vec();
        self.logs_seen = lines.len();
        fresh
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn program(source: &str) -> Program {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        program
    }

    #[test]
    fn test_bindings_persist_across_runs() {
        let mut interp = Interpreter::new();
        interp.run(&program("let x = 40;")).unwrap();
        let result = interp.run(&program("x + 2")).unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn test_consts_persist_across_runs() {
        let mut interp = Interpreter::new();
        interp.run(&program("const k = 1;")).unwrap();
        let err = interp.run(&program("k = 2;")).unwrap_err();
        assert_eq!(err.to_string(), "Cannot reassign constant 'k'");
    }

    #[test]
    fn test_drain_logs_returns_only_new_lines() {
        let mut interp = Interpreter::new();
        interp.run(&program("logs(\"a\");")).unwrap();
        assert_eq!(interp.drain_logs(), vec!["a".to_string()]);

        interp.run(&program("logs(\"b\"); logs(\"c\");")).unwrap();
        assert_eq!(interp.drain_logs(), vec!["b".to_string(), "c".to_string()]);
        assert!(interp.drain_logs().is_empty());
    }

    #[test]
    fn test_separate_sessions_are_isolated() {
        let mut first = Interpreter::new();
        let mut second = Interpreter::new();
        first.run(&program("let x = 1;")).unwrap();
        let err = second.run(&program("x")).unwrap_err();
        assert_eq!(err.to_string(), "identifier not found: x");
    }
}
