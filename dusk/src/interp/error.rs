//! Runtime errors and control signals for the interpreter

use super::Value;
use std::fmt;

/// Result type for evaluation
pub type InterpResult<T> = Result<T, RuntimeError>;

/// Runtime error during evaluation.
///
/// Loop and function control (`return` / `break` / `skip`) rides the same
/// channel: the evaluator checks the kind at each construct boundary, so the
/// signals propagate out of nested blocks exactly like errors but are caught
/// (and unwrapped) by the construct they belong to.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// Identifier not bound anywhere in the environment chain
    UndefinedVariable,
    /// Operands the operator is not defined for (differing types)
    TypeMismatch,
    /// Operator undefined for a matching operand type
    UnknownOperator,
    /// Redeclaration or reassignment of a const binding
    ConstViolation,
    /// Declaration shadowing a builtin name
    ReservedName,
    /// Array index outside `[0, len-1]`
    IndexOutOfBounds,
    /// Array/Hash/Function used as a hash key
    NotHashable,
    /// Index-assignment to a hash key that does not exist
    KeyNotFound,
    /// Wrong number of call arguments
    ArityMismatch,
    /// Integer or decimal division by zero
    DivisionByZero,
    /// Call target is not a function or builtin
    NotCallable,
    /// `for` source is not an array or string
    NotIterable,
    /// Conversion or configuration value out of range
    ValueError,
    /// Evaluation recursion limit reached
    StackOverflow,
    /// Control flow: early return from a function body
    Return(Box<Value>),
    /// Control flow: terminate the innermost loop
    Break,
    /// Control flow: jump to the innermost loop's next condition check
    Skip,
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        // Discriminant comparison; Return/Break/Skip are control flow and
        // their payloads don't participate in identity.
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn undefined_variable(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedVariable,
            message: format!("identifier not found: {name}"),
        }
    }

    pub fn type_mismatch(left: &str, op: &str, right: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::TypeMismatch,
            message: format!("type mismatch: {left} {op} {right}"),
        }
    }

    pub fn unknown_infix_operator(left: &str, op: &str, right: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UnknownOperator,
            message: format!("unknown operator: {left} {op} {right}"),
        }
    }

    pub fn unknown_prefix_operator(op: &str, operand: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UnknownOperator,
            message: format!("unknown operator: {op}{operand}"),
        }
    }

    pub fn redeclare_const(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::ConstViolation,
            message: format!("Cannot redeclare constant '{name}'"),
        }
    }

    pub fn reassign_const(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::ConstViolation,
            message: format!("Cannot reassign constant '{name}'"),
        }
    }

    pub fn shadow_builtin(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::ReservedName,
            message: format!("cannot shadow builtin function '{name}'"),
        }
    }

    pub fn index_out_of_range() -> Self {
        RuntimeError {
            kind: ErrorKind::IndexOutOfBounds,
            message: "Index out of range".to_string(),
        }
    }

    pub fn not_hashable(type_name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NotHashable,
            message: format!("Type {type_name} is not hashable"),
        }
    }

    pub fn key_not_found(key: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::KeyNotFound,
            message: format!("key '{key}' not found"),
        }
    }

    /// Arity mismatch for user-defined function calls.
    pub fn wrong_arity(want: usize, got: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("wrong number of arguments: want={want}, got={got}"),
        }
    }

    /// Arity mismatch for builtin calls (historical message shape).
    pub fn builtin_arity(got: usize, want: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("wrong number of arguments. got={got}, want={want}"),
        }
    }

    pub fn division_by_zero() -> Self {
        RuntimeError {
            kind: ErrorKind::DivisionByZero,
            message: "division by zero".to_string(),
        }
    }

    pub fn not_callable(type_name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NotCallable,
            message: format!("not a function: {type_name}"),
        }
    }

    pub fn not_iterable(type_name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NotIterable,
            message: format!("'for' loop requires an array or string, got {type_name}"),
        }
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        RuntimeError {
            kind: ErrorKind::ValueError,
            message: message.into(),
        }
    }

    pub fn stack_overflow() -> Self {
        RuntimeError {
            kind: ErrorKind::StackOverflow,
            message: "stack overflow: evaluation nested too deeply".to_string(),
        }
    }

    pub fn return_signal(value: Value) -> Self {
        RuntimeError {
            kind: ErrorKind::Return(Box::new(value)),
            message: "'return' outside of function".to_string(),
        }
    }

    pub fn break_signal() -> Self {
        RuntimeError {
            kind: ErrorKind::Break,
            message: "'break' outside of loop".to_string(),
        }
    }

    pub fn skip_signal() -> Self {
        RuntimeError {
            kind: ErrorKind::Skip,
            message: "'skip' outside of loop".to_string(),
        }
    }

    /// True for the control-flow kinds, which are not user-visible errors.
    pub fn is_control(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Return(_) | ErrorKind::Break | ErrorKind::Skip
        )
    }
}
