//! Runtime values for the interpreter

use super::builtins::BuiltinDef;
use super::env::EnvRef;
use super::error::{InterpResult, RuntimeError};
use crate::ast::Block;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable array storage. Every binding holding the same array
/// aliases this storage; index-assignment and the mutating builtins write
/// through it.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable hash storage: structural key → (original key, value).
pub type HashRef = Rc<RefCell<HashMap<HashKey, (Value, Value)>>>;

/// Captured log lines, held by the root environment.
pub type BufferRef = Rc<RefCell<Vec<String>>>;

/// A user function value: parameters, body, and the environment captured at
/// the definition site (the closure).
pub struct Function {
    pub params: Vec<String>,
    pub body: Block,
    pub env: EnvRef,
}

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    Bool(bool),
    Null,
    Array(ArrayRef),
    Hash(HashRef),
    Function(Rc<Function>),
    Builtin(&'static BuiltinDef),
    Buffer(BufferRef),
}

impl Value {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Decimal(_) => "DECIMAL",
            Value::Str(_) => "STRING",
            Value::Bool(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Buffer(_) => "BUFFER",
        }
    }

    /// Condition rule: an integer is truthy iff non-zero, a boolean is its
    /// own value, and everything else (null included) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            _ => true,
        }
    }

    /// User-visible rendering. Strings render without quotes; this is also
    /// the text used when a number is coerced into a string operand.
    pub fn inspect(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(elements) => {
                let elems: Vec<String> =
                    elements.borrow().iter().map(|v| v.inspect()).collect();
                format!("[{}]", elems.join(", "))
            }
            Value::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .borrow()
                    .values()
                    .map(|(k, v)| format!("{}: {}", k.inspect(), v.inspect()))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Value::Function(fun) => {
                format!("fun({}): {}", fun.params.join(", "), fun.body)
            }
            Value::Builtin(def) => format!("builtin function '{}'", def.name),
            Value::Buffer(lines) => lines.borrow().join("\n"),
        }
    }

    /// Structural key for use in a hash, or an error for unhashable types.
    pub fn hash_key(&self) -> InterpResult<HashKey> {
        match self {
            Value::Int(n) => Ok(HashKey {
                tag: KeyTag::Int,
                value: *n as u64,
            }),
            Value::Bool(b) => Ok(HashKey {
                tag: KeyTag::Bool,
                value: u64::from(*b),
            }),
            Value::Str(s) => Ok(HashKey::of_str(s)),
            other => Err(RuntimeError::not_hashable(other.type_name())),
        }
    }

    /// Fresh array value
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Fresh hash value
    pub fn hash(pairs: HashMap<HashKey, (Value, Value)>) -> Value {
        Value::Hash(Rc::new(RefCell::new(pairs)))
    }
}

/// Structural hash key: `(type tag, 64-bit content hash)`. Two strings with
/// identical content produce identical keys regardless of which Value
/// instance they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub tag: KeyTag,
    pub value: u64,
}

/// Which value type produced a hash key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTag {
    Int,
    Bool,
    Str,
}

impl HashKey {
    /// Key for a string, infallible (used for the reserved config entries).
    pub fn of_str(s: &str) -> HashKey {
        HashKey {
            tag: KeyTag::Str,
            value: fnv1a(s.as_bytes()),
        }
    }
}

/// FNV-1a 64-bit content hash
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

impl PartialEq for Value {
    /// Value equality for scalars, reference identity for composites.
    /// `copy(a) == a` is false even when the contents match.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Buffer(a), Value::Buffer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inspect())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A closure's captured environment can reference the closure itself,
        // so Function debug output stays shallow.
        match self {
            Value::Function(fun) => write!(f, "Function({})", fun.params.join(", ")),
            Value::Str(s) => write!(f, "Str({s:?})"),
            other => write!(f, "{}({})", other.type_name(), other.inspect()),
        }
    }
}
