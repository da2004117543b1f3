//! Builtin function registry
//!
//! A fixed name → native-function table consumed by the evaluator. The names
//! are reserved: `let`/`const` cannot bind them at any scope.

use super::env::{self, EnvRef};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::value::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Native function signature. The environment is passed through so `logs`
/// can reach the root frame's buffer.
pub type BuiltinFn = fn(&[Value], &EnvRef) -> InterpResult<Value>;

/// One registry entry
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: BuiltinFn,
    pub description: &'static str,
}

/// The registry. Read-only and safe to share across evaluations.
pub static BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "length",
        func: builtin_length,
        description: "number of elements in an array or hash, or characters in a string",
    },
    BuiltinDef {
        name: "first",
        func: builtin_first,
        description: "first element of an array, null when empty",
    },
    BuiltinDef {
        name: "last",
        func: builtin_last,
        description: "last element of an array, null when empty",
    },
    BuiltinDef {
        name: "skipFirst",
        func: builtin_skip_first,
        description: "new array without the first element",
    },
    BuiltinDef {
        name: "skipLast",
        func: builtin_skip_last,
        description: "new array without the last element",
    },
    BuiltinDef {
        name: "push",
        func: builtin_push,
        description: "append an element to an array in place",
    },
    BuiltinDef {
        name: "pop",
        func: builtin_pop,
        description: "remove and return the last element of an array",
    },
    BuiltinDef {
        name: "shift",
        func: builtin_shift,
        description: "remove and return the first element of an array",
    },
    BuiltinDef {
        name: "unshift",
        func: builtin_unshift,
        description: "prepend an element to an array in place",
    },
    BuiltinDef {
        name: "range",
        func: builtin_range,
        description: "array of consecutive integers: range(end) or range(start, end)",
    },
    BuiltinDef {
        name: "del",
        func: builtin_del,
        description: "remove an array index or hash key in place",
    },
    BuiltinDef {
        name: "typeof",
        func: builtin_typeof,
        description: "type name of a value",
    },
    BuiltinDef {
        name: "copy",
        func: builtin_copy,
        description: "shallow copy of an array or hash (a fresh reference)",
    },
    BuiltinDef {
        name: "int",
        func: builtin_int,
        description: "convert to integer",
    },
    BuiltinDef {
        name: "float",
        func: builtin_float,
        description: "convert to float",
    },
    BuiltinDef {
        name: "bool",
        func: builtin_bool,
        description: "convert to boolean via truthiness",
    },
    BuiltinDef {
        name: "str",
        func: builtin_str,
        description: "convert to string",
    },
    BuiltinDef {
        name: "decimal",
        func: builtin_decimal,
        description: "convert to arbitrary-precision decimal",
    },
    BuiltinDef {
        name: "logs",
        func: builtin_logs,
        description: "append rendered arguments to the captured log buffer",
    },
];

/// Find a builtin by name
pub fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.iter().find(|def| def.name == name)
}

/// True when the name is reserved by the registry
pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

fn expect_arity(args: &[Value], want: usize) -> InterpResult<()> {
    if args.len() != want {
        return Err(RuntimeError::builtin_arity(args.len(), want));
    }
    Ok(())
}

fn unsupported(builtin: &str, got: &Value) -> RuntimeError {
    RuntimeError::value_error(format!(
        "argument to `{builtin}` not supported, got {}",
        got.type_name()
    ))
}

fn builtin_length(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(elements) => Ok(Value::Int(elements.borrow().len() as i64)),
        Value::Hash(pairs) => Ok(Value::Int(pairs.borrow().len() as i64)),
        other => Err(unsupported("length", other)),
    }
}

fn builtin_first(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            Ok(elements.borrow().first().cloned().unwrap_or(Value::Null))
        }
        other => Err(unsupported("first", other)),
    }
}

fn builtin_last(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            Ok(elements.borrow().last().cloned().unwrap_or(Value::Null))
        }
        other => Err(unsupported("last", other)),
    }
}

fn builtin_skip_first(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            let elements = elements.borrow();
            if elements.is_empty() {
                return Ok(Value::Null);
            }
            Ok(Value::array(elements[1..].to_vec()))
        }
        other => Err(unsupported("skipFirst", other)),
    }
}

fn builtin_skip_last(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            let elements = elements.borrow();
            if elements.is_empty() {
                return Ok(Value::Null);
            }
            Ok(Value::array(elements[..elements.len() - 1].to_vec()))
        }
        other => Err(unsupported("skipLast", other)),
    }
}

fn builtin_push(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => {
            elements.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(unsupported("push", other)),
    }
}

fn builtin_pop(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            Ok(elements.borrow_mut().pop().unwrap_or(Value::Null))
        }
        other => Err(unsupported("pop", other)),
    }
}

fn builtin_shift(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            let mut elements = elements.borrow_mut();
            if elements.is_empty() {
                return Ok(Value::Null);
            }
            Ok(elements.remove(0))
        }
        other => Err(unsupported("shift", other)),
    }
}

fn builtin_unshift(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => {
            elements.borrow_mut().insert(0, args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(unsupported("unshift", other)),
    }
}

fn builtin_range(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("wrong number of arguments. got={}, want=1 or 2", args.len()),
        });
    }
    let mut bounds = Vec::with_capacity(2);
    for arg in args {
        match arg {
            Value::Int(n) => bounds.push(*n),
            other => return Err(unsupported("range", other)),
        }
    }
    let (start, end) = match bounds[..] {
        [end] => (0, end),
        [start, end] => (start, end),
        _ => (0, 0),
    };
    let elements: Vec<Value> = (start..end).map(Value::Int).collect();
    Ok(Value::array(elements))
}

fn builtin_del(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => {
            let index = match &args[1] {
                Value::Int(i) => *i,
                other => return Err(unsupported("del", other)),
            };
            let mut elements = elements.borrow_mut();
            if index < 0 || index as usize >= elements.len() {
                return Err(RuntimeError::index_out_of_range());
            }
            Ok(elements.remove(index as usize))
        }
        Value::Hash(pairs) => {
            let key = args[1].hash_key()?;
            match pairs.borrow_mut().remove(&key) {
                Some((_, value)) => Ok(value),
                None => Ok(Value::Null),
            }
        }
        other => Err(unsupported("del", other)),
    }
}

fn builtin_typeof(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    Ok(Value::Str(args[0].type_name().to_string()))
}

fn builtin_copy(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(Value::array(elements.borrow().clone())),
        Value::Hash(pairs) => Ok(Value::hash(pairs.borrow().clone())),
        other => Ok(other.clone()),
    }
}

fn builtin_int(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(x) => Ok(Value::Int(*x as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Decimal(d) => d
            .trunc()
            .to_i64()
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::value_error("decimal out of integer range")),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::value_error(format!("could not convert '{s}' to INTEGER"))
        }),
        other => Err(unsupported("int", other)),
    }
}

fn builtin_float(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(*b)))),
        Value::Decimal(d) => d
            .to_f64()
            .map(Value::Float)
            .ok_or_else(|| RuntimeError::value_error("decimal out of float range")),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::value_error(format!("could not convert '{s}' to FLOAT"))
        }),
        other => Err(unsupported("float", other)),
    }
}

fn builtin_bool(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    Ok(Value::Bool(args[0].is_truthy()))
}

fn builtin_str(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    Ok(Value::Str(args[0].inspect()))
}

fn builtin_decimal(args: &[Value], _env: &EnvRef) -> InterpResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Decimal(d) => Ok(Value::Decimal(*d)),
        Value::Int(n) => Ok(Value::Decimal(Decimal::from(*n))),
        Value::Float(x) => Decimal::from_f64_retain(*x)
            .map(Value::Decimal)
            .ok_or_else(|| {
                RuntimeError::value_error(format!("could not convert '{x}' to DECIMAL"))
            }),
        Value::Str(s) => s.trim().parse::<Decimal>().map(Value::Decimal).map_err(|_| {
            RuntimeError::value_error(format!("could not convert '{s}' to DECIMAL"))
        }),
        other => Err(unsupported("decimal", other)),
    }
}

/// Renders all arguments into one line of the root environment's log
/// buffer. Returns null; the host reads the buffer after evaluation.
fn builtin_logs(args: &[Value], env: &EnvRef) -> InterpResult<Value> {
    let line = args
        .iter()
        .map(|v| v.inspect())
        .collect::<Vec<String>>()
        .join(" ");
    env::root_buffer(env).borrow_mut().push(line);
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::env::Environment;

    fn call(name: &str, args: &[Value]) -> InterpResult<Value> {
        let env = Environment::new_root();
        (lookup(name).unwrap().func)(args, &env)
    }

    #[test]
    fn test_registry_lookup() {
        assert!(is_builtin("length"));
        assert!(is_builtin("logs"));
        assert!(!is_builtin("missing"));
    }

    #[test]
    fn test_length() {
        assert_eq!(call("length", &[Value::Str("hello".into())]).unwrap(), Value::Int(5));
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call("length", &[arr]).unwrap(), Value::Int(2));
        let err = call("length", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "argument to `length` not supported, got INTEGER");
    }

    #[test]
    fn test_arity_message() {
        let err = call("length", &[]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of arguments. got=0, want=1");
    }

    #[test]
    fn test_first_last_empty() {
        let empty = Value::array(vec![]);
        assert_eq!(call("first", &[empty.clone()]).unwrap(), Value::Null);
        assert_eq!(call("last", &[empty]).unwrap(), Value::Null);
    }

    #[test]
    fn test_push_mutates_in_place() {
        let arr = Value::array(vec![Value::Int(1)]);
        let alias = arr.clone();
        call("push", &[arr, Value::Int(2)]).unwrap();
        match alias {
            Value::Array(elements) => assert_eq!(elements.borrow().len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_pop_and_shift() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call("pop", &[arr.clone()]).unwrap(), Value::Int(3));
        assert_eq!(call("shift", &[arr.clone()]).unwrap(), Value::Int(1));
        match arr {
            Value::Array(elements) => {
                assert_eq!(*elements.borrow(), vec![Value::Int(2)]);
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_range() {
        let result = call("range", &[Value::Int(3)]).unwrap();
        assert_eq!(result.inspect(), "[0, 1, 2]");
        let result = call("range", &[Value::Int(2), Value::Int(5)]).unwrap();
        assert_eq!(result.inspect(), "[2, 3, 4]");
        // Empty when start >= end
        let result = call("range", &[Value::Int(5), Value::Int(2)]).unwrap();
        assert_eq!(result.inspect(), "[]");
    }

    #[test]
    fn test_copy_returns_fresh_reference() {
        let arr = Value::array(vec![Value::Int(1)]);
        let copied = call("copy", &[arr.clone()]).unwrap();
        assert_ne!(arr, copied);
        assert_eq!(copied.inspect(), "[1]");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", &[Value::Str(" 42 ".into())]).unwrap(), Value::Int(42));
        assert_eq!(call("int", &[Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert_eq!(call("float", &[Value::Int(2)]).unwrap(), Value::Float(2.0));
        assert_eq!(call("str", &[Value::Int(7)]).unwrap(), Value::Str("7".into()));
        assert_eq!(call("bool", &[Value::Int(0)]).unwrap(), Value::Bool(false));
        assert_eq!(call("bool", &[Value::Str("".into())]).unwrap(), Value::Bool(true));
        let err = call("int", &[Value::Str("abc".into())]).unwrap_err();
        assert_eq!(err.to_string(), "could not convert 'abc' to INTEGER");
    }

    #[test]
    fn test_decimal_conversion() {
        let d = call("decimal", &[Value::Str("1.25".into())]).unwrap();
        assert_eq!(d.inspect(), "1.25");
        assert_eq!(d.type_name(), "DECIMAL");
    }

    #[test]
    fn test_typeof() {
        assert_eq!(
            call("typeof", &[Value::array(vec![])]).unwrap(),
            Value::Str("ARRAY".into())
        );
    }

    #[test]
    fn test_del() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call("del", &[arr.clone(), Value::Int(0)]).unwrap(), Value::Int(1));
        assert_eq!(arr.inspect(), "[2]");
        let err = call("del", &[arr, Value::Int(5)]).unwrap_err();
        assert_eq!(err.to_string(), "Index out of range");
    }

    #[test]
    fn test_logs_appends_to_root_buffer() {
        let env = Environment::new_root();
        let logs = lookup("logs").unwrap().func;
        logs(&[Value::Str("x is".into()), Value::Int(3)], &env).unwrap();
        logs(&[Value::Int(4)], &env).unwrap();

        let buffer = env::root_buffer(&env);
        assert_eq!(*buffer.borrow(), vec!["x is 3".to_string(), "4".to_string()]);
    }
}
