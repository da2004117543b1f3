//! Tree-walking evaluator
//!
//! Recursive descent over the AST against an environment chain. Control flow
//! (`return`/`break`/`skip`) propagates through the error channel and is
//! caught at the construct it belongs to: `Return` escapes nested blocks and
//! is unwrapped at the function/program boundary, `Break`/`Skip` only by the
//! enclosing loop.

use super::builtins;
use super::env::{self, child_env, EnvRef};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::value::{Function, Value};
use crate::ast::{Block, Expr, InfixOp, PrefixOp, Program, Stmt};
use rust_decimal::Decimal;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Function-call nesting limit. Expression nesting is covered by the
/// stack-growth guard below.
const MAX_CALL_DEPTH: usize = 10_000;

/// Stack growth parameters for deep expression recursion
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Evaluate a program against a root environment.
///
/// A `Return` signal terminates the program and its payload becomes the
/// result; a stray `break`/`skip` outside any loop surfaces as an error.
pub fn eval_program(program: &Program, env: &EnvRef) -> InterpResult<Value> {
    let mut result = Value::Null;
    for stmt in &program.statements {
        match eval_stmt(stmt, env) {
            Ok(value) => result = value,
            Err(err) => match err.kind {
                ErrorKind::Return(value) => return Ok(*value),
                _ => return Err(err),
            },
        }
    }
    Ok(result)
}

/// Evaluate a block. Signals pass through *without* unwrapping; this is
/// what lets `return` escape nested blocks but stop at the function or
/// program boundary.
fn eval_block(block: &Block, env: &EnvRef) -> InterpResult<Value> {
    let mut result = Value::Null;
    for stmt in &block.statements {
        result = eval_stmt(stmt, env)?;
    }
    Ok(result)
}

fn eval_stmt(stmt: &Stmt, env: &EnvRef) -> InterpResult<Value> {
    match stmt {
        Stmt::Let {
            name,
            value,
            constant,
        } => {
            let value = eval_expr(value, env)?;
            env.borrow_mut().declare(name, value, *constant)?;
            Ok(Value::Null)
        }
        Stmt::Return(expr) => {
            let value = match expr {
                Some(expr) => eval_expr(expr, env)?,
                None => Value::Null,
            };
            Err(RuntimeError::return_signal(value))
        }
        Stmt::Break => Err(RuntimeError::break_signal()),
        Stmt::Skip => Err(RuntimeError::skip_signal()),
        Stmt::For {
            index,
            value,
            iterable,
            body,
        } => eval_for(index.as_deref(), value, iterable, body, env),
        Stmt::Expression(expr) => eval_expr(expr, env),
    }
}

/// Evaluate an expression, growing the native stack when running low.
fn eval_expr(expr: &Expr, env: &EnvRef) -> InterpResult<Value> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || eval_expr_inner(expr, env))
}

fn eval_expr_inner(expr: &Expr, env: &EnvRef) -> InterpResult<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),

        Expr::Ident(name) => {
            if let Some(value) = env.borrow().get(name) {
                return Ok(value);
            }
            if let Some(def) = builtins::lookup(name) {
                return Ok(Value::Builtin(def));
            }
            Err(RuntimeError::undefined_variable(name))
        }

        Expr::Prefix { op, operand } => {
            let operand = eval_expr(operand, env)?;
            eval_prefix(*op, operand)
        }

        // `and`/`or` are value-returning over truthiness: the chosen
        // operand comes back unchanged, and the right side only runs when
        // the left doesn't decide.
        Expr::Infix {
            op: InfixOp::And,
            left,
            right,
        } => {
            let left = eval_expr(left, env)?;
            if !left.is_truthy() {
                Ok(left)
            } else {
                eval_expr(right, env)
            }
        }
        Expr::Infix {
            op: InfixOp::Or,
            left,
            right,
        } => {
            let left = eval_expr(left, env)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                eval_expr(right, env)
            }
        }

        Expr::Infix { op, left, right } => {
            let left = eval_expr(left, env)?;
            let right = eval_expr(right, env)?;
            eval_infix(*op, left, right, env)
        }

        Expr::Assign { name, value } => {
            let value = eval_expr(value, env)?;
            if env.borrow_mut().assign(name, value.clone())? {
                Ok(value)
            } else {
                Err(RuntimeError::undefined_variable(name))
            }
        }

        Expr::Index { left, index, value } => {
            let target = eval_expr(left, env)?;
            let index = eval_expr(index, env)?;
            match value {
                None => eval_index_read(&target, &index),
                Some(value) => {
                    let value = eval_expr(value, env)?;
                    eval_index_assign(&target, &index, value)
                }
            }
        }

        Expr::If {
            condition,
            consequence,
            alternative,
        } => {
            // Fresh frame so a `let` inside the branch doesn't leak
            let branch_env = child_env(env);
            let condition = eval_expr(condition, &branch_env)?;
            if condition.is_truthy() {
                eval_block(consequence, &branch_env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, &branch_env)
            } else {
                Ok(Value::Null)
            }
        }

        Expr::During { condition, body } => eval_during(condition, body, env),

        Expr::Function { params, body } => Ok(Value::Function(Rc::new(Function {
            params: params.clone(),
            body: body.clone(),
            env: Rc::clone(env),
        }))),

        Expr::Call { callee, args } => {
            let callee = eval_expr(callee, env)?;
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval_expr(arg, env)?);
            }
            match callee {
                Value::Function(fun) => call_function(&fun, evaluated),
                Value::Builtin(def) => (def.func)(&evaluated, env),
                other => Err(RuntimeError::not_callable(other.type_name())),
            }
        }

        Expr::Array(elements) => {
            let mut evaluated = Vec::with_capacity(elements.len());
            for element in elements {
                evaluated.push(eval_expr(element, env)?);
            }
            Ok(Value::array(evaluated))
        }

        Expr::Hash(pairs) => {
            let mut map = HashMap::with_capacity(pairs.len());
            for (key_expr, value_expr) in pairs {
                let key = eval_expr(key_expr, env)?;
                let value = eval_expr(value_expr, env)?;
                map.insert(key.hash_key()?, (key, value));
            }
            Ok(Value::hash(map))
        }
    }
}

fn eval_prefix(op: PrefixOp, operand: Value) -> InterpResult<Value> {
    match op {
        PrefixOp::Bang => Ok(Value::Bool(!operand.is_truthy())),
        PrefixOp::Minus => match operand {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            other => Err(RuntimeError::unknown_prefix_operator("-", other.type_name())),
        },
    }
}

/// Binary operators dispatch on the *pair* of operand types.
fn eval_infix(op: InfixOp, left: Value, right: Value, env: &EnvRef) -> InterpResult<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => eval_int_infix(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => eval_float_infix(op, *a, *b),
        // Mixed numeric operands promote the integer
        (Value::Int(a), Value::Float(b)) => eval_float_infix(op, *a as f64, *b),
        (Value::Float(a), Value::Int(b)) => eval_float_infix(op, *a, *b as f64),

        (Value::Decimal(a), Value::Decimal(b)) => eval_decimal_infix(op, *a, *b, env),
        (Value::Decimal(a), Value::Int(b)) => eval_decimal_infix(op, *a, Decimal::from(*b), env),
        (Value::Int(a), Value::Decimal(b)) => eval_decimal_infix(op, Decimal::from(*a), *b, env),
        (Value::Decimal(a), Value::Float(b)) => match Decimal::from_f64_retain(*b) {
            Some(b) => eval_decimal_infix(op, *a, b, env),
            None => Err(RuntimeError::value_error(format!(
                "could not convert '{b}' to DECIMAL"
            ))),
        },
        (Value::Float(a), Value::Decimal(b)) => match Decimal::from_f64_retain(*a) {
            Some(a) => eval_decimal_infix(op, a, *b, env),
            None => Err(RuntimeError::value_error(format!(
                "could not convert '{a}' to DECIMAL"
            ))),
        },

        (Value::Str(a), Value::Str(b)) => eval_str_infix(op, a, b),
        // A number next to a string is promoted to its printed form, so
        // "1" + 5 is "15" and 5 + "1" is "51".
        (Value::Str(a), Value::Int(_) | Value::Float(_)) => {
            eval_str_infix(op, a, &right.inspect())
        }
        (Value::Int(_) | Value::Float(_), Value::Str(b)) => {
            eval_str_infix(op, &left.inspect(), b)
        }

        _ => match op {
            // Equality between any other pair falls back to value/reference
            // equality instead of erroring.
            InfixOp::Eq => Ok(Value::Bool(left == right)),
            InfixOp::NotEq => Ok(Value::Bool(left != right)),
            _ if left.type_name() == right.type_name() => {
                Err(RuntimeError::unknown_infix_operator(
                    left.type_name(),
                    &op.to_string(),
                    right.type_name(),
                ))
            }
            _ => Err(RuntimeError::type_mismatch(
                left.type_name(),
                &op.to_string(),
                right.type_name(),
            )),
        },
    }
}

fn eval_int_infix(op: InfixOp, a: i64, b: i64) -> InterpResult<Value> {
    match op {
        InfixOp::Plus => Ok(Value::Int(a.wrapping_add(b))),
        InfixOp::Minus => Ok(Value::Int(a.wrapping_sub(b))),
        InfixOp::Star => Ok(Value::Int(a.wrapping_mul(b))),
        // Truncates toward zero
        InfixOp::Slash => {
            if b == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        InfixOp::Percent => {
            if b == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        InfixOp::Lt => Ok(Value::Bool(a < b)),
        InfixOp::Gt => Ok(Value::Bool(a > b)),
        InfixOp::Eq => Ok(Value::Bool(a == b)),
        InfixOp::NotEq => Ok(Value::Bool(a != b)),
        InfixOp::And | InfixOp::Or => Err(RuntimeError::unknown_infix_operator(
            "INTEGER",
            &op.to_string(),
            "INTEGER",
        )),
    }
}

fn eval_float_infix(op: InfixOp, a: f64, b: f64) -> InterpResult<Value> {
    match op {
        InfixOp::Plus => Ok(Value::Float(a + b)),
        InfixOp::Minus => Ok(Value::Float(a - b)),
        InfixOp::Star => Ok(Value::Float(a * b)),
        // IEEE semantics: division by zero yields an infinity
        InfixOp::Slash => Ok(Value::Float(a / b)),
        InfixOp::Percent => Ok(Value::Float(a % b)),
        InfixOp::Lt => Ok(Value::Bool(a < b)),
        InfixOp::Gt => Ok(Value::Bool(a > b)),
        InfixOp::Eq => Ok(Value::Bool(a == b)),
        InfixOp::NotEq => Ok(Value::Bool(a != b)),
        InfixOp::And | InfixOp::Or => Err(RuntimeError::unknown_infix_operator(
            "FLOAT",
            &op.to_string(),
            "FLOAT",
        )),
    }
}

fn eval_str_infix(op: InfixOp, a: &str, b: &str) -> InterpResult<Value> {
    match op {
        InfixOp::Plus => Ok(Value::Str(format!("{a}{b}"))),
        InfixOp::Lt => Ok(Value::Bool(a < b)),
        InfixOp::Gt => Ok(Value::Bool(a > b)),
        InfixOp::Eq => Ok(Value::Bool(a == b)),
        InfixOp::NotEq => Ok(Value::Bool(a != b)),
        _ => Err(RuntimeError::unknown_infix_operator(
            "STRING",
            &op.to_string(),
            "STRING",
        )),
    }
}

fn eval_decimal_infix(op: InfixOp, a: Decimal, b: Decimal, env: &EnvRef) -> InterpResult<Value> {
    let (prec, div_prec) = decimal_config(env)?;
    match op {
        InfixOp::Plus => Ok(Value::Decimal((a + b).round_dp(prec))),
        InfixOp::Minus => Ok(Value::Decimal((a - b).round_dp(prec))),
        InfixOp::Star => Ok(Value::Decimal((a * b).round_dp(prec))),
        InfixOp::Slash => {
            if b.is_zero() {
                return Err(RuntimeError::division_by_zero());
            }
            match a.checked_div(b) {
                Some(quotient) => Ok(Value::Decimal(quotient.round_dp(div_prec))),
                None => Err(RuntimeError::value_error("decimal overflow in division")),
            }
        }
        InfixOp::Percent => {
            if b.is_zero() {
                return Err(RuntimeError::division_by_zero());
            }
            Ok(Value::Decimal((a % b).round_dp(prec)))
        }
        InfixOp::Lt => Ok(Value::Bool(a < b)),
        InfixOp::Gt => Ok(Value::Bool(a > b)),
        InfixOp::Eq => Ok(Value::Bool(a == b)),
        InfixOp::NotEq => Ok(Value::Bool(a != b)),
        InfixOp::And | InfixOp::Or => Err(RuntimeError::unknown_infix_operator(
            "DECIMAL",
            &op.to_string(),
            "DECIMAL",
        )),
    }
}

/// Read the decimal rounding knobs from the root environment's reserved
/// `config` hash. Out-of-range values are reported, not clamped.
fn decimal_config(env: &EnvRef) -> InterpResult<(u32, u32)> {
    let root = env::root(env);
    let config = root.borrow().get(env::CONFIG_NAME);
    let Some(Value::Hash(pairs)) = config else {
        return Ok((env::DEFAULT_PREC as u32, env::DEFAULT_DIV_PREC as u32));
    };
    let pairs = pairs.borrow();

    let read = |key: &str, default: i64| -> i64 {
        match pairs.get(&super::value::HashKey::of_str(key)) {
            Some((_, Value::Int(n))) => *n,
            _ => default,
        }
    };

    let prec = read("prec", env::DEFAULT_PREC);
    if !(0..=env::MAX_PREC).contains(&prec) {
        return Err(RuntimeError::value_error(format!(
            "decimal precision out of range: prec={prec} (valid 0-{})",
            env::MAX_PREC
        )));
    }
    let div_prec = read("divPrec", env::DEFAULT_DIV_PREC);
    if !(0..=env::MAX_DIV_PREC).contains(&div_prec) {
        return Err(RuntimeError::value_error(format!(
            "decimal precision out of range: divPrec={div_prec} (valid 0-{})",
            env::MAX_DIV_PREC
        )));
    }
    Ok((prec as u32, div_prec as u32))
}

fn eval_index_read(target: &Value, index: &Value) -> InterpResult<Value> {
    match target {
        Value::Array(elements) => {
            let i = array_index(index)?;
            let elements = elements.borrow();
            if i < 0 || i as usize >= elements.len() {
                return Err(RuntimeError::index_out_of_range());
            }
            Ok(elements[i as usize].clone())
        }
        Value::Str(s) => {
            let i = array_index(index)?;
            if i < 0 {
                return Err(RuntimeError::index_out_of_range());
            }
            match s.chars().nth(i as usize) {
                Some(c) => Ok(Value::Str(c.to_string())),
                None => Err(RuntimeError::index_out_of_range()),
            }
        }
        Value::Hash(pairs) => {
            let key = index.hash_key()?;
            // An absent (but hashable) key yields null, not an error
            match pairs.borrow().get(&key) {
                Some((_, value)) => Ok(value.clone()),
                None => Ok(Value::Null),
            }
        }
        other => Err(RuntimeError {
            kind: ErrorKind::UnknownOperator,
            message: format!("index operator not supported: {}", other.type_name()),
        }),
    }
}

fn eval_index_assign(target: &Value, index: &Value, value: Value) -> InterpResult<Value> {
    match target {
        Value::Array(elements) => {
            let i = array_index(index)?;
            let mut elements = elements.borrow_mut();
            if i < 0 || i as usize >= elements.len() {
                return Err(RuntimeError::index_out_of_range());
            }
            elements[i as usize] = value.clone();
            Ok(value)
        }
        Value::Hash(pairs) => {
            let key = index.hash_key()?;
            let mut pairs = pairs.borrow_mut();
            // Keys are created by literals and builtins, not by blind
            // index-assignment.
            if !pairs.contains_key(&key) {
                return Err(RuntimeError::key_not_found(&index.inspect()));
            }
            pairs.insert(key, (index.clone(), value.clone()));
            Ok(value)
        }
        other => Err(RuntimeError {
            kind: ErrorKind::UnknownOperator,
            message: format!("index assignment not supported: {}", other.type_name()),
        }),
    }
}

fn array_index(index: &Value) -> InterpResult<i64> {
    match index {
        Value::Int(i) => Ok(*i),
        other => Err(RuntimeError::value_error(format!(
            "index must be INTEGER, got {}",
            other.type_name()
        ))),
    }
}

fn eval_during(condition: &Expr, body: &Block, env: &EnvRef) -> InterpResult<Value> {
    // One frame for the whole loop, shared by condition and body
    let loop_env = child_env(env);
    loop {
        let condition = eval_expr(condition, &loop_env)?;
        if !condition.is_truthy() {
            return Ok(Value::Null);
        }
        match eval_block(body, &loop_env) {
            Ok(_) => {}
            Err(err) => match err.kind {
                ErrorKind::Break => return Ok(Value::Null),
                // `skip` re-checks the condition rather than falling
                // through the rest of the body
                ErrorKind::Skip => continue,
                _ => return Err(err),
            },
        }
    }
}

fn eval_for(
    index: Option<&str>,
    value: &str,
    iterable: &Expr,
    body: &Block,
    env: &EnvRef,
) -> InterpResult<Value> {
    let source = eval_expr(iterable, env)?;
    // Snapshot the items so body mutations of the source array don't alias
    // the iteration itself.
    let items: Vec<(i64, Value)> = match &source {
        Value::Array(elements) => elements
            .borrow()
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, v)| (i as i64, v))
            .collect(),
        Value::Str(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i as i64, Value::Str(c.to_string())))
            .collect(),
        other => return Err(RuntimeError::not_iterable(other.type_name())),
    };

    // One frame for the entire loop, not one per iteration: a `let` in the
    // body re-executed next iteration overwrites the previous binding.
    let loop_env = child_env(env);
    for (i, item) in items {
        loop_env.borrow_mut().declare(value, item, false)?;
        if let Some(index) = index {
            loop_env.borrow_mut().declare(index, Value::Int(i), false)?;
        }
        match eval_block(body, &loop_env) {
            Ok(_) => {}
            Err(err) => match err.kind {
                ErrorKind::Break => break,
                ErrorKind::Skip => continue,
                _ => return Err(err),
            },
        }
    }
    Ok(Value::Null)
}

/// Apply a user function: bind parameters in a child of the *captured*
/// environment (not the caller's), run the body, unwrap `return`.
fn call_function(fun: &Rc<Function>, args: Vec<Value>) -> InterpResult<Value> {
    if args.len() != fun.params.len() {
        return Err(RuntimeError::wrong_arity(fun.params.len(), args.len()));
    }

    let depth = CALL_DEPTH.with(|d| {
        let depth = d.get() + 1;
        d.set(depth);
        depth
    });
    if depth > MAX_CALL_DEPTH {
        CALL_DEPTH.with(|d| d.set(d.get() - 1));
        return Err(RuntimeError::stack_overflow());
    }

    let call_env = child_env(&fun.env);
    let mut result = Ok(Value::Null);
    for (param, arg) in fun.params.iter().zip(args) {
        if let Err(err) = call_env.borrow_mut().declare(param, arg, false) {
            result = Err(err);
            break;
        }
    }
    if result.is_ok() {
        result = eval_block(&fun.body, &call_env);
    }
    CALL_DEPTH.with(|d| d.set(d.get() - 1));

    match result {
        Err(err) => match err.kind {
            ErrorKind::Return(value) => Ok(*value),
            _ => Err(err),
        },
        ok => ok,
    }
}
