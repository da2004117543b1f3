//! Integration tests for the Dusk interpreter
//!
//! Drives the full pipeline through the public API: source text in, value or
//! error message out, the way the CLI and REPL use it.

use dusk::interp::{env, Environment, Interpreter};
use dusk::{eval_program, parse, Value};

/// Evaluate a full program against a fresh root environment.
fn run(source: &str) -> Result<Value, String> {
    let (program, errors) = parse(source);
    if let Some(err) = errors.first() {
        return Err(format!("parse error: {err}"));
    }
    let root = Environment::new_root();
    eval_program(&program, &root).map_err(|e| e.to_string())
}

fn run_value(source: &str) -> Value {
    match run(source) {
        Ok(value) => value,
        Err(err) => panic!("unexpected error for {source:?}: {err}"),
    }
}

fn run_error(source: &str) -> String {
    match run(source) {
        Err(err) => err,
        Ok(value) => panic!("expected error for {source:?}, got {value:?}"),
    }
}

fn parse_errors(source: &str) -> Vec<String> {
    let (_, errors) = parse(source);
    errors.iter().map(|e| e.to_string()).collect()
}

// ============================================
// Programs end to end
// ============================================

#[test]
fn test_fibonacci() {
    let source = "
        let fib = fun(n): {
            if n < 2: { return n; }
            fib(n - 1) + fib(n - 2)
        };
        fib(10)";
    assert_eq!(run_value(source), Value::Int(55));
}

#[test]
fn test_map_with_closure() {
    let source = "
        let map = fun(xs, f): {
            let out = [];
            for x in xs: { push(out, f(x)); }
            out
        };
        let doubled = map([1, 2, 3], fun(x): { x * 2 });
        doubled[0] + doubled[1] + doubled[2]";
    assert_eq!(run_value(source), Value::Int(12));
}

#[test]
fn test_counter_closure_shares_state() {
    let source = "
        let make = fun(): {
            let n = 0;
            {\"inc\": fun(): { n = n + 1; n }, \"get\": fun(): { n }}
        };
        let c = make();
        c[\"inc\"]();
        c[\"inc\"]();
        c[\"get\"]()";
    assert_eq!(run_value(source), Value::Int(2));
}

#[test]
fn test_during_with_skip_and_break() {
    let source = "
        let x = 0;
        during x < 100: {
            x = x + 1;
            if x % 2 == 0: { skip; }
            if x == 9: { break; }
        }
        x";
    assert_eq!(run_value(source), Value::Int(9));
}

#[test]
fn test_nested_loops_signals_bind_innermost() {
    let source = "
        let total = 0;
        for i in range(3): {
            for j in range(10): {
                if j == 2: { break; }
                total = total + 1;
            }
        }
        total";
    assert_eq!(run_value(source), Value::Int(6));
}

#[test]
fn test_top_level_return_short_circuits() {
    assert_eq!(run_value("return 1 + 2; logs(\"never\"); 99;"), Value::Int(3));
}

// ============================================
// Scoping, const, shadowing
// ============================================

#[test]
fn test_shadowing_in_inner_scope() {
    let source = "
        let x = 1;
        if true: {
            let x = 2;
            x = 3;
        }
        x";
    assert_eq!(run_value(source), Value::Int(1));
}

#[test]
fn test_const_visible_but_shadowable_in_child() {
    let source = "
        const x = 1;
        let y = 0;
        if true: {
            let x = 10;
            y = x;
        }
        y + x";
    assert_eq!(run_value(source), Value::Int(11));
}

#[test]
fn test_const_violations() {
    assert_eq!(run_error("const a = 1; a = 2;"), "Cannot reassign constant 'a'");
    assert_eq!(
        run_error("const a = 1; const a = 2;"),
        "Cannot redeclare constant 'a'"
    );
    assert_eq!(run_error("let range = 1;"), "cannot shadow builtin function 'range'");
}

#[test]
fn test_assignment_without_declaration_fails() {
    assert_eq!(run_error("y = 3;"), "identifier not found: y");
}

// ============================================
// Reference semantics
// ============================================

#[test]
fn test_array_aliasing_through_function_call() {
    let source = "
        let mutate = fun(xs): { xs[0] = 99; };
        let a = [1, 2];
        mutate(a);
        a[0]";
    assert_eq!(run_value(source), Value::Int(99));
}

#[test]
fn test_copy_breaks_aliasing() {
    let source = "
        let a = [1, 2];
        let b = copy(a);
        b[0] = 99;
        a[0]";
    assert_eq!(run_value(source), Value::Int(1));
}

#[test]
fn test_copy_of_hash_is_independent() {
    let source = "
        let h = {\"n\": 1};
        let g = copy(h);
        g[\"n\"] = 2;
        h[\"n\"]";
    assert_eq!(run_value(source), Value::Int(1));
}

#[test]
fn test_equality_is_identity_for_collections() {
    assert_eq!(run_value("let a = [1]; let b = a; a == b"), Value::Bool(true));
    assert_eq!(run_value("let a = [1]; a == copy(a)"), Value::Bool(false));
    assert_eq!(run_value("let h = {}; let g = h; h == g"), Value::Bool(true));
}

// ============================================
// Builtins
// ============================================

#[test]
fn test_array_builtins() {
    assert_eq!(run_value("length([1, 2, 3])"), Value::Int(3));
    assert_eq!(run_value("length(\"hello\")"), Value::Int(5));
    assert_eq!(run_value("first([1, 2])"), Value::Int(1));
    assert_eq!(run_value("last([1, 2])"), Value::Int(2));
    assert_eq!(run_value("first([])"), Value::Null);
    assert_eq!(run_value("let a = [1]; push(a, 2); length(a)"), Value::Int(2));
    assert_eq!(run_value("let a = [1, 2]; pop(a)"), Value::Int(2));
    assert_eq!(run_value("let a = [1, 2]; shift(a); a[0]"), Value::Int(2));
    assert_eq!(run_value("let a = [2]; unshift(a, 1); a[0]"), Value::Int(1));
    assert_eq!(run_value("length(range(5))"), Value::Int(5));
    assert_eq!(run_value("range(2, 5)[0]"), Value::Int(2));
}

#[test]
fn test_conversion_builtins() {
    assert_eq!(run_value("int(\"42\")"), Value::Int(42));
    assert_eq!(run_value("int(3.9)"), Value::Int(3));
    assert_eq!(run_value("float(2)"), Value::Float(2.0));
    assert_eq!(run_value("str(42)"), Value::Str("42".into()));
    assert_eq!(run_value("bool(0)"), Value::Bool(false));
    assert_eq!(run_value("bool(\"\")"), Value::Bool(true));
    assert_eq!(run_value("typeof(1)"), Value::Str("INTEGER".into()));
    assert_eq!(run_value("typeof([])"), Value::Str("ARRAY".into()));
}

#[test]
fn test_conversion_errors() {
    assert_eq!(run_error("int(\"abc\")"), "could not convert 'abc' to INTEGER");
    assert_eq!(
        run_error("length(5)"),
        "argument to `length` not supported, got INTEGER"
    );
    assert_eq!(
        run_error("length()"),
        "wrong number of arguments. got=0, want=1"
    );
    assert_eq!(
        run_error("range()"),
        "wrong number of arguments. got=0, want=1 or 2"
    );
}

#[test]
fn test_del_builtin() {
    assert_eq!(run_value("let a = [1, 2, 3]; del(a, 1)"), Value::Int(2));
    assert_eq!(run_value("let a = [1, 2, 3]; del(a, 1); length(a)"), Value::Int(2));
    assert_eq!(run_value("let h = {\"a\": 1}; del(h, \"a\")"), Value::Int(1));
    assert_eq!(run_value("let h = {\"a\": 1}; del(h, \"b\")"), Value::Null);
    assert_eq!(run_error("let a = [1]; del(a, 5)"), "Index out of range");
}

// ============================================
// Coercion and equality
// ============================================

#[test]
fn test_string_number_coercion() {
    assert_eq!(run_value("\"1\" + 5"), Value::Str("15".into()));
    assert_eq!(run_value("5 + \"1\""), Value::Str("51".into()));
    assert_eq!(run_value("5.5 + \"1\""), Value::Str("5.51".into()));
}

#[test]
fn test_mixed_equality_never_errors() {
    assert_eq!(run_value("1 == \"1\""), Value::Bool(false));
    assert_eq!(run_value("null != false"), Value::Bool(true));
    assert_eq!(run_value("[1] == 1"), Value::Bool(false));
}

#[test]
fn test_logical_operators_return_values() {
    assert_eq!(run_value("\"\" or \"fallback\""), Value::Str("".into()));
    assert_eq!(run_value("0 or \"fallback\""), Value::Str("fallback".into()));
    assert_eq!(run_value("1 and [2][0]"), Value::Int(2));
}

// ============================================
// Hashes
// ============================================

#[test]
fn test_hash_key_types() {
    let source = "
        let h = {\"name\": \"dusk\", 1: \"one\", true: \"yes\"};
        h[\"na\" + \"me\"] + \" \" + h[1] + \" \" + h[true]";
    assert_eq!(run_value(source), Value::Str("dusk one yes".into()));
}

#[test]
fn test_hash_missing_key_reads_null_but_assign_errors() {
    assert_eq!(run_value("{\"a\": 1}[\"b\"]"), Value::Null);
    assert_eq!(run_error("let h = {}; h[\"x\"] = 1;"), "key 'x' not found");
}

#[test]
fn test_unhashable_key_errors() {
    assert_eq!(run_error("{[1, 2]: 1}"), "Type ARRAY is not hashable");
    assert_eq!(
        run_error("let f = fun(): { 1 }; {f: 1}"),
        "Type FUNCTION is not hashable"
    );
}

// ============================================
// Decimal arithmetic and config
// ============================================

#[test]
fn test_decimal_exact_addition() {
    assert_eq!(run_value("str(decimal(\"0.1\") + decimal(\"0.2\"))"), Value::Str("0.3".into()));
}

#[test]
fn test_decimal_division_precision_configurable() {
    assert_eq!(
        run_value("config[\"divPrec\"] = 3; str(decimal(1) / decimal(3))"),
        Value::Str("0.333".into())
    );
}

#[test]
fn test_decimal_config_out_of_range() {
    assert_eq!(
        run_error("config[\"prec\"] = -1; decimal(1) + decimal(1)"),
        "decimal precision out of range: prec=-1 (valid 0-8)"
    );
}

#[test]
fn test_config_is_a_root_binding() {
    assert_eq!(run_value("config[\"prec\"]"), Value::Int(8));
    assert_eq!(run_value("config[\"divPrec\"]"), Value::Int(16));
}

// ============================================
// Log capture
// ============================================

#[test]
fn test_logs_surface_through_interpreter() {
    let (program, errors) = parse("logs(\"hello\", 1 + 1); logs([1, 2]);");
    assert!(errors.is_empty());
    let mut interp = Interpreter::new();
    interp.run(&program).unwrap();
    assert_eq!(
        interp.drain_logs(),
        vec!["hello 2".to_string(), "[1, 2]".to_string()]
    );
}

#[test]
fn test_log_buffer_readable_inside_program() {
    // The buffer lives under a reserved root binding, visible to programs
    assert_eq!(run_value("logs(\"a\"); logs(\"b\"); bufferLogs").inspect(), "a\nb");
}

#[test]
fn test_logs_from_failed_program_are_kept() {
    let (program, errors) = parse("logs(\"before\"); missing;");
    assert!(errors.is_empty());
    let mut interp = Interpreter::new();
    let err = interp.run(&program).unwrap_err();
    assert_eq!(err.to_string(), "identifier not found: missing");
    assert_eq!(interp.drain_logs(), vec!["before".to_string()]);
}

#[test]
fn test_log_buffer_binding_name() {
    let (program, errors) = parse("logs(\"x\");");
    assert!(errors.is_empty());
    let mut interp = Interpreter::new();
    interp.run(&program).unwrap();
    let buffer = interp.env().borrow().get(env::LOG_BUFFER_NAME);
    assert!(matches!(buffer, Some(Value::Buffer(_))));
}

// ============================================
// Parse errors through the pipeline
// ============================================

#[test]
fn test_parse_error_messages() {
    assert_eq!(
        parse_errors("let = 5;")[0],
        "expected next token to be an identifier, got '=' instead"
    );
    assert_eq!(
        parse_errors("for _, _ in xs: { }")[0],
        "cannot use two underscores"
    );
    assert_eq!(
        parse_errors("for _ in xs: { }")[0],
        "cannot use underscore as a variable identifier"
    );
}

#[test]
fn test_curly_quotes_accepted() {
    assert_eq!(run_value("\u{201C}ok\u{201D}"), Value::Str("ok".into()));
}

// ============================================
// Recursion limit
// ============================================

#[test]
fn test_unbounded_recursion_reports_overflow() {
    assert_eq!(
        run_error("let f = fun(): { f() }; f()"),
        "stack overflow: evaluation nested too deeply"
    );
}
