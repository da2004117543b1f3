//! Environment chain for lexical scoping

use super::builtins;
use super::error::{InterpResult, RuntimeError};
use super::value::{BufferRef, HashKey, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Shared reference to an environment. Closures capture these, so frames may
/// outlive their lexical creation point.
pub type EnvRef = Rc<RefCell<Environment>>;

/// Reserved root binding holding the decimal configuration hash.
pub const CONFIG_NAME: &str = "config";

/// Reserved root binding holding the captured log buffer.
pub const LOG_BUFFER_NAME: &str = "bufferLogs";

/// Decimal rounding digits after `+`/`-`/`*`, default and valid upper bound.
pub const DEFAULT_PREC: i64 = 8;
pub const MAX_PREC: i64 = 8;

/// Decimal rounding digits after `/`, default and valid upper bound.
pub const DEFAULT_DIV_PREC: i64 = 16;
pub const MAX_DIV_PREC: i64 = 28;

/// One lexical frame: bindings, the names declared const here, and the
/// parent frame.
#[derive(Debug, Default)]
pub struct Environment {
    store: HashMap<String, Value>,
    consts: HashSet<String>,
    outer: Option<EnvRef>,
}

impl Environment {
    /// Empty frame with no parent. Use [`Environment::new_root`] for
    /// top-level evaluation; this constructor is the bare building block.
    pub fn new() -> Self {
        Environment::default()
    }

    /// Root frame for one top-level evaluation, seeded with the reserved
    /// `config` hash (decimal precision knobs). Never share one across
    /// logical evaluations.
    pub fn new_root() -> EnvRef {
        let mut env = Environment::new();

        let mut config = HashMap::new();
        config.insert(
            HashKey::of_str("prec"),
            (Value::Str("prec".to_string()), Value::Int(DEFAULT_PREC)),
        );
        config.insert(
            HashKey::of_str("divPrec"),
            (Value::Str("divPrec".to_string()), Value::Int(DEFAULT_DIV_PREC)),
        );
        env.store.insert(CONFIG_NAME.to_string(), Value::hash(config));

        env.into_ref()
    }

    /// New frame with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            store: HashMap::new(),
            consts: HashSet::new(),
            outer: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Look up a name, walking innermost frame outward; first match wins.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.get(name) {
            Some(value.clone())
        } else if let Some(outer) = &self.outer {
            outer.borrow().get(name)
        } else {
            None
        }
    }

    /// Bind a name in *this* frame (`let`/`const` always introduce a fresh
    /// local binding, never an outer mutation).
    ///
    /// Errors when the name is a reserved builtin or already const in this
    /// frame. Redeclaring a non-const name here simply overwrites it.
    pub fn declare(&mut self, name: &str, value: Value, constant: bool) -> InterpResult<()> {
        if builtins::is_builtin(name) {
            return Err(RuntimeError::shadow_builtin(name));
        }
        if self.consts.contains(name) {
            return Err(RuntimeError::redeclare_const(name));
        }
        self.store.insert(name.to_string(), value);
        if constant {
            self.consts.insert(name.to_string());
        }
        Ok(())
    }

    /// Reassign via `=`: locate the *owning* frame (the nearest one whose
    /// own store holds the name) and mutate there. Returns false when the
    /// name is bound nowhere in the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> InterpResult<bool> {
        if self.store.contains_key(name) {
            if self.consts.contains(name) {
                return Err(RuntimeError::reassign_const(name));
            }
            self.store.insert(name.to_string(), value);
            Ok(true)
        } else if let Some(outer) = &self.outer {
            outer.borrow_mut().assign(name, value)
        } else {
            Ok(false)
        }
    }

    /// True when the name is bound const in its owning frame.
    pub fn is_const(&self, name: &str) -> bool {
        if self.store.contains_key(name) {
            self.consts.contains(name)
        } else if let Some(outer) = &self.outer {
            outer.borrow().is_const(name)
        } else {
            false
        }
    }

    fn outer(&self) -> Option<EnvRef> {
        self.outer.clone()
    }
}

/// Create a child frame of `parent`
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}

/// Walk to the outermost frame
pub fn root(env: &EnvRef) -> EnvRef {
    let mut current = Rc::clone(env);
    loop {
        let outer = current.borrow().outer();
        match outer {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// The root frame's log buffer, created on first use. Logs from nested and
/// closure calls all land here, visible to the top-level caller.
pub fn root_buffer(env: &EnvRef) -> BufferRef {
    let root = root(env);
    let existing = match root.borrow().get(LOG_BUFFER_NAME) {
        Some(Value::Buffer(buffer)) => Some(buffer),
        _ => None,
    };
    match existing {
        Some(buffer) => buffer,
        None => {
            let buffer: BufferRef = Rc::new(RefCell::new(Vec::new()));
            root.borrow_mut()
                .store
                .insert(LOG_BUFFER_NAME.to_string(), Value::Buffer(Rc::clone(&buffer)));
            buffer
        }
    }
}
