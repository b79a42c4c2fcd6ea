//! Built-in functions
//!
//! The standard native library installed into every global environment when
//! `builtins` is enabled.

use crate::error::RuntimeErrorKind;
use crate::runtime::value::{Arity, NativeFunction, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

type NativeResult = std::result::Result<Value, RuntimeErrorKind>;

/// Built-in function registry
#[derive(Debug, Clone)]
pub struct Builtins {
    functions: HashMap<String, NativeFunction>,
}

impl Builtins {
    /// Create a new builtins registry
    pub fn new() -> Self {
        let mut functions = HashMap::new();

        register_core_functions(&mut functions);
        register_math_functions(&mut functions);
        register_string_functions(&mut functions);
        register_array_functions(&mut functions);

        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeFunction> {
        self.functions.values()
    }

    /// Call a built-in function by name
    pub fn call(&self, name: &str, args: &[Value]) -> NativeResult {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.to_string()))?;
        if !function.arity.accepts(args.len()) {
            return Err(RuntimeErrorKind::Arity {
                expected: function.arity,
                got: args.len(),
            });
        }
        function.call(args)
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

fn register(
    map: &mut HashMap<String, NativeFunction>,
    name: &str,
    arity: Arity,
    func: fn(&[Value]) -> NativeResult,
) {
    map.insert(name.to_string(), NativeFunction::new(name, arity, func));
}

/// Register type and introspection functions
fn register_core_functions(map: &mut HashMap<String, NativeFunction>) {
    register(map, "clock", Arity::Exact(0), builtin_clock);
    register(map, "type", Arity::Exact(1), builtin_type);
    register(map, "assert", Arity::Range { min: 1, max: 2 }, builtin_assert);
}

/// Register math functions
fn register_math_functions(map: &mut HashMap<String, NativeFunction>) {
    register(map, "abs", Arity::Exact(1), builtin_abs);
    register(map, "floor", Arity::Exact(1), builtin_floor);
    register(map, "sqrt", Arity::Exact(1), builtin_sqrt);
    register(map, "min", Arity::Exact(2), builtin_min);
    register(map, "max", Arity::Exact(2), builtin_max);
}

/// Register string conversion functions
fn register_string_functions(map: &mut HashMap<String, NativeFunction>) {
    register(map, "str", Arity::Exact(1), builtin_str);
    register(map, "num", Arity::Exact(1), builtin_num);
    register(map, "len", Arity::Exact(1), builtin_len);
}

/// Register array functions
fn register_array_functions(map: &mut HashMap<String, NativeFunction>) {
    register(map, "push", Arity::Exact(2), builtin_push);
    register(map, "pop", Arity::Exact(1), builtin_pop);
}

fn number_arg(name: &str, args: &[Value], index: usize) -> Result<f64, RuntimeErrorKind> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(RuntimeErrorKind::TypeMismatch(format!(
            "{}() expects a number, got {}.",
            name,
            other.type_name()
        ))),
        None => Err(RuntimeErrorKind::Native(format!("{}() is missing an argument.", name))),
    }
}

// ---- core ----

fn builtin_clock(_args: &[Value]) -> NativeResult {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| RuntimeErrorKind::Native(format!("clock() failed: {}", err)))?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

fn builtin_type(args: &[Value]) -> NativeResult {
    Ok(Value::string(args[0].type_name()))
}

fn builtin_assert(args: &[Value]) -> NativeResult {
    if args[0].is_truthy() {
        return Ok(Value::Nil);
    }
    let message = args
        .get(1)
        .map(|message| message.to_string())
        .unwrap_or_else(|| "condition was false".to_string());
    Err(RuntimeErrorKind::AssertionFailed(message))
}

// ---- math ----

fn builtin_abs(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number_arg("abs", args, 0)?.abs()))
}

fn builtin_floor(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
}

fn builtin_sqrt(args: &[Value]) -> NativeResult {
    Ok(Value::Number(number_arg("sqrt", args, 0)?.sqrt()))
}

fn builtin_min(args: &[Value]) -> NativeResult {
    let a = number_arg("min", args, 0)?;
    let b = number_arg("min", args, 1)?;
    Ok(Value::Number(a.min(b)))
}

fn builtin_max(args: &[Value]) -> NativeResult {
    let a = number_arg("max", args, 0)?;
    let b = number_arg("max", args, 1)?;
    Ok(Value::Number(a.max(b)))
}

// ---- strings ----

fn builtin_str(args: &[Value]) -> NativeResult {
    Ok(Value::string(args[0].to_string()))
}

fn builtin_num(args: &[Value]) -> NativeResult {
    Ok(match &args[0] {
        Value::Number(n) => Value::Number(*n),
        Value::Str(s) => s.trim().parse::<f64>().map_or(Value::Nil, Value::Number),
        Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        _ => Value::Nil,
    })
}

fn builtin_len(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(values) => Ok(Value::Number(values.borrow().len() as f64)),
        other => Err(RuntimeErrorKind::TypeMismatch(format!(
            "len() expects a string or array, got {}.",
            other.type_name()
        ))),
    }
}

// ---- arrays ----

fn builtin_push(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Array(values) => {
            let mut values = values.borrow_mut();
            values.push(args[1].clone());
            Ok(Value::Number(values.len() as f64))
        }
        other => Err(RuntimeErrorKind::TypeMismatch(format!(
            "push() expects an array, got {}.",
            other.type_name()
        ))),
    }
}

fn builtin_pop(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Array(values) => Ok(values.borrow_mut().pop().unwrap_or(Value::Nil)),
        other => Err(RuntimeErrorKind::TypeMismatch(format!(
            "pop() expects an array, got {}.",
            other.type_name()
        ))),
    }
}
