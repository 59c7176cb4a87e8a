//! Built-ins bound in the root scope before any program runs.

use crate::callable::{NativeFn, NativeFunction};
use crate::environment::Environments;
use crate::error::{EvaluationError, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;
use rand::RngExt;
use std::f64::consts;
use std::io::{BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const VERSION: &str = "0.0.1";

const NATIVES: [(&str, NativeFn); 10] = [
    ("print", print),
    ("clear", clear),
    ("rand", random),
    ("timestamp", timestamp),
    ("number", number),
    ("string", string),
    ("boolean", boolean),
    ("length", length),
    ("type", type_of),
    ("input", input),
];

pub fn install(environments: &mut Environments) {
    environments.define_builtin("PI", Value::number(consts::PI), false);
    environments.define_builtin("E", Value::number(consts::E), false);
    environments.define_builtin("version", Value::string(VERSION), false);
    for (name, call) in NATIVES {
        environments.define_builtin(name, Value::NativeFunction(NativeFunction { name, call }), true);
    }
    debug!(natives = NATIVES.len(), "installed standard library");
}

fn first<'a>(function: &'static str, arguments: &'a [Value]) -> Result<&'a Value, EvaluationError> {
    arguments.first().ok_or(EvaluationError::MissingArgument {
        function,
        expected: 1,
    })
}

fn print(interpreter: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let line = arguments
        .iter()
        .map(Value::to_string)
        .collect::<Vec<String>>()
        .join(" ");
    writeln!(interpreter.output(), "{}", line)?;
    Ok(Value::Null)
}

fn clear(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let out = interpreter.output();
    write!(out, "\x1b[2J\x1b[1;1H")?;
    out.flush()?;
    Ok(Value::Null)
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_millis() as f64)
}

/// `rand("number")` scales by the current time, `rand("boolean")` flips a
/// coin, anything else gives a short hex string.
fn random(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let mut rng = rand::rng();
    let hint = arguments.first().map(Value::to_string).unwrap_or_default();
    let value = match hint.as_str() {
        "number" => Value::number((rng.random::<f64>() * now_millis()).round()),
        "boolean" => Value::Boolean(rng.random::<bool>()),
        _ => Value::String(format!("{:x}", rng.random::<u64>() >> 12)),
    };
    Ok(value)
}

fn timestamp(_: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::number(now_millis()))
}

/// Whole-string conversion: surrounding whitespace is ignored, an empty
/// string is 0 and anything that is not entirely a number is NaN.
fn parse_strict(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

fn number(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let value = match first("number", arguments)? {
        n @ Value::Number(_) => n.clone(),
        Value::String(s) => Value::number(parse_strict(s)),
        Value::Boolean(b) => Value::number(if *b { 1.0 } else { 0.0 }),
        Value::Null => Value::number(0.0),
        _ => Value::number(f64::NAN),
    };
    Ok(value)
}

fn string(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(first("string", arguments)?.to_string()))
}

fn boolean(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let value = match first("boolean", arguments)? {
        b @ Value::Boolean(_) => b.clone(),
        n @ Value::Number(_) => {
            let x = n.to_number();
            Value::Boolean(x != 0.0 && !x.is_nan())
        }
        Value::String(s) => Value::Boolean(!s.is_empty()),
        _ => Value::Boolean(false),
    };
    Ok(value)
}

fn length(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let n = match first("length", arguments)? {
        Value::String(s) => s.chars().count(),
        Value::Number(text) => text.chars().count(),
        Value::Boolean(_) => 1,
        Value::Array(elements) => elements.len(),
        Value::Function(function) => function.arity(),
        Value::Null | Value::NativeFunction(_) => 0,
    };
    Ok(Value::number(n as f64))
}

fn type_of(_: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(first("type", arguments)?.kind().to_string()))
}

/// Writes the prompt, then blocks for one line of input without its
/// line terminator. End of input reads as an empty string.
fn input(interpreter: &mut Interpreter, arguments: &[Value]) -> Result<Value, RuntimeError> {
    if let Some(prompt) = arguments.first() {
        let out = interpreter.output();
        write!(out, "{}", prompt)?;
        out.flush()?;
    }
    let mut line = String::new();
    interpreter.input().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Value::String(line))
}
