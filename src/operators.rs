//! Operator semantics. Every binary operator dispatches on the pair of
//! operand kinds; pairs without a rule evaluate to `Null` instead of
//! failing.

use crate::ast::{BinaryOp, UnaryOp, UpdateOp};
use crate::error::EvaluationError;
use crate::value::Value;

pub fn binary(operator: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let value = match operator {
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract => subtract(left, right),
        BinaryOp::Multiply => multiply(left, right)?,
        BinaryOp::Divide => divide(left, right)?,
        BinaryOp::Remainder => numeric(left, right, |l, r| l % r),
        BinaryOp::Power => numeric(left, right, f64::powf),
        BinaryOp::Equal => Value::Boolean(same(left, right)),
        BinaryOp::NotEqual => Value::Boolean(!same(left, right)),
        BinaryOp::Greater => Value::Boolean(left.to_number() > right.to_number()),
        BinaryOp::GreaterEqual => Value::Boolean(left.to_number() >= right.to_number()),
        BinaryOp::Less => Value::Boolean(left.to_number() < right.to_number()),
        BinaryOp::LessEqual => Value::Boolean(left.to_number() <= right.to_number()),
        BinaryOp::And => Value::Boolean(!left.is_falsy() && !right.is_falsy()),
        BinaryOp::Or => Value::Boolean(!left.is_falsy() || !right.is_falsy()),
    };
    Ok(value)
}

pub fn unary(operator: UnaryOp, operand: &Value) -> Value {
    match (operator, operand) {
        (UnaryOp::Negate, Value::Number(_)) => Value::number(-operand.to_number()),
        (UnaryOp::Negate, _) => Value::Null,
        (UnaryOp::Not, _) => Value::Boolean(operand.is_falsy()),
    }
}

/// The value a `++`/`--` writes back, or `None` when the kind has no
/// update rule and the binding is left alone.
pub fn update(operator: UpdateOp, current: &Value) -> Option<Value> {
    match (operator, current) {
        (UpdateOp::Increment, Value::Number(_)) => Some(Value::number(current.to_number() + 1.0)),
        (UpdateOp::Decrement, Value::Number(_)) => Some(Value::number(current.to_number() - 1.0)),
        (UpdateOp::Decrement, Value::String(s)) => {
            let mut s = s.clone();
            s.pop();
            Some(Value::String(s))
        }
        (UpdateOp::Decrement, Value::Boolean(_)) => Some(Value::Boolean(false)),
        _ => None,
    }
}

/// `==`: same kind and same textual form.
fn same(left: &Value, right: &Value) -> bool {
    left.kind() == right.kind() && left.to_string() == right.to_string()
}

fn numeric(left: &Value, right: &Value, op: impl Fn(f64, f64) -> f64) -> Value {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => Value::number(op(left.to_number(), right.to_number())),
        _ => Value::Null,
    }
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => Value::String(format!("{}{}", left, right)),
        (Value::Number(_), Value::Number(_)) => Value::number(left.to_number() + right.to_number()),
        (Value::Boolean(l), Value::Boolean(r)) => Value::Boolean(*l || *r),
        _ => Value::Null,
    }
}

fn subtract(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Number(_), Value::Number(_))
        | (Value::Boolean(_), Value::Number(_))
        | (Value::Number(_), Value::Boolean(_)) => {
            Value::number(left.to_number() - right.to_number())
        }
        (Value::String(l), Value::String(r)) => Value::String(l.replacen(r.as_str(), "", 1)),
        // Drop the last n characters.
        (Value::String(l), Value::Number(_)) => {
            let keep = l.chars().count().saturating_sub(count(right));
            Value::String(l.chars().take(keep).collect())
        }
        // Everything from index n on.
        (Value::Number(_), Value::String(r)) => Value::String(r.chars().skip(count(left)).collect()),
        (Value::Boolean(l), Value::Boolean(r)) => Value::Boolean(*l && !*r),
        _ => Value::Null,
    }
}

fn multiply(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let value = match (left, right) {
        (Value::Number(_), Value::Number(_)) => Value::number(left.to_number() * right.to_number()),
        (Value::String(l), Value::Number(_)) => Value::String(repeat(l, right)?),
        (Value::String(l), Value::Boolean(r)) => Value::String(if *r { l.clone() } else { String::new() }),
        (Value::Number(_), Value::Boolean(r)) => {
            if *r {
                left.clone()
            } else {
                Value::number(0.0)
            }
        }
        (Value::Boolean(l), Value::Boolean(r)) => Value::Boolean(*l && *r),
        _ => Value::Null,
    };
    Ok(value)
}

/// Longest string `*` will build, in bytes.
const MAX_REPEAT_BYTES: usize = 1 << 29;

fn repeat(s: &str, times: &Value) -> Result<String, EvaluationError> {
    let n = count(times);
    match s.len().checked_mul(n) {
        Some(bytes) if bytes <= MAX_REPEAT_BYTES => Ok(s.repeat(n)),
        _ => Err(EvaluationError::InvalidCount(times.to_string())),
    }
}

fn divide(left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    let value = match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            Value::number(left.to_number() / divisor)
        }
        // Two character chunks.
        (Value::String(l), Value::Number(_)) => {
            let chars: Vec<char> = l.chars().collect();
            Value::array(
                chars
                    .chunks(2)
                    .map(|chunk| Value::String(chunk.iter().collect()))
                    .collect(),
            )
        }
        (Value::String(l), Value::String(r)) => Value::array(
            l.split(r.as_str())
                .filter(|part| !part.is_empty())
                .map(Value::string)
                .collect(),
        ),
        _ => Value::Null,
    };
    Ok(value)
}

/// A number operand used as a count: truncated, with NaN and negatives as 0.
fn count(value: &Value) -> usize {
    let n = value.to_number();
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.trunc() as usize
    }
}
