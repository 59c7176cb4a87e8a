use crate::callable::{Function, NativeFunction};
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Null,
    Array,
    Function,
    NativeFunction,
}

#[derive(Clone, Debug)]
pub enum Value {
    /// Canonical decimal text. Literals keep their source spelling, results
    /// of arithmetic are formatted with [`format_number`].
    Number(String),
    String(String),
    Boolean(bool),
    Null,
    Array(Rc<Vec<Value>>),
    Function(Rc<Function>),
    NativeFunction(NativeFunction),
}

impl Value {
    pub fn number(x: f64) -> Value {
        Value::Number(format_number(x))
    }
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(elements))
    }
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
            Value::Array(_) => ValueKind::Array,
            Value::Function(_) => ValueKind::Function,
            Value::NativeFunction(_) => ValueKind::NativeFunction,
        }
    }
    /// Numeric reading used by arithmetic and ordering. Booleans count as
    /// 1 and 0; anything without a numeric reading is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(x) | Value::String(x) => parse_float(x),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => f64::NAN,
        }
    }
    /// Conditions hold when the textual form is exactly `true`, so the
    /// string `"true"` counts as well.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::String(s) => s == "true",
            _ => false,
        }
    }
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Boolean(b) => !*b,
            Value::Null => true,
            Value::Number(x) => parse_float(x) == 0.0,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
    /// Element at `position` (truncated toward zero). Arrays yield their
    /// element, strings a one character string; everything else, and any
    /// position out of range, yields `Null`.
    pub fn index(&self, position: f64) -> Value {
        if !position.is_finite() || position < 0.0 {
            return Value::Null;
        }
        let i = position.trunc() as usize;
        match self {
            Value::Array(elements) => elements.get(i).cloned().unwrap_or(Value::Null),
            Value::String(s) => s
                .chars()
                .nth(i)
                .map_or(Value::Null, |c| Value::String(c.to_string())),
            _ => Value::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Null, Value::Null) => true,
            (Value::Array(l), Value::Array(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::NativeFunction(l), Value::NativeFunction(r)) => l.name == r.name,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match element {
                        Value::String(s) => write!(f, "\"{}\"", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "{}", function),
            Value::NativeFunction(native) => write!(f, "{}", native),
        }
    }
}

/// Decimal text for a computed number: integers without a fraction,
/// `NaN`, `Infinity`, and no negative zero. Magnitudes from 1e21 up and
/// below 1e-6 use exponent form with an explicit sign (`1e+21`, `1e-7`).
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        String::from("NaN")
    } else if x.is_infinite() {
        String::from(if x > 0.0 { "Infinity" } else { "-Infinity" })
    } else if x == 0.0 {
        String::from("0")
    } else if (1e-6..1e21).contains(&x.abs()) {
        x.to_string()
    } else {
        let text = format!("{:e}", x);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    }
}

/// Reads the longest numeric prefix of `text` (after leading whitespace),
/// e.g. `"12px"` is 12. No numeric prefix at all gives NaN.
pub fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let whole = digits(end);
    end += whole;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits(end + 1);
        if whole > 0 || fraction > 0 {
            end += 1 + fraction;
        }
    }
    if whole == 0 && fraction == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    text[..end].parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use crate::value::{format_number, parse_float, Value, ValueKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(3.0, "3")]
    #[case(-0.0, "0")]
    #[case(2.5, "2.5")]
    #[case(0.1 + 0.2, "0.30000000000000004")]
    #[case(-12.0, "-12")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::INFINITY, "Infinity")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    #[case(2f64.powi(100), "1.2676506002282294e+30")]
    #[case(1e21, "1e+21")]
    #[case(-1e21, "-1e+21")]
    #[case(1e20, "100000000000000000000")]
    #[case(1e-7, "1e-7")]
    #[case(1.5e-10, "1.5e-10")]
    #[case(0.000001, "0.000001")]
    fn formats_like_decimal_text(#[case] x: f64, #[case] text: &str) {
        assert_eq!(format_number(x), text);
    }

    #[rstest]
    #[case("42", 42.0)]
    #[case("  -3.5", -3.5)]
    #[case("12px", 12.0)]
    #[case(".5", 0.5)]
    #[case("7.", 7.0)]
    #[case("1e3", 1000.0)]
    #[case("2e", 2.0)]
    #[case("-Infinity", f64::NEG_INFINITY)]
    fn parses_numeric_prefix(#[case] text: &str, #[case] expected: f64) {
        assert_eq!(parse_float(text), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("-")]
    #[case(".")]
    #[case("true")]
    fn no_numeric_prefix_is_nan(#[case] text: &str) {
        assert!(parse_float(text).is_nan());
    }

    #[test]
    fn number_literals_keep_their_text() {
        let v = Value::Number("007".to_string());
        assert_eq!(v.to_string(), "007");
        assert_eq!(v.to_number(), 7.0);
    }

    #[test]
    fn falsy_values() {
        assert!(Value::Boolean(false).is_falsy());
        assert!(Value::Null.is_falsy());
        assert!(Value::Number("0".to_string()).is_falsy());
        assert!(Value::Number("0.0".to_string()).is_falsy());
        assert!(Value::string("").is_falsy());
        assert!(!Value::string("0").is_falsy());
        assert!(!Value::number(1.0).is_falsy());
        assert!(!Value::array(vec![]).is_falsy());
    }

    #[test]
    fn conditions_hold_for_textual_true() {
        assert!(Value::Boolean(true).is_true());
        assert!(Value::string("true").is_true());
        assert!(!Value::Boolean(false).is_true());
        assert!(!Value::number(1.0).is_true());
        assert!(!Value::string("True").is_true());
        assert!(!Value::string(" true").is_true());
        assert!(!Value::array(vec![Value::Boolean(true)]).is_true());
    }

    #[test]
    fn exponent_text_reads_back() {
        assert_eq!(parse_float(&format_number(1e21)), 1e21);
        assert_eq!(parse_float(&format_number(1e-7)), 1e-7);
    }

    #[test]
    fn array_textual_form() {
        let v = Value::array(vec![
            Value::number(1.0),
            Value::string("a"),
            Value::Null,
            Value::array(vec![Value::Boolean(true)]),
        ]);
        assert_eq!(v.to_string(), "[1, \"a\", null, [true]]");
    }

    #[test]
    fn indexing() {
        let xs = Value::array(vec![Value::number(10.0), Value::number(20.0)]);
        assert_eq!(xs.index(1.0), Value::number(20.0));
        assert_eq!(xs.index(1.9), Value::number(20.0));
        assert_eq!(xs.index(2.0), Value::Null);
        assert_eq!(xs.index(-1.0), Value::Null);
        assert_eq!(xs.index(f64::NAN), Value::Null);
        assert_eq!(Value::string("héllo").index(1.0), Value::string("é"));
        assert_eq!(Value::number(5.0).index(0.0), Value::Null);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ValueKind::NativeFunction.to_string(), "native_function");
        assert_eq!(Value::Null.kind().to_string(), "null");
        assert_eq!(Value::string("x").kind(), ValueKind::String);
    }
}
