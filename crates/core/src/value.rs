//! Loosely typed flag and argument values.
//!
//! Flags arrive from the argv parser as strings, numbers or booleans, and
//! environment variables always arrive as strings. Options and arguments
//! declare the type they want and values are coerced into it.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Declared type of an option or positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

/// A flag, environment or argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    List(Vec<Value>),
}

impl Value {
    /// Coerces this value into `value_type`.
    ///
    /// Strings parse into numbers (non-numeric input yields `NaN`), any value
    /// converts into a boolean by truthiness, and everything stringifies.
    /// Lists coerce element-wise.
    #[must_use]
    pub fn coerce(&self, value_type: ValueType) -> Value {
        if let Value::List(items) = self {
            return Value::List(items.iter().map(|item| item.coerce(value_type)).collect());
        }

        match value_type {
            ValueType::String => Value::String(self.to_string()),
            ValueType::Boolean => Value::Boolean(self.is_truthy()),
            ValueType::Number => Value::Number(self.to_number()),
        }
    }

    /// Splits a string value on `delimiter` and coerces every piece.
    ///
    /// Non-string values are coerced as a scalar.
    #[must_use]
    pub fn split_and_coerce(&self, delimiter: &str, value_type: ValueType) -> Value {
        match self {
            Value::String(raw) => Value::List(
                raw.split(delimiter)
                    .map(|piece| Value::String(piece.to_string()).coerce(value_type))
                    .collect(),
            ),
            other => other.coerce(value_type),
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
            Value::List(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::String(s) => parse_number(s),
            Value::Number(n) => *n,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::List(_) => f64::NAN,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Parses a number the way the argv parser and option coercion expect.
///
/// Surrounding whitespace is ignored and the empty string is zero.
#[must_use]
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    if looks_numeric(trimmed) {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// True for plain decimal literals such as `42`, `-1.5` or `3e8`.
///
/// Rust's float parser also accepts `inf` and `nan`, which are not numbers
/// on the command line.
#[must_use]
pub fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
        && raw.parse::<f64>().is_ok()
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => formatter.write_str(s),
            Value::Number(n) => write_number(formatter, *n),
            Value::Boolean(b) => write!(formatter, "{b}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        formatter.write_str(",")?;
                    }
                    write!(formatter, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_number(formatter: &mut Formatter<'_>, n: f64) -> std::fmt::Result {
    if n.is_nan() {
        formatter.write_str("NaN")
    } else if n.is_infinite() {
        formatter.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        // Whole numbers print without a trailing `.0`
        write!(formatter, "{}", n as i64)
    } else {
        write!(formatter, "{n}")
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}
