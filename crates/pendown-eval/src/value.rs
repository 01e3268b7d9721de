//! Runtime values and the closed type registry.

use crate::error::{EvalError, EvalResult};
use pendown_types::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of runtime types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Boolean,
    String,
    Null,
}

impl ValueType {
    /// Stable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
            ValueType::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged runtime value.
///
/// Numbers are always held at the widest floating representation. Values
/// of different tags never compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Null,
}

impl TypedValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Number(_) => ValueType::Number,
            TypedValue::Boolean(_) => ValueType::Boolean,
            TypedValue::String(_) => ValueType::String,
            TypedValue::Null => ValueType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Coerce to a number; only Numbers qualify.
    pub fn as_number(&self, span: Span) -> EvalResult<f64> {
        match self {
            TypedValue::Number(n) => Ok(*n),
            other => Err(EvalError::TypeMismatch {
                expected: ValueType::Number,
                found: other.value_type(),
                span,
            }),
        }
    }

    /// Coerce to a boolean: nonzero numbers are true, zero is false.
    pub fn as_bool(&self, span: Span) -> EvalResult<bool> {
        match self {
            TypedValue::Boolean(b) => Ok(*b),
            TypedValue::Number(n) => Ok(*n != 0.0),
            other => Err(EvalError::TypeMismatch {
                expected: ValueType::Boolean,
                found: other.value_type(),
                span,
            }),
        }
    }

    /// Borrow the string payload.
    pub fn as_str(&self, span: Span) -> EvalResult<&str> {
        match self {
            TypedValue::String(s) => Ok(s),
            other => Err(EvalError::TypeMismatch {
                expected: ValueType::String,
                found: other.value_type(),
                span,
            }),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            TypedValue::Number(n) => write!(f, "{n}"),
            TypedValue::Boolean(b) => write!(f, "{b}"),
            TypedValue::String(s) => f.write_str(s),
            TypedValue::Null => f.write_str("null"),
        }
    }
}

impl From<f64> for TypedValue {
    fn from(n: f64) -> Self {
        TypedValue::Number(n)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Boolean(b)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coerces_to_bool() {
        let span = Span::default();
        assert!(TypedValue::Number(2.5).as_bool(span).unwrap());
        assert!(TypedValue::Number(-1.0).as_bool(span).unwrap());
        assert!(!TypedValue::Number(0.0).as_bool(span).unwrap());
    }

    #[test]
    fn test_string_does_not_coerce_to_number() {
        let err = TypedValue::from("7").as_number(Span::point(2, 3)).unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                expected: ValueType::Number,
                found: ValueType::String,
                span: Span::point(2, 3),
            }
        );
    }

    #[test]
    fn test_null_does_not_coerce_to_bool() {
        assert!(TypedValue::Null.as_bool(Span::default()).is_err());
    }

    #[test]
    fn test_equality_requires_matching_tags() {
        assert_eq!(TypedValue::Number(1.0), TypedValue::Number(1.0));
        assert_ne!(TypedValue::Number(1.0), TypedValue::Boolean(true));
        assert_ne!(TypedValue::from("1"), TypedValue::Number(1.0));
        assert_eq!(TypedValue::Null, TypedValue::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(TypedValue::Number(3.0).to_string(), "3");
        assert_eq!(TypedValue::Number(-0.5).to_string(), "-0.5");
        assert_eq!(TypedValue::Boolean(false).to_string(), "false");
        assert_eq!(TypedValue::from("hi").to_string(), "hi");
        assert_eq!(TypedValue::Null.to_string(), "null");
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(TypedValue::Number(0.0).value_type().name(), "number");
        assert_eq!(TypedValue::Null.value_type(), ValueType::Null);
    }
}
