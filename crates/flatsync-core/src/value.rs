//! Value representation for the flatsync engine.
//!
//! Every cell that flows through parse, validation, and write is one of the
//! five storage-class variants defined here. Parsers produce `Value`s, the
//! validator inspects them, and stores bind them positionally into prepared
//! statements.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt;

/// A single cell value.
///
/// `Value` mirrors the storage classes of the relational store: there is no
/// dedicated boolean or datetime variant. Formats that carry such values map
/// them onto these five at parse time (booleans become 0/1 integers, nested
/// structures become their serialized text).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null / absent value
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Real(f64),

    /// UTF-8 text
    Text(String),

    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value is null or empty text.
    ///
    /// Delimited sources carry missing cells as empty text rather than null,
    /// so "has the caller supplied anything here" needs both checks.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Coerce this value to a number, the way range checks see it.
    ///
    /// Integers and reals convert directly; text is parsed after trimming.
    /// Null, blobs, and non-numeric text yield `None`.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert a JSON value into a `Value`.
    ///
    /// Booleans map to 0/1 integers, integral numbers to `Integer`, other
    /// numbers to `Real`, and nested arrays/objects to text holding their
    /// compact JSON serialization.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Convert this value into a JSON value.
    ///
    /// Non-finite reals have no JSON representation and become null; blobs
    /// become base64 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Blob(b) => serde_json::Value::String(BASE64.encode(b)),
        }
    }
}

/// Canonical text rendering: nulls render empty, blobs render as base64.
///
/// This rendering is what delimited output, schema inference samples, and
/// the enum/unique rule comparisons all see.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => f.write_str(&BASE64.encode(b)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text(String::new()).is_blank());
        assert!(!Value::Text("x".to_string()).is_blank());
        assert!(!Value::Integer(0).is_blank());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(Value::Integer(42).coerce_number(), Some(42.0));
        assert_eq!(Value::Real(1.5).coerce_number(), Some(1.5));
        assert_eq!(Value::Text(" 37 ".to_string()).coerce_number(), Some(37.0));
        assert_eq!(Value::Text("abc".to_string()).coerce_number(), None);
        assert_eq!(Value::Null.coerce_number(), None);
        assert_eq!(Value::Blob(vec![1]).coerce_number(), None);
    }

    #[test]
    fn test_display_rendering() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "hi");
        // base64 of [0x00, 0xff]
        assert_eq!(Value::Blob(vec![0x00, 0xff]).to_string(), "AP8=");
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from_json(&serde_json::json!(true)), Value::Integer(1));
        assert_eq!(Value::from_json(&serde_json::json!(false)), Value::Integer(0));
        assert_eq!(Value::from_json(&serde_json::json!(12)), Value::Integer(12));
        assert_eq!(Value::from_json(&serde_json::json!(1.25)), Value::Real(1.25));
        assert_eq!(
            Value::from_json(&serde_json::json!("text")),
            Value::Text("text".to_string())
        );
    }

    #[test]
    fn test_from_json_nested_becomes_text() {
        let v = Value::from_json(&serde_json::json!({"a": [1, 2]}));
        assert_eq!(v, Value::Text(r#"{"a":[1,2]}"#.to_string()));

        let v = Value::from_json(&serde_json::json!([1, "x"]));
        assert_eq!(v, Value::Text(r#"[1,"x"]"#.to_string()));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Integer(5).to_json(), serde_json::json!(5));
        assert_eq!(Value::Real(0.5).to_json(), serde_json::json!(0.5));
        assert_eq!(Value::Real(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::Text("a".to_string()).to_json(),
            serde_json::json!("a")
        );
        assert_eq!(Value::Blob(vec![0x00, 0xff]).to_json(), serde_json::json!("AP8="));
    }
}
