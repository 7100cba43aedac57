//! The property value model.
//!
//! A property holds exactly one of these variants. "Absent" (a lookup miss)
//! is represented as `Option::None` at API boundaries and is never stored or
//! put on the wire.

/// A configuration property value.
///
/// Booleans are accepted on the wire but the store persists them as integers
/// 0 and 1; readers that ask for a boolean accept either form back.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The property exists but carries no data.
    Null,
    /// Boolean, a distinct wire form.
    Bool(bool),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// Double-precision floating point.
    Real(f64),
    /// UTF-8 string.
    Text(String),
    /// Unformatted binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Human-readable name of the variant, for logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::UInt(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "string",
            Value::Bytes(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
