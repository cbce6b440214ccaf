//! Data flowing through read and create

use serde_json::Value;

/// Either raw bytes or a decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Bytes(Vec<u8>),
    Value(Value),
}

impl Content {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Bytes(bytes) => Some(bytes),
            Content::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Content::Value(value) => Some(value),
            Content::Bytes(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Content::Bytes(bytes) => Some(bytes),
            Content::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Content::Value(value) => Some(value),
            Content::Bytes(_) => None,
        }
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, Content::Bytes(_))
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Bytes(bytes.to_vec())
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Value(value)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Value(Value::String(text.to_string()))
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Value(Value::String(text))
    }
}

/// Short name of a value's JSON type, for error messages
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
