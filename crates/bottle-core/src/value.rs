//! Decoded Bottle values

use core::fmt;

use serde::Serialize;

use crate::errors::DecodeFault;
use crate::tag::Tag;

/// One decoded Bottle element
///
/// Serializes as `{"type": ..., "value": ...}`. `CompactStringList` only ever
/// holds `String` elements, optionally followed by a single trailing `Error`
/// when the buffer ran out part way through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Vocab32(i32),
    Float32(f32),
    Float64(f64),
    String(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
    CompactStringList(Vec<Value>),
    /// Decoder could not interpret this element
    Error(DecodeFault),
}

impl Value {
    /// Wire tag of this value, `None` for error markers
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Value::Int8(_) => Some(Tag::Int8),
            Value::Int16(_) => Some(Tag::Int16),
            Value::Int32(_) => Some(Tag::Int32),
            Value::Vocab32(_) => Some(Tag::Vocab32),
            Value::Float32(_) => Some(Tag::Float32),
            Value::Float64(_) => Some(Tag::Float64),
            Value::String(_) => Some(Tag::String),
            Value::Blob(_) => Some(Tag::Blob),
            Value::List(_) => Some(Tag::List),
            Value::CompactStringList(_) => Some(Tag::CompactStringList),
            Value::Error(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.tag().map_or("ERROR", Tag::name)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload of any integer-like variant
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) | Value::Vocab32(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Elements of either list layout
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::CompactStringList(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements().and_then(|items| items.get(index))
    }

    /// First decode fault found anywhere inside this value
    pub fn first_fault(&self) -> Option<&DecodeFault> {
        match self {
            Value::Error(fault) => Some(fault),
            Value::List(items) | Value::CompactStringList(items) => {
                items.iter().find_map(Value::first_fault)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Vocab32(v) => write!(f, "[{}]", vocab_text(*v)),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) if s.is_empty() || s.contains(char::is_whitespace) => {
                write!(f, "{:?}", s)
            }
            Value::String(s) => f.write_str(s),
            Value::Blob(bytes) => {
                f.write_str("{")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", b)?;
                }
                f.write_str("}")
            }
            Value::List(items) | Value::CompactStringList(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Value::Error(fault) => write!(f, "<error: {}>", fault),
        }
    }
}

/// Render a vocab code as its packed ASCII characters
fn vocab_text(code: i32) -> String {
    code.to_le_bytes()
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| char::from(*b))
        .collect()
}
