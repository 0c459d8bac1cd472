//! Bottle type tags
//!
//! On the wire a tag is an `int32` built from bit flags, so the list layouts
//! are written as `LIST | <element code>`. Here that arithmetic is resolved
//! once, in [`Tag::from_code`], into a closed set of variants.

use serde::Serialize;

use crate::errors::DecodeFault;

// ----------------------------------------------------------------------------
// Wire Codes
// ----------------------------------------------------------------------------

pub const TAG_INT8: i32 = 32;
pub const TAG_INT16: i32 = 64;
pub const TAG_INT32: i32 = 1;
pub const TAG_INT64: i32 = 1 + 16;
pub const TAG_VOCAB32: i32 = 1 + 8;
pub const TAG_FLOAT32: i32 = 128;
pub const TAG_FLOAT64: i32 = 2 + 8;
pub const TAG_STRING: i32 = 4;
pub const TAG_BLOB: i32 = 4 + 8;
pub const TAG_LIST: i32 = 256;
pub const TAG_DICT: i32 = 512;

// ----------------------------------------------------------------------------
// Tag
// ----------------------------------------------------------------------------

/// Every tag this client can dispatch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Int8,
    Int16,
    Int32,
    Int64,
    Vocab32,
    Float32,
    Float64,
    String,
    Blob,
    List,
    /// `LIST | STRING`: elements carry no tag of their own
    CompactStringList,
    Dict,
}

impl Tag {
    pub fn code(self) -> i32 {
        match self {
            Tag::Int8 => TAG_INT8,
            Tag::Int16 => TAG_INT16,
            Tag::Int32 => TAG_INT32,
            Tag::Int64 => TAG_INT64,
            Tag::Vocab32 => TAG_VOCAB32,
            Tag::Float32 => TAG_FLOAT32,
            Tag::Float64 => TAG_FLOAT64,
            Tag::String => TAG_STRING,
            Tag::Blob => TAG_BLOB,
            Tag::List => TAG_LIST,
            Tag::CompactStringList => TAG_LIST | TAG_STRING,
            Tag::Dict => TAG_DICT,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, DecodeFault> {
        match code {
            TAG_INT8 => Ok(Tag::Int8),
            TAG_INT16 => Ok(Tag::Int16),
            TAG_INT32 => Ok(Tag::Int32),
            TAG_INT64 => Ok(Tag::Int64),
            TAG_VOCAB32 => Ok(Tag::Vocab32),
            TAG_FLOAT32 => Ok(Tag::Float32),
            TAG_FLOAT64 => Ok(Tag::Float64),
            TAG_STRING => Ok(Tag::String),
            TAG_BLOB => Ok(Tag::Blob),
            TAG_LIST => Ok(Tag::List),
            c if c == TAG_LIST | TAG_STRING => Ok(Tag::CompactStringList),
            TAG_DICT => Ok(Tag::Dict),
            c if c > 0 && c & TAG_LIST != 0 => Err(DecodeFault::UnsupportedCombination { tag: c }),
            c => Err(DecodeFault::UnknownTag { tag: c }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Int8 => "INT8",
            Tag::Int16 => "INT16",
            Tag::Int32 => "INT32",
            Tag::Int64 => "INT64",
            Tag::Vocab32 => "VOCAB32",
            Tag::Float32 => "FLOAT32",
            Tag::Float64 => "FLOAT64",
            Tag::String => "STRING",
            Tag::Blob => "BLOB",
            Tag::List => "LIST",
            Tag::CompactStringList => "LIST|STRING",
            Tag::Dict => "DICT",
        }
    }
}
