//! Error types for the Bottle protocol core
//!
//! Two families live here. [`BottleError`] is the ordinary `Result` error for
//! operations that fail outright (encoding an oversized word, an invalid
//! state machine transition). [`DecodeFault`] is not raised at all: the
//! decoder embeds it in a [`crate::Value::Error`] marker so a partially
//! understood reply can still be inspected.

use serde::Serialize;

// ----------------------------------------------------------------------------
// Core Error
// ----------------------------------------------------------------------------

/// Core error types for the Bottle protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BottleError {
    #[error("Word {index} is {len} bytes long (max: {max})")]
    WordTooLong { index: usize, len: usize, max: usize },

    #[error("{count} words do not fit an int32 count field")]
    TooManyWords { count: usize },

    #[error("Word {index} contains a character outside Latin-1")]
    NotLatin1 { index: usize },

    #[error("Invalid control frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid transition from {state} on event {event}")]
    InvalidState { state: String, event: String },

    #[error("Malformed nameserver response: {0}")]
    MalformedResponse(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl BottleError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        BottleError::MalformedResponse(reason.into())
    }
}

pub type Result<T> = core::result::Result<T, BottleError>;

// ----------------------------------------------------------------------------
// Decode Faults
// ----------------------------------------------------------------------------

/// Recoverable decode outcome carried by an error marker value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeFault {
    #[error("Bottle tag {tag} is not implemented")]
    UnsupportedTag { tag: i32 },

    #[error("Bottle tag {tag} is not known")]
    UnknownTag { tag: i32 },

    #[error("Bottle tag {tag} combines LIST with an unsupported element type")]
    UnsupportedCombination { tag: i32 },

    #[error("Truncated at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Negative length {length} at offset {offset}")]
    NegativeLength { offset: usize, length: i32 },

    #[error("Lists nested deeper than {max_depth} levels")]
    NestingTooDeep { max_depth: usize },
}
