//! Control frames
//!
//! Every message sent to a port starts with a fixed 8-byte preamble, then a
//! one-byte command and a NUL. Only data frames carry a payload.

use core::fmt;

use crate::codec::{decode, decode_at, encode_words, split_command};
use crate::tag::{Tag, TAG_STRING};
use crate::value::Value;
use crate::{BottleError, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Protocol/version marker preceding every control message
pub const PREAMBLE: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x7e, 0x00, 0x00, 0x01];

/// Preamble plus command byte plus terminator
pub const FRAME_HEADER_SIZE: usize = PREAMBLE.len() + 2;

/// Incoming messages of this size or less are bare headers, not bottles
pub const HEADER_ONLY_MAX: usize = 8;

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Control command carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Data or query carrying a bottle
    Data,
    /// Ask the peer to close the connection
    Close,
    /// Switch the connection into push-streaming mode
    Revert,
}

impl Command {
    pub fn byte(self) -> u8 {
        match self {
            Command::Data => b'd',
            Command::Close => b'q',
            Command::Revert => b'r',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'd' => Some(Command::Data),
            b'q' => Some(Command::Close),
            b'r' => Some(Command::Revert),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Data => f.write_str("data"),
            Command::Close => f.write_str("close"),
            Command::Revert => f.write_str("revert"),
        }
    }
}

// ----------------------------------------------------------------------------
// Control Frame
// ----------------------------------------------------------------------------

/// A control message ready to be written in a single send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    command: Command,
    payload: Vec<u8>,
}

impl ControlFrame {
    /// Data frame carrying the given words as a string list
    pub fn words<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let body = encode_words(words)?;
        let mut payload = Vec::with_capacity(4 + body.len());
        payload.extend_from_slice(&TAG_STRING.to_le_bytes());
        payload.extend_from_slice(&body);
        Ok(Self {
            command: Command::Data,
            payload,
        })
    }

    /// Data frame for a space-separated command line
    pub fn command_line(text: &str) -> Result<Self> {
        Self::words(&split_command(text))
    }

    /// Nameserver lookup for `port_name`
    pub fn query(port_name: &str) -> Result<Self> {
        Self::words(&["bot", "query", port_name])
    }

    pub fn close() -> Self {
        Self {
            command: Command::Close,
            payload: Vec::new(),
        }
    }

    pub fn revert() -> Self {
        Self {
            command: Command::Revert,
            payload: Vec::new(),
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Serialize as `preamble | command | NUL | payload`
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        bytes.extend_from_slice(&PREAMBLE);
        bytes.push(self.command.byte());
        bytes.push(0);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse a frame as written by [`ControlFrame::encode`]
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(BottleError::InvalidFrame(format!(
                "{} bytes is shorter than the {} byte header",
                bytes.len(),
                FRAME_HEADER_SIZE
            )));
        }
        if bytes[..PREAMBLE.len()] != PREAMBLE {
            return Err(BottleError::InvalidFrame("bad preamble".into()));
        }
        let command = Command::from_byte(bytes[8]).ok_or_else(|| {
            BottleError::InvalidFrame(format!("unknown command byte 0x{:02x}", bytes[8]))
        })?;
        if bytes[9] != 0 {
            return Err(BottleError::InvalidFrame("missing command terminator".into()));
        }
        let payload = bytes[FRAME_HEADER_SIZE..].to_vec();
        if command != Command::Data && !payload.is_empty() {
            return Err(BottleError::InvalidFrame(format!("{} frame carries a payload", command)));
        }
        Ok(Self { command, payload })
    }

    /// Words carried by a data frame, `None` for other commands
    pub fn decode_words(&self) -> Option<Vec<String>> {
        if self.command != Command::Data || self.payload.len() < 4 {
            return None;
        }
        match decode_at(&self.payload, 4, Some(Tag::CompactStringList)).value {
            Value::CompactStringList(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Incoming Messages
// ----------------------------------------------------------------------------

/// A message received from a port
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Decoded bottle content
    Bottle(Value),
    /// Short header-only message such as a connection acknowledgement
    Header(Vec<u8>),
}

impl Incoming {
    pub fn classify(bytes: &[u8]) -> Self {
        if bytes.len() > HEADER_ONLY_MAX {
            Incoming::Bottle(decode(bytes))
        } else {
            Incoming::Header(bytes.to_vec())
        }
    }
}

impl fmt::Display for Incoming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incoming::Bottle(value) => write!(f, "{}", value),
            Incoming::Header(bytes) => {
                f.write_str("head ")?;
                for b in bytes {
                    if b.is_ascii_graphic() {
                        write!(f, "{}", char::from(*b))?;
                    } else {
                        write!(f, "\\x{:02x}", b)?;
                    }
                }
                Ok(())
            }
        }
    }
}
