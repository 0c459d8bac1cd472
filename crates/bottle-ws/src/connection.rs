//! Transport abstraction
//!
//! The resolver only needs four things from a connection: its ready state, a
//! buffered send, a message subscription, and a way to open new connections.
//! [`crate::ws`] implements them over tokio-tungstenite; tests use in-memory
//! fakes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

// ----------------------------------------------------------------------------
// Ready State
// ----------------------------------------------------------------------------

/// Lifecycle of a connection, mirroring the websocket ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Connection Traits
// ----------------------------------------------------------------------------

/// A byte-message connection to a port or nameserver
pub trait Connection: Send + Sync {
    /// URL this connection was opened with
    fn url(&self) -> &str;

    /// Current lifecycle state
    fn ready_state(&self) -> ReadyState;

    /// Queue one message; the transport writes it atomically
    fn send(&self, bytes: Vec<u8>) -> Result<()>;

    /// Register the message handler for this connection
    ///
    /// Only one subscriber exists at a time: subscribing again drops the
    /// previous receiver, which then sees the end of its stream.
    fn subscribe(&self) -> mpsc::Receiver<Vec<u8>>;
}

/// Opens connections by URL
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection + 'static;

    /// Start opening a connection; it may still be connecting on return
    async fn open(&self, url: &str) -> Result<Arc<Self::Conn>>;
}
