//! Error types for the websocket client

use thiserror::Error;

/// Transport-side error types
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Bottle protocol error: {0}")]
    Core(#[from] bottle_core::BottleError),

    #[error("Connection not ready after {attempts} attempts ({interval_ms}ms apart)")]
    Timeout { attempts: u32, interval_ms: u64 },

    #[error("Failed to open {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Connection is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Connection lost: {0}")]
    Disconnected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for websocket client operations
pub type Result<T> = std::result::Result<T, WsError>;
