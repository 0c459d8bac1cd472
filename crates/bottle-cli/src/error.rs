//! Error handling for the Bottle CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Bottle protocol error: {0}")]
    Core(#[from] bottle_core::BottleError),

    #[error("Transport error: {0}")]
    Transport(#[from] bottle_ws::WsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Port {0} is not registered with the nameserver")]
    PortNotFound(String),

    #[error("Nameserver reply for {port_name} lacked {missing}")]
    PortIncomplete { port_name: String, missing: String },

    #[error("No reply within {0} ms")]
    NoReply(u128),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::Config(err.to_string())
    }
}
