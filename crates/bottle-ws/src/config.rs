//! Client configuration

use bottle_core::{Address, ClosePolicy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WsError};
use crate::ready::ReadinessConfig;

/// Default YARP nameserver port
pub const DEFAULT_NAMESERVER_PORT: u16 = 10000;

/// Configuration for resolving and streaming ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host the nameserver listens on
    pub nameserver_host: String,
    /// Websocket port of the nameserver
    pub nameserver_port: u16,
    /// When to close nameserver connections the client opened itself
    pub close_policy: ClosePolicy,
    /// Capacity of each connection's incoming message channel
    pub stream_buffer: usize,
    /// Readiness polling before each send
    pub readiness: ReadinessConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nameserver_host: "127.0.0.1".to_string(),
            nameserver_port: DEFAULT_NAMESERVER_PORT,
            close_policy: ClosePolicy::default(),
            stream_buffer: 64,
            readiness: ReadinessConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at a specific nameserver
    pub fn with_nameserver(host: impl Into<String>, port: u16) -> Self {
        Self {
            nameserver_host: host.into(),
            nameserver_port: port,
            ..Self::default()
        }
    }

    /// Websocket URL of the configured nameserver
    pub fn nameserver_url(&self) -> String {
        ws_url(&self.nameserver_host, self.nameserver_port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nameserver_host.trim().is_empty() {
            return Err(WsError::InvalidConfiguration("nameserver_host is empty".into()));
        }
        if self.readiness.max_attempts == 0 {
            return Err(WsError::InvalidConfiguration(
                "readiness.max_attempts must be at least 1".into(),
            ));
        }
        if self.readiness.poll_interval_ms == 0 {
            return Err(WsError::InvalidConfiguration(
                "readiness.poll_interval_ms must be positive".into(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(WsError::InvalidConfiguration("stream_buffer must be positive".into()));
        }
        Ok(())
    }
}

/// `ws://host:port?ws`, the upgrade path YARP ports expect
pub fn ws_url(host: &str, port: u16) -> String {
    Address::new(host, port).url()
}
