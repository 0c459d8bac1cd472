//! Bottle Websocket Client
//!
//! Async transport for the Bottle protocol: websocket connections, the
//! readiness waiter that gates every control frame, and [`PortClient`], which
//! resolves port names through the nameserver and opens streaming connections
//! to them.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod connection;
pub mod control;
pub mod error;
pub mod ready;
pub mod resolver;
pub mod ws;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ws_url, ClientConfig, DEFAULT_NAMESERVER_PORT};
pub use connection::{Connection, Connector, ReadyState};
pub use control::{send_control_frame, send_data};
pub use error::{Result, WsError};
pub use ready::{await_ready, ReadinessConfig};
pub use resolver::{PortClient, PortConnection, PortStream};
pub use ws::{WsConnection, WsConnector};
