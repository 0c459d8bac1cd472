//! Port addresses and nameserver query replies

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::value::Value;
use crate::{BottleError, Result};

/// Status string the nameserver returns for an unregistered port
pub const NOT_FOUND_STATUS: &str = "error";

// ----------------------------------------------------------------------------
// Address
// ----------------------------------------------------------------------------

/// Network location of a resolved port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub ip: String,
    pub port: u16,
}

impl Address {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }

    /// Websocket URL the port listens on
    pub fn url(&self) -> String {
        format!("ws://{}:{}?ws", self.ip, self.port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

// ----------------------------------------------------------------------------
// Lookup Outcome
// ----------------------------------------------------------------------------

/// What a nameserver query told us about a port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lookup {
    Found(Address),
    /// The nameserver has no such port
    NotFound,
    /// The reply lacked an `ip` or a `port_number` entry
    Incomplete { ip: Option<String>, port: Option<u16> },
}

impl Lookup {
    pub fn address(&self) -> Option<&Address> {
        match self {
            Lookup::Found(address) => Some(address),
            _ => None,
        }
    }
}

/// Extract the port address from a decoded `bot query` reply
///
/// The reply is a list whose second element is a status list. A status of
/// `"error"` means the port is unknown; otherwise every `[name value]` pair in
/// the top-level list is scanned for `ip` and `port_number`.
pub fn parse_query_response(response: &Value) -> Result<Lookup> {
    let items = response
        .elements()
        .ok_or_else(|| BottleError::malformed(format!("expected a list, got {}", response.type_name())))?;

    if let Some(fault) = response.first_fault() {
        warn!("query reply was only partly decoded: {}", fault);
    }

    let status = response
        .get(1)
        .and_then(|status| status.get(0))
        .and_then(Value::as_str);
    if status == Some(NOT_FOUND_STATUS) {
        debug!("nameserver reported the port as unknown");
        return Ok(Lookup::NotFound);
    }

    let mut ip = None;
    let mut port = None;
    for item in items {
        let Some(pair) = item.elements() else {
            continue;
        };
        let (Some(name), Some(value)) = (pair.first().and_then(Value::as_str), pair.get(1)) else {
            continue;
        };
        match name {
            "ip" => ip = Some(host_text(value)?),
            "port_number" => port = Some(port_number(value)?),
            _ => {}
        }
    }

    Ok(match (ip, port) {
        (Some(ip), Some(port)) => Lookup::Found(Address { ip, port }),
        (ip, port) => Lookup::Incomplete { ip, port },
    })
}

fn host_text(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BottleError::InvalidAddress(format!("ip is a {}", value.type_name())))
}

fn port_number(value: &Value) -> Result<u16> {
    let raw = match value {
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| BottleError::InvalidAddress(format!("port_number {:?} is not a number", text)))?,
        other => other.as_int().ok_or_else(|| {
            BottleError::InvalidAddress(format!("port_number is a {}", other.type_name()))
        })?,
    };
    u16::try_from(raw).map_err(|_| BottleError::InvalidAddress(format!("port_number {} is out of range", raw)))
}
