//! Port Resolution State Machine
//!
//! Drives a `bot query` exchange without touching any transport. The caller
//! feeds events in, executes the returned effects, and reports back.
//!
//! ```text
//! Idle --Start--> QuerySent --QueryDelivered--> ResponsePending
//!   ResponsePending --Response--> Resolved | NotFound | Error
//!   Resolved --PortConnected--> Streaming        (connect mode only)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::{parse_query_response, Address, Lookup};
use crate::codec::decode;
use crate::frame::ControlFrame;
use crate::{BottleError, Result};

// ----------------------------------------------------------------------------
// Options
// ----------------------------------------------------------------------------

/// When the nameserver connection is closed during a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Leave the nameserver connection open
    Keep,
    /// Send Close right after the query, racing the reply
    AfterQuery,
    /// Send Close once the reply has arrived
    #[default]
    AfterResponse,
}

/// What to do once the address is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Report the address only
    Lookup,
    /// Open a connection to the port and revert it into streaming mode
    Connect,
}

/// Connection an effect applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The connection the query was sent on
    Nameserver,
    /// The connection opened to the resolved port
    Port,
}

// ----------------------------------------------------------------------------
// Effects and Events
// ----------------------------------------------------------------------------

/// Work the caller must perform after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Register the response handler, replacing any previous one
    Subscribe { target: Target },
    /// Write a frame; Close frames on the nameserver are fire-and-forget
    Send { target: Target, frame: ControlFrame },
    /// Open a new connection to the resolved port
    Connect { url: String },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    /// Begin the exchange
    Start,
    /// The query frame was handed to the transport
    QueryDelivered,
    /// A reply arrived on the nameserver connection
    Response(Vec<u8>),
    /// The connection to the resolved port is open
    PortConnected,
    /// The transport failed while an effect was executed
    TransportFailed(String),
}

impl ResolveEvent {
    fn name(&self) -> &'static str {
        match self {
            ResolveEvent::Start => "Start",
            ResolveEvent::QueryDelivered => "QueryDelivered",
            ResolveEvent::Response(_) => "Response",
            ResolveEvent::PortConnected => "PortConnected",
            ResolveEvent::TransportFailed(_) => "TransportFailed",
        }
    }
}

/// Why a resolution ended in the `Error` state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The reply lacked `ip` or `port_number`
    Incomplete { ip: Option<String>, port: Option<u16> },
    /// The reply could not be interpreted
    Malformed(String),
    /// The transport reported an error
    Transport(String),
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::Incomplete { ip, port } => write!(
                f,
                "resolution incomplete (ip: {}, port: {})",
                ip.as_deref().unwrap_or("missing"),
                port.map_or_else(|| "missing".to_string(), |p| p.to_string())
            ),
            ResolveFailure::Malformed(reason) => write!(f, "malformed reply: {}", reason),
            ResolveFailure::Transport(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}

// ----------------------------------------------------------------------------
// State
// ----------------------------------------------------------------------------

/// Resolution request carried through the in-flight states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub port_name: String,
    pub close: ClosePolicy,
    pub mode: ResolveMode,
}

/// Resolution state; consumed by every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    Idle(Request),
    QuerySent(Request),
    ResponsePending(Request),
    Resolved { request: Request, address: Address },
    Streaming(Address),
    NotFound,
    Error(ResolveFailure),
}

/// New state plus the effects to run, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ResolveState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(state: ResolveState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

impl ResolveState {
    pub fn new(port_name: impl Into<String>, close: ClosePolicy, mode: ResolveMode) -> Self {
        ResolveState::Idle(Request {
            port_name: port_name.into(),
            close,
            mode,
        })
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            ResolveState::Idle(_) => "Idle",
            ResolveState::QuerySent(_) => "QuerySent",
            ResolveState::ResponsePending(_) => "ResponsePending",
            ResolveState::Resolved { .. } => "Resolved",
            ResolveState::Streaming(_) => "Streaming",
            ResolveState::NotFound => "NotFound",
            ResolveState::Error(_) => "Error",
        }
    }

    /// No further events are expected
    pub fn is_terminal(&self) -> bool {
        match self {
            ResolveState::Resolved { request, .. } => request.mode == ResolveMode::Lookup,
            ResolveState::Streaming(_) | ResolveState::NotFound | ResolveState::Error(_) => true,
            _ => false,
        }
    }

    /// Lookup outcome once the reply has been processed
    pub fn lookup(&self) -> Option<Lookup> {
        match self {
            ResolveState::Resolved { address, .. } | ResolveState::Streaming(address) => {
                Some(Lookup::Found(address.clone()))
            }
            ResolveState::NotFound => Some(Lookup::NotFound),
            ResolveState::Error(ResolveFailure::Incomplete { ip, port }) => Some(Lookup::Incomplete {
                ip: ip.clone(),
                port: *port,
            }),
            _ => None,
        }
    }

    /// Process an event and transition to the next state (consumes self)
    pub fn transition(self, event: ResolveEvent) -> Result<Transition> {
        let from = self.state_name();
        let event_name = event.name();

        let transition = match (self, event) {
            (ResolveState::Idle(request), ResolveEvent::Start) => {
                let query = ControlFrame::query(&request.port_name)?;
                info!(port = %request.port_name, "querying nameserver");
                let effects = vec![
                    Effect::Subscribe {
                        target: Target::Nameserver,
                    },
                    Effect::Send {
                        target: Target::Nameserver,
                        frame: query,
                    },
                ];
                Transition::new(ResolveState::QuerySent(request), effects)
            }

            (ResolveState::QuerySent(request), ResolveEvent::QueryDelivered) => {
                let effects = if request.close == ClosePolicy::AfterQuery {
                    vec![close_nameserver()]
                } else {
                    Vec::new()
                };
                Transition::new(ResolveState::ResponsePending(request), effects)
            }

            (ResolveState::ResponsePending(request), ResolveEvent::Response(bytes)) => {
                Self::on_response(request, &bytes)
            }

            (ResolveState::Resolved { request, address }, ResolveEvent::PortConnected)
                if request.mode == ResolveMode::Connect =>
            {
                info!(port = %request.port_name, %address, "reverting port connection to streaming");
                let effects = vec![
                    Effect::Subscribe { target: Target::Port },
                    Effect::Send {
                        target: Target::Port,
                        frame: ControlFrame::revert(),
                    },
                ];
                Transition::new(ResolveState::Streaming(address), effects)
            }

            (state, ResolveEvent::TransportFailed(reason)) if !state.is_terminal() => {
                warn!(state = state.state_name(), "resolution aborted: {}", reason);
                Transition::new(ResolveState::Error(ResolveFailure::Transport(reason)), Vec::new())
            }

            _ => {
                return Err(BottleError::InvalidState {
                    state: from.to_string(),
                    event: event_name.to_string(),
                });
            }
        };

        debug!(
            from,
            to = transition.state.state_name(),
            event = event_name,
            effects = transition.effects.len(),
            "resolve transition"
        );
        Ok(transition)
    }

    fn on_response(request: Request, bytes: &[u8]) -> Transition {
        let mut effects = Vec::new();
        if request.close == ClosePolicy::AfterResponse {
            effects.push(close_nameserver());
        }

        let lookup = match parse_query_response(&decode(bytes)) {
            Ok(lookup) => lookup,
            Err(err) => {
                warn!(port = %request.port_name, "unusable nameserver reply: {}", err);
                let state = ResolveState::Error(ResolveFailure::Malformed(err.to_string()));
                return Transition::new(state, effects);
            }
        };

        let state = match lookup {
            Lookup::Found(address) => {
                info!(port = %request.port_name, %address, "port resolved");
                if request.mode == ResolveMode::Connect {
                    effects.push(Effect::Connect { url: address.url() });
                }
                ResolveState::Resolved { request, address }
            }
            Lookup::NotFound => {
                warn!(port = %request.port_name, "port does not exist");
                ResolveState::NotFound
            }
            Lookup::Incomplete { ip, port } => {
                let failure = ResolveFailure::Incomplete { ip, port };
                warn!(port = %request.port_name, "{}", failure);
                ResolveState::Error(failure)
            }
        };
        Transition::new(state, effects)
    }
}

fn close_nameserver() -> Effect {
    Effect::Send {
        target: Target::Nameserver,
        frame: ControlFrame::close(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
