//! Port resolution over live connections
//!
//! [`PortClient`] runs the sans-IO [`ResolveState`] machine against real
//! connections: it executes each effect, turns the outcome into the next
//! event, and hands the caller either a lookup result or a streaming
//! connection to the resolved port.

use std::collections::VecDeque;
use std::sync::Arc;

use bottle_core::{
    Address, ClosePolicy, Command, Effect, Incoming, Lookup, ResolveEvent, ResolveFailure,
    ResolveMode, ResolveState, Target, Transition,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ws_url, ClientConfig};
use crate::connection::{Connection, Connector};
use crate::control::send_control_frame;
use crate::error::{Result, WsError};

// ----------------------------------------------------------------------------
// Results
// ----------------------------------------------------------------------------

/// Outcome of [`PortClient::open_port_stream`]
pub enum PortConnection<C> {
    /// The port was found and its connection reverted into streaming mode
    Streaming(PortStream<C>),
    /// The nameserver has no such port; no connection was opened
    NotFound,
    /// The reply lacked `ip` or `port_number`; no connection was opened
    Incomplete { ip: Option<String>, port: Option<u16> },
}

impl<C> PortConnection<C> {
    pub fn into_stream(self) -> Option<PortStream<C>> {
        match self {
            PortConnection::Streaming(stream) => Some(stream),
            _ => None,
        }
    }
}

/// Streaming connection to a resolved port
///
/// Owned by the caller; nothing else keeps a reference to the connection.
pub struct PortStream<C> {
    address: Address,
    connection: Arc<C>,
    messages: mpsc::Receiver<Vec<u8>>,
}

impl<C: Connection> PortStream<C> {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// Next message pushed by the port, `None` once the connection closes
    pub async fn next(&mut self) -> Option<Incoming> {
        let bytes = self.messages.recv().await?;
        let incoming = Incoming::classify(&bytes);
        if let Incoming::Bottle(value) = &incoming {
            if let Some(fault) = value.first_fault() {
                warn!(address = %self.address, "streamed bottle only partly decoded: {}", fault);
            }
        }
        Some(incoming)
    }
}

// ----------------------------------------------------------------------------
// Port Client
// ----------------------------------------------------------------------------

/// Resolves port names and opens streaming connections to them
pub struct PortClient<K> {
    connector: K,
    config: ClientConfig,
}

impl<K: Connector> PortClient<K> {
    pub fn new(connector: K, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Ask the nameserver on `connection` where `port_name` lives
    ///
    /// The connection belongs to the caller and is left open.
    pub async fn lookup<C: Connection>(&self, connection: &C, port_name: &str) -> Result<Lookup> {
        self.lookup_with(connection, port_name, ClosePolicy::Keep).await
    }

    /// [`PortClient::lookup`], closing the nameserver connection per `close`
    pub async fn lookup_with<C: Connection>(
        &self,
        connection: &C,
        port_name: &str,
        close: ClosePolicy,
    ) -> Result<Lookup> {
        let outcome = self.drive(connection, port_name, close, ResolveMode::Lookup).await?;
        match outcome.state.lookup() {
            Some(lookup) => Ok(lookup),
            None => Err(failure_error(outcome.state)),
        }
    }

    /// Resolve `port_name`, connect to it and switch it into streaming mode
    ///
    /// The nameserver connection belongs to the caller and is left open.
    pub async fn open_port_stream<C: Connection>(
        &self,
        connection: &C,
        port_name: &str,
    ) -> Result<PortConnection<K::Conn>> {
        self.open_port_stream_with(connection, port_name, ClosePolicy::Keep).await
    }

    /// [`PortClient::open_port_stream`], closing the nameserver connection per `close`
    pub async fn open_port_stream_with<C: Connection>(
        &self,
        connection: &C,
        port_name: &str,
        close: ClosePolicy,
    ) -> Result<PortConnection<K::Conn>> {
        let outcome = self.drive(connection, port_name, close, ResolveMode::Connect).await?;
        match (outcome.state, outcome.port) {
            (ResolveState::Streaming(address), Some((connection, messages))) => {
                Ok(PortConnection::Streaming(PortStream {
                    address,
                    connection,
                    messages,
                }))
            }
            (ResolveState::NotFound, _) => Ok(PortConnection::NotFound),
            (ResolveState::Error(ResolveFailure::Incomplete { ip, port }), _) => {
                Ok(PortConnection::Incomplete { ip, port })
            }
            (state, _) => Err(failure_error(state)),
        }
    }

    /// [`PortClient::lookup`] through a fresh connection to `host:port`,
    /// closed according to the configured close policy
    pub async fn lookup_at(&self, host: &str, port: u16, port_name: &str) -> Result<Lookup> {
        let nameserver = self.connector.open(&ws_url(host, port)).await?;
        self.lookup_with(nameserver.as_ref(), port_name, self.config.close_policy)
            .await
    }

    /// [`PortClient::open_port_stream`] through a fresh connection to
    /// `host:port`, closed according to the configured close policy
    pub async fn open_port_stream_at(
        &self,
        host: &str,
        port: u16,
        port_name: &str,
    ) -> Result<PortConnection<K::Conn>> {
        let nameserver = self.connector.open(&ws_url(host, port)).await?;
        self.open_port_stream_with(nameserver.as_ref(), port_name, self.config.close_policy)
            .await
    }

    async fn drive<C: Connection>(
        &self,
        nameserver: &C,
        port_name: &str,
        close: ClosePolicy,
        mode: ResolveMode,
    ) -> Result<Outcome<K::Conn>> {
        let readiness = &self.config.readiness;
        let mut state = ResolveState::new(port_name, close, mode);
        let mut events = VecDeque::from([ResolveEvent::Start]);
        let mut replies: Option<mpsc::Receiver<Vec<u8>>> = None;
        let mut port: Option<Arc<K::Conn>> = None;
        let mut port_messages: Option<mpsc::Receiver<Vec<u8>>> = None;

        loop {
            let event = match events.pop_front() {
                Some(event) => event,
                None if state.is_terminal() => break,
                None => match replies.as_mut() {
                    Some(replies) if matches!(state, ResolveState::ResponsePending(_)) => {
                        match replies.recv().await {
                            Some(bytes) => {
                                debug!(len = bytes.len(), "nameserver reply received");
                                ResolveEvent::Response(bytes)
                            }
                            None => ResolveEvent::TransportFailed(
                                "nameserver connection closed before replying".into(),
                            ),
                        }
                    }
                    _ => {
                        return Err(WsError::Core(bottle_core::BottleError::InvalidState {
                            state: state.state_name().to_string(),
                            event: "none".to_string(),
                        }))
                    }
                },
            };

            let Transition { state: next, effects } = state.transition(event)?;
            state = next;

            for effect in effects {
                match effect {
                    Effect::Subscribe { target: Target::Nameserver } => {
                        replies = Some(nameserver.subscribe());
                    }
                    Effect::Subscribe { target: Target::Port } => {
                        port_messages = port.as_ref().map(|connection| connection.subscribe());
                    }
                    Effect::Send { target: Target::Nameserver, frame } => {
                        let sent = send_control_frame(nameserver, &frame, readiness).await;
                        if frame.command() == Command::Close {
                            fire_and_forget(nameserver.url(), sent);
                        } else {
                            sent?;
                            events.push_back(ResolveEvent::QueryDelivered);
                        }
                    }
                    Effect::Send { target: Target::Port, frame } => {
                        let connection = port.as_ref().ok_or(WsError::NotOpen)?;
                        send_control_frame(connection.as_ref(), &frame, readiness).await?;
                    }
                    Effect::Connect { url } => {
                        info!(%url, "connecting to resolved port");
                        port = Some(self.connector.open(&url).await?);
                        events.push_back(ResolveEvent::PortConnected);
                    }
                }
            }
        }

        Ok(Outcome {
            state,
            port: port.zip(port_messages),
        })
    }
}

struct Outcome<C> {
    state: ResolveState,
    port: Option<(Arc<C>, mpsc::Receiver<Vec<u8>>)>,
}

/// A close that could not be delivered is only logged
fn fire_and_forget(url: &str, sent: Result<()>) {
    match sent {
        Ok(()) => debug!(url, "close requested"),
        Err(e) => debug!(url, "close request not delivered: {}", e),
    }
}

fn failure_error(state: ResolveState) -> WsError {
    match state {
        ResolveState::Error(ResolveFailure::Transport(reason)) => WsError::Disconnected(reason),
        ResolveState::Error(ResolveFailure::Malformed(reason)) => {
            WsError::Core(bottle_core::BottleError::MalformedResponse(reason))
        }
        other => WsError::Core(bottle_core::BottleError::InvalidState {
            state: other.state_name().to_string(),
            event: "finish".to_string(),
        }),
    }
}
