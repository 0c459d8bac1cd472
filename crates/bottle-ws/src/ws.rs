//! Websocket transport over tokio-tungstenite
//!
//! [`WsConnection::open`] returns at once in the `Connecting` state and
//! finishes the handshake on a background task, the way a browser websocket
//! behaves. Outgoing messages are queued to a writer; incoming binary and
//! text messages are forwarded to the current subscriber.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::connection::{Connection, Connector, ReadyState};
use crate::error::{Result, WsError};

type Subscriber = Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>;

// ----------------------------------------------------------------------------
// Websocket Connection
// ----------------------------------------------------------------------------

/// One websocket connection to a port or nameserver
pub struct WsConnection {
    url: String,
    state: Arc<AtomicU8>,
    outgoing: mpsc::UnboundedSender<Message>,
    subscriber: Subscriber,
    buffer: usize,
}

impl WsConnection {
    /// Start connecting to `url` (`ws://` or `wss://`)
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(url: &str, buffer: usize) -> Result<Arc<Self>> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(WsError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            url: url.to_string(),
            state: Arc::new(AtomicU8::new(ReadyState::Connecting as u8)),
            outgoing,
            subscriber: Arc::new(Mutex::new(None)),
            buffer: buffer.max(1),
        });

        tokio::spawn(run_socket(
            url.to_string(),
            Arc::clone(&connection.state),
            Arc::clone(&connection.subscriber),
            outgoing_rx,
        ));

        Ok(connection)
    }

    /// Close the websocket locally without notifying the peer through a frame
    pub fn shutdown(&self) {
        if self.ready_state() == ReadyState::Open {
            self.state.store(ReadyState::Closing as u8, Ordering::SeqCst);
            // Writer is gone if the socket already died
            let _ = self.outgoing.send(Message::Close(None));
        }
    }
}

impl Connection for WsConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn send(&self, bytes: Vec<u8>) -> Result<()> {
        if self.ready_state() != ReadyState::Open {
            return Err(WsError::NotOpen);
        }
        self.outgoing
            .send(Message::Binary(bytes))
            .map_err(|e| WsError::Send(e.to_string()))
    }

    fn subscribe(&self) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut slot = self.subscriber.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.replace(tx).is_some() {
            debug!(url = %self.url, "replacing previous message handler");
        }
        rx
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_socket(
    url: String,
    state: Arc<AtomicU8>,
    subscriber: Subscriber,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            error!(%url, "websocket client: {}", e);
            state.store(ReadyState::Closed as u8, Ordering::SeqCst);
            return;
        }
    };
    info!(%url, "websocket connected");
    state.store(ReadyState::Open as u8, Ordering::SeqCst);

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            message = outgoing.recv() => {
                let Some(message) = message else { break };
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!(%url, "websocket send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            incoming = stream.next() => {
                let bytes = match incoming {
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(%url, ?frame, "peer closed websocket");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(%url, "websocket receive failed: {}", e);
                        break;
                    }
                    None => break,
                };
                deliver(&url, &subscriber, bytes);
            }
        }
    }

    state.store(ReadyState::Closed as u8, Ordering::SeqCst);
    // Dropping the handler ends the subscriber's stream
    subscriber.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
    info!(%url, "websocket closed");
}

/// Hand `bytes` to the current subscriber without blocking the socket task
///
/// A subscriber whose channel is full loses the message. Returns whether the
/// message was queued.
fn deliver(url: &str, subscriber: &Subscriber, bytes: Vec<u8>) -> bool {
    let handler = subscriber
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    let Some(handler) = handler else {
        debug!(%url, len = bytes.len(), "no message handler registered, discarding message");
        return false;
    };
    match handler.try_send(bytes) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(bytes)) => {
            warn!(%url, len = bytes.len(), "message handler is lagging, dropping message");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(%url, "message handler dropped, discarding message");
            false
        }
    }
}

// ----------------------------------------------------------------------------
// Connector
// ----------------------------------------------------------------------------

/// Opens [`WsConnection`]s
#[derive(Debug, Clone)]
pub struct WsConnector {
    buffer: usize,
}

impl WsConnector {
    /// `buffer` is the capacity of each connection's message channel
    pub fn new(buffer: usize) -> Self {
        Self { buffer }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn open(&self, url: &str) -> Result<Arc<WsConnection>> {
        WsConnection::open(url, self.buffer).map_err(|e| {
            error!(%url, "websocket client: {}", e);
            match e {
                WsError::Url(_) | WsError::UnsupportedScheme(_) => WsError::Open {
                    url: url.to_string(),
                    reason: e.to_string(),
                },
                other => other,
            }
        })
    }
}
