//! In-memory connections for exercising the client without sockets

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bottle_core::tag::{TAG_LIST, TAG_STRING};
use bottle_core::{Command, ControlFrame};
use bottle_ws::{Connection, Connector, ReadyState, Result, WsError};
use tokio::sync::mpsc;

// ----------------------------------------------------------------------------
// Fake Connection
// ----------------------------------------------------------------------------

/// Scriptable connection
///
/// `opens_at` is the number of `ready_state` calls that report `Connecting`
/// before the connection turns `Open`; `None` never opens.
pub struct FakeConnection {
    url: String,
    opens_at: Option<u32>,
    polls: AtomicU32,
    hang_up_on_query: AtomicBool,
    reply: Mutex<Option<Vec<u8>>>,
    sent: Mutex<Vec<ControlFrame>>,
    subscriber: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    subscriptions: AtomicU32,
}

impl FakeConnection {
    pub fn new(url: &str, opens_at: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            opens_at,
            polls: AtomicU32::new(0),
            hang_up_on_query: AtomicBool::new(false),
            reply: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            subscriber: Mutex::new(None),
            subscriptions: AtomicU32::new(0),
        })
    }

    pub fn open(url: &str) -> Arc<Self> {
        Self::new(url, Some(0))
    }

    /// Nameserver that answers the first data frame with `reply`
    pub fn nameserver(reply: Vec<u8>) -> Arc<Self> {
        let connection = Self::open("ws://127.0.0.1:10000?ws");
        *connection.reply.lock().unwrap() = Some(reply);
        connection
    }

    /// Nameserver that drops the connection instead of answering
    pub fn hanging_up_nameserver() -> Arc<Self> {
        let connection = Self::open("ws://127.0.0.1:10000?ws");
        connection.hang_up_on_query.store(true, Ordering::SeqCst);
        connection
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> u32 {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ControlFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_commands(&self) -> Vec<Command> {
        self.sent().iter().map(ControlFrame::command).collect()
    }

    /// Deliver a message to the current subscriber
    pub fn push(&self, bytes: Vec<u8>) {
        if let Some(subscriber) = self.subscriber.lock().unwrap().as_ref() {
            subscriber.try_send(bytes).unwrap();
        }
    }

    /// Simulate the peer closing the socket
    pub fn hang_up(&self) {
        self.subscriber.lock().unwrap().take();
    }

    fn is_open(&self, polls: u32) -> bool {
        matches!(self.opens_at, Some(n) if polls >= n)
    }
}

impl Connection for FakeConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready_state(&self) -> ReadyState {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst);
        if self.is_open(polls) {
            ReadyState::Open
        } else {
            ReadyState::Connecting
        }
    }

    fn send(&self, bytes: Vec<u8>) -> Result<()> {
        if !self.is_open(self.polls()) {
            return Err(WsError::NotOpen);
        }
        let frame = ControlFrame::parse(&bytes)?;
        let command = frame.command();
        self.sent.lock().unwrap().push(frame);

        if command == Command::Data {
            if self.hang_up_on_query.load(Ordering::SeqCst) {
                self.hang_up();
            } else if let Some(reply) = self.reply.lock().unwrap().take() {
                self.push(reply);
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(8);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        *self.subscriber.lock().unwrap() = Some(tx);
        rx
    }
}

// ----------------------------------------------------------------------------
// Fake Connector
// ----------------------------------------------------------------------------

/// Hands out pre-registered connections by URL
#[derive(Default)]
pub struct FakeConnector {
    connections: Mutex<HashMap<String, Arc<FakeConnection>>>,
    opened: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn with(connections: &[&Arc<FakeConnection>]) -> Self {
        let connector = Self::default();
        for connection in connections {
            connector
                .connections
                .lock()
                .unwrap()
                .insert(connection.url().to_string(), Arc::clone(connection));
        }
        connector
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Conn = FakeConnection;

    async fn open(&self, url: &str) -> Result<Arc<FakeConnection>> {
        self.opened.lock().unwrap().push(url.to_string());
        self.connections
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| WsError::Open {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Wire Builder
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct Wire(pub Vec<u8>);

impl Wire {
    pub fn i32(mut self, n: i32) -> Self {
        self.0.extend_from_slice(&n.to_le_bytes());
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self = self.i32(TAG_STRING).i32(s.len() as i32);
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    pub fn list(self, count: i32) -> Self {
        self.i32(TAG_LIST).i32(count)
    }

    pub fn compact(mut self, words: &[&str]) -> Self {
        self = self.i32(TAG_LIST | TAG_STRING).i32(words.len() as i32);
        for word in words {
            self = self.i32(word.len() as i32);
            self.0.extend_from_slice(word.as_bytes());
        }
        self
    }
}

/// Reply announcing a port at `ip:port`
pub fn found_reply(ip: &str, port: &str) -> Vec<u8> {
    Wire::default()
        .list(4)
        .string("ok")
        .list(1)
        .string("ok")
        .compact(&["ip", ip])
        .compact(&["port_number", port])
        .0
}

/// Reply for an unknown port
pub fn not_found_reply() -> Vec<u8> {
    Wire::default().list(2).string("fail").list(1).string("error").0
}

/// Reply naming an ip but no port number
pub fn ip_only_reply(ip: &str) -> Vec<u8> {
    Wire::default()
        .list(3)
        .string("ok")
        .list(1)
        .string("ok")
        .compact(&["ip", ip])
        .0
}
