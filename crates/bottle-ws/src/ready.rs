//! Connection readiness waiter
//!
//! A bounded busy-poll on [`Connection::ready_state`]. Transports differ in
//! how reliably they announce readiness, so the state is sampled instead of
//! subscribed to.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::connection::{Connection, ReadyState};
use crate::error::{Result, WsError};

/// Poll spacing and attempt budget for [`await_ready`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Delay before each poll (in milliseconds)
    pub poll_interval_ms: u64,
    /// Number of polls before giving up
    pub max_attempts: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            max_attempts: 10,
        }
    }
}

impl ReadinessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest time [`await_ready`] can take
    pub fn budget(&self) -> Duration {
        self.poll_interval() * self.max_attempts
    }
}

/// Wait until `connection` reports [`ReadyState::Open`]
///
/// Sleeps one interval before every poll and returns as soon as a poll sees
/// the connection open. Fails with [`WsError::Timeout`] right after the last
/// poll.
pub async fn await_ready<C>(connection: &C, config: &ReadinessConfig) -> Result<()>
where
    C: Connection + ?Sized,
{
    for attempt in 1..=config.max_attempts {
        sleep(config.poll_interval()).await;
        let state = connection.ready_state();
        if state == ReadyState::Open {
            debug!(url = connection.url(), attempt, "connection ready");
            return Ok(());
        }
        debug!(url = connection.url(), attempt, %state, "connection not ready yet");
    }

    warn!(
        url = connection.url(),
        attempts = config.max_attempts,
        "maximum number of readiness attempts exceeded"
    );
    Err(WsError::Timeout {
        attempts: config.max_attempts,
        interval_ms: config.poll_interval_ms,
    })
}
