//! Sending control frames

use bottle_core::ControlFrame;
use tracing::debug;

use crate::connection::{Connection, ReadyState};
use crate::error::Result;
use crate::ready::{await_ready, ReadinessConfig};

/// Send one frame, waiting for the connection to open first if needed
///
/// The whole frame goes out in a single send; there is no partial-write retry.
/// A readiness timeout abandons the frame.
pub async fn send_control_frame<C>(
    connection: &C,
    frame: &ControlFrame,
    readiness: &ReadinessConfig,
) -> Result<()>
where
    C: Connection + ?Sized,
{
    if connection.ready_state() != ReadyState::Open {
        await_ready(connection, readiness).await?;
    }

    let bytes = frame.encode();
    debug!(
        url = connection.url(),
        command = %frame.command(),
        len = bytes.len(),
        "sending control frame"
    );
    connection.send(bytes)
}

/// Send a space-separated command as a data frame
pub async fn send_data<C>(connection: &C, text: &str, readiness: &ReadinessConfig) -> Result<()>
where
    C: Connection + ?Sized,
{
    let frame = ControlFrame::command_line(text)?;
    send_control_frame(connection, &frame, readiness).await
}
