//! Channel session — the handle returned by a successful start.
//!
//! A session owns the spawned receive-loop task and the cancellation token it
//! watches. Dropping the handle does not stop the task; call
//! [`ChannelSession::stop`] for a deterministic teardown.

use crate::IngestError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a receive loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The relay closed the connection (zero-byte read).
    Closed,
    /// [`ChannelSession::stop`] (or the token) cancelled the loop.
    Cancelled,
}

/// A running ingestion session for one channel.
#[derive(Debug)]
pub struct ChannelSession {
    channel: String,
    cancel: CancellationToken,
    handle: JoinHandle<Result<SessionEnd, IngestError>>,
}

impl ChannelSession {
    pub(crate) fn new(
        channel: String,
        cancel: CancellationToken,
        handle: JoinHandle<Result<SessionEnd, IngestError>>,
    ) -> Self {
        Self {
            channel,
            cancel,
            handle,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `true` once the receive loop has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the receive loop to end on its own.
    pub async fn wait(self) -> Result<SessionEnd, IngestError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(IngestError::Task(e.to_string())),
        }
    }

    /// Cancel the receive loop and wait for it to finish.
    pub async fn stop(self) -> Result<SessionEnd, IngestError> {
        tracing::info!(channel = %self.channel, "stopping session");
        self.cancel.cancel();
        self.wait().await
    }
}
