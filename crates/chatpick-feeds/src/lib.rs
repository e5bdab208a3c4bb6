//! chatpick-feeds — chat relay feed adapters for chatpick.
//!
//! A feed adapter connects to a chat source, reads raw lines, and appends them
//! to the channel's [`chatpick_core::LogStore`]. The only adapter today is the
//! IRC relay ingestor in [`irc`].

pub mod irc;
pub mod session;

pub use irc::IrcIngestor;
pub use session::{ChannelSession, SessionEnd};

/// Errors that end an ingestion session. None of them are retried.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Log write error: {0}")]
    LogWrite(#[source] std::io::Error),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),

    #[error("Ingestion task failed: {0}")]
    Task(String),
}
