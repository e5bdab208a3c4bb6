//! IRC stream ingestor — connects to the chat relay, keeps the connection
//! alive and appends every chat line to the channel's rotating log.
//!
//! # Protocol
//!
//! ```text
//! >> PASS {token}
//! >> NICK {nickname}
//! >> JOIN #{channel}
//! << PING :tmi.twitch.tv          answered with PONG, never logged
//! << (first two other lines)      welcome noise, discarded
//! << everything after that        logged verbatim with a timestamp
//! ```
//!
//! Reads go through a 2048-byte buffer and are decoded as lossy UTF-8. A line
//! is never longer than the buffer: an unterminated run of 2048 bytes is
//! handled as a line of its own, and the rest follows as the next one. The
//! loop ends when the relay closes the connection or the session is
//! cancelled. There is no reconnect; a caller that wants one starts a new
//! session.

use crate::session::{ChannelSession, SessionEnd};
use crate::IngestError;
use chatpick_core::config::ConnectionConfig;
use chatpick_core::{normalize_channel, LogStore, LogWriter};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Size of the receive buffer.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Fixed keep-alive reply.
pub const PONG_REPLY: &str = "PONG :tmi.twitch.tv\n";

/// Non-PING lines discarded after joining.
pub const WELCOME_LINES: usize = 2;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// NOTICE texts the relay sends when it rejects the token.
const AUTH_FAILURES: &[&str] = &["login authentication failed", "improperly formatted auth"];

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// What the receive loop should do with one incoming line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Keep-alive: answer with [`PONG_REPLY`].
    Pong,
    /// Welcome noise or a blank line.
    Discard,
    /// Append to the log.
    Log,
    /// The relay rejected the access token.
    AuthFailed(String),
}

/// Per-session line classifier. Counts discarded welcome lines.
#[derive(Debug, Default)]
pub struct LineFilter {
    discarded: usize,
}

impl LineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, line: &str) -> LineAction {
        if line.starts_with("PING") {
            return LineAction::Pong;
        }
        if line.trim().is_empty() {
            return LineAction::Discard;
        }
        if is_auth_failure(line) {
            return LineAction::AuthFailed(line.trim().to_string());
        }
        if self.discarded < WELCOME_LINES {
            self.discarded += 1;
            return LineAction::Discard;
        }
        LineAction::Log
    }
}

fn is_auth_failure(line: &str) -> bool {
    if !line.contains(" NOTICE ") {
        return false;
    }
    let lower = line.to_lowercase();
    AUTH_FAILURES.iter().any(|marker| lower.contains(marker))
}

// ---------------------------------------------------------------------------
// IrcIngestor
// ---------------------------------------------------------------------------

/// Starts one ingestion session per channel against the configured relay.
#[derive(Debug, Clone)]
pub struct IrcIngestor {
    connection: ConnectionConfig,
    store: LogStore,
}

impl IrcIngestor {
    pub fn new(connection: ConnectionConfig, store: LogStore) -> Self {
        Self { connection, store }
    }

    /// Connect to `server:port`, perform the handshake and spawn the receive
    /// loop for `channel`.
    pub async fn start(&self, channel: &str) -> Result<ChannelSession, IngestError> {
        let channel = self.prepare(channel)?;
        let addr = (self.connection.server.as_str(), self.connection.port);

        tracing::info!(channel = %channel, server = %addr.0, port = addr.1, "connecting to relay");
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                IngestError::Connection(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {}:{} timed out", addr.0, addr.1),
                ))
            })?
            .map_err(IngestError::Connection)?;

        self.start_on(&channel, stream).await
    }

    /// Same as [`IrcIngestor::start`] over an already-connected stream.
    pub async fn start_with_stream<S>(&self, channel: &str, stream: S) -> Result<ChannelSession, IngestError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let channel = self.prepare(channel)?;
        self.start_on(&channel, stream).await
    }

    fn prepare(&self, channel: &str) -> Result<String, IngestError> {
        let channel =
            normalize_channel(channel).map_err(|_| IngestError::InvalidChannel(channel.to_string()))?;
        if self.connection.token.trim().is_empty() {
            return Err(IngestError::Auth("connection.token is not set".into()));
        }
        Ok(channel)
    }

    async fn start_on<S>(&self, channel: &str, stream: S) -> Result<ChannelSession, IngestError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let log = self.store.open_writer(channel).map_err(IngestError::LogWrite)?;
        let (read_half, mut write_half) = tokio::io::split(stream);

        handshake(&mut write_half, &self.connection, channel).await?;
        tracing::info!(channel = %channel, nickname = %self.connection.nickname, "joined channel");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(receive_loop(read_half, write_half, log, cancel.clone()));

        tracing::debug!(channel = %channel, path = %self.store.path_for(channel).display(), "logging to");
        Ok(ChannelSession::new(channel.to_string(), cancel, handle))
    }
}

async fn handshake<W>(writer: &mut W, connection: &ConnectionConfig, channel: &str) -> Result<(), IngestError>
where
    W: AsyncWrite + Unpin,
{
    send_line(writer, &format!("PASS {}\n", connection.token)).await?;
    send_line(writer, &format!("NICK {}\n", connection.nickname)).await?;
    send_line(writer, &format!("JOIN #{channel}\n")).await?;
    tracing::debug!(">> PASS <redacted> / NICK {} / JOIN #{}", connection.nickname, channel);
    Ok(())
}

async fn send_line<W>(writer: &mut W, line: &str) -> Result<(), IngestError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(IngestError::Connection)?;
    writer.flush().await.map_err(IngestError::Connection)
}

/// Read lines until the peer closes, the token is rejected, or `cancel` fires.
pub async fn receive_loop<R, W>(
    read_half: R,
    mut write_half: W,
    mut log: LogWriter,
    cancel: CancellationToken,
) -> Result<SessionEnd, IngestError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let channel = log.channel().to_string();
    let mut reader = BufReader::with_capacity(RECV_BUFFER_SIZE, read_half);
    let mut buf = Vec::with_capacity(RECV_BUFFER_SIZE);
    let mut filter = LineFilter::new();
    let mut logged: u64 = 0;

    let end = loop {
        buf.clear();
        let mut limited = (&mut reader).take(RECV_BUFFER_SIZE as u64);
        let read = tokio::select! {
            _ = cancel.cancelled() => break SessionEnd::Cancelled,
            read = limited.read_until(b'\n', &mut buf) => read,
        };

        let n = match read {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(channel = %channel, error = %e, "relay read failed");
                return Err(IngestError::Connection(e));
            }
        };
        if n == 0 {
            break SessionEnd::Closed;
        }

        let line = String::from_utf8_lossy(&buf);
        tracing::debug!(channel = %channel, "<< {}", line.trim_end());

        let action = filter.classify(&line);
        match action {
            LineAction::Pong => {
                send_line(&mut write_half, PONG_REPLY).await?;
                tracing::debug!(channel = %channel, ">> {}", PONG_REPLY.trim_end());
            }
            LineAction::Discard => {}
            LineAction::AuthFailed(notice) => {
                tracing::error!(channel = %channel, notice = %notice, "relay rejected token");
                return Err(IngestError::Auth(notice));
            }
            LineAction::Log => {
                let record = line.into_owned();
                let (writer, written) = tokio::task::spawn_blocking(move || {
                    let written = log.write(&chrono::Local::now(), &record);
                    (log, written)
                })
                .await
                .map_err(|e| IngestError::Task(e.to_string()))?;
                log = writer;

                if let Err(e) = written {
                    tracing::error!(channel = %channel, error = %e, "log write failed");
                    return Err(IngestError::LogWrite(e));
                }
                logged += 1;
            }
        }
    };

    tracing::info!(channel = %channel, ?end, logged, "receive loop ended");
    Ok(end)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
