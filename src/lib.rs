//! chatpick — read a random chat message aloud.
//!
//! Ingests a chat relay channel into rotating flat logs and, on demand, picks
//! one message (random, most recent, or mentioning the channel) after a
//! blacklist pass. [`ChatPick`] is the facade a front-end talks to; it exposes
//! the two operations the front-end needs, [`ChatPick::start_ingestion`] and
//! [`ChatPick::request_selection`].
//!
//! # Architecture
//!
//! ```text
//! IrcIngestor ──► LogStore ◄── Selector ──► Blacklist ──► Speaker
//!  (task per       (files)      (blocking       (filter)     (front-end
//!   channel)                     read per                     collaborator)
//!                                request)
//! ```
//!
//! Ingestion runs as one tokio task per channel until the relay hangs up or
//! the session is stopped. Selections run the log read on the blocking pool;
//! at most one selection per channel is in flight at a time.

pub use chatpick_core::{
    AffixRule, Blacklist, ChatMessage, Config, LogStore, SelectionMode, SelectionRequest,
    SelectionResult, Selector,
};
pub use chatpick_feeds::{ChannelSession, IngestError, IrcIngestor, SessionEnd};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] chatpick_core::Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel {0} is already being ingested")]
    AlreadyRunning(String),

    #[error("A selection for {0} is already in progress")]
    SelectionInFlight(String),

    #[error("Channel {0} has no running session")]
    NotRunning(String),

    #[error("Selection task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Downstream consumer of a found message (the speech engine, in the
/// original front-end). Receives `"{username} says {comment}"`.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str) -> std::io::Result<()>;
}

/// Writes the text to stdout, one line per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSpeaker;

impl Speaker for StdoutSpeaker {
    fn speak(&self, text: &str) -> std::io::Result<()> {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")?;
        out.flush()
    }
}

// ---------------------------------------------------------------------------
// ChatPick
// ---------------------------------------------------------------------------

/// Front-end facade: owns the ingestor, the selector and every running session.
pub struct ChatPick {
    ingestor: IrcIngestor,
    selector: Arc<Selector>,
    sessions: tokio::sync::Mutex<HashMap<String, ChannelSession>>,
    starting: Arc<Mutex<HashSet<String>>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ChatPick {
    /// Build everything from one immutable config.
    pub fn new(config: &Config) -> Self {
        let store = LogStore::new(config.log_settings());
        let blacklist = Blacklist::from_config(&config.blacklist);
        tracing::debug!(
            connection = ?config.connection,
            random_limit = config.value.random_limit,
            blacklist_empty = blacklist.is_empty(),
            "chatpick configured"
        );
        Self::from_parts(
            IrcIngestor::new(config.connection.clone(), store.clone()),
            Selector::new(store, blacklist, config.value.random_limit),
        )
    }

    pub fn from_parts(ingestor: IrcIngestor, selector: Selector) -> Self {
        Self {
            ingestor,
            selector: Arc::new(selector),
            sessions: tokio::sync::Mutex::new(HashMap::new()),
            starting: Arc::new(Mutex::new(HashSet::new())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Start ingesting `channel`. A channel whose previous session has ended
    /// may be started again; a live one may not.
    ///
    /// The session table is not locked while connecting, so other channels
    /// can be started, listed or stopped in the meantime.
    pub async fn start_ingestion(&self, channel: &str) -> Result<()> {
        let channel = chatpick_core::normalize_channel(channel)?;
        let _starting = InFlight::acquire(&self.starting, &channel)
            .map_err(|_| Error::AlreadyRunning(channel.clone()))?;

        let finished = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(&channel).map(ChannelSession::is_finished) {
                Some(false) => return Err(Error::AlreadyRunning(channel)),
                Some(true) => sessions.remove(&channel),
                None => None,
            }
        };
        if let Some(finished) = finished {
            log_session_end(&channel, finished.wait().await);
        }

        let session = self.ingestor.start(&channel).await?;
        self.sessions.lock().await.insert(channel, session);
        Ok(())
    }

    /// Pick one message from `channel`'s log.
    pub async fn request_selection(&self, channel: &str, mode: SelectionMode) -> Result<SelectionResult> {
        let channel = chatpick_core::normalize_channel(channel)?;
        let _guard = InFlight::acquire(&self.in_flight, &channel)?;

        let selector = Arc::clone(&self.selector);
        let request = SelectionRequest::new(channel, mode);
        let result = tokio::task::spawn_blocking(move || selector.select(&request))
            .await
            .map_err(|e| Error::Task(e.to_string()))??;
        Ok(result)
    }

    /// [`ChatPick::request_selection`], handing a found message to `speaker`.
    pub async fn announce(
        &self,
        channel: &str,
        mode: SelectionMode,
        speaker: &dyn Speaker,
    ) -> Result<SelectionResult> {
        let result = self.request_selection(channel, mode).await?;
        if let SelectionResult::Found(chat) = &result {
            speaker.speak(&chat.speech_text())?;
        }
        Ok(result)
    }

    /// Channels whose receive loop is still running.
    pub async fn running_channels(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut running: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| !s.is_finished())
            .map(|(c, _)| c.clone())
            .collect();
        running.sort();
        running
    }

    /// Cancel one session and wait for it to finish.
    pub async fn stop(&self, channel: &str) -> Result<SessionEnd> {
        let channel = chatpick_core::normalize_channel(channel)?;
        let session = self
            .sessions
            .lock()
            .await
            .remove(&channel)
            .ok_or_else(|| Error::NotRunning(channel.clone()))?;
        Ok(session.stop().await?)
    }

    /// Stop every session. Returns how each one ended, sorted by channel.
    pub async fn shutdown(&self) -> Vec<(String, std::result::Result<SessionEnd, IngestError>)> {
        let drained: Vec<(String, ChannelSession)> = self.sessions.lock().await.drain().collect();
        let mut ends = Vec::with_capacity(drained.len());
        for (channel, session) in drained {
            ends.push((channel, session.stop().await));
        }
        ends.sort_by(|a, b| a.0.cmp(&b.0));
        ends
    }
}

fn log_session_end(channel: &str, end: std::result::Result<SessionEnd, IngestError>) {
    match end {
        Ok(end) => tracing::info!(channel, ?end, "previous session ended"),
        Err(e) => tracing::warn!(channel, error = %e, "previous session failed"),
    }
}

/// Marks a channel as busy (starting, or selecting) until dropped.
struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    channel: String,
}

impl InFlight {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, channel: &str) -> Result<Self> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(channel.to_string()) {
            return Err(Error::SelectionInFlight(channel.to_string()));
        }
        Ok(Self {
            set: Arc::clone(set),
            channel: channel.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.channel);
    }
}
