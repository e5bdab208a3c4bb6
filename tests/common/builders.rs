//! Test builders — ergonomic constructors for relay lines, configs and logs.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.
#![allow(dead_code)]

use chatpick::{ChatMessage, Config, LogStore};
use std::path::Path;

// ---------------------------------------------------------------------------
// Relay lines
// ---------------------------------------------------------------------------

/// A relay chat line, CRLF-terminated, as the relay sends it.
pub fn privmsg(user: &str, channel: &str, comment: &str) -> String {
    format!(":{user}!{user}@{user}.tmi.twitch.tv PRIVMSG #{channel} :{comment}\r\n")
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a [`Config`] rooted in a temporary log directory.
///
/// # Example
///
/// ```rust
/// let cfg = ConfigBuilder::new(dir.path())
///     .random_limit(2)
///     .blacklist_users("bob")
///     .build();
/// ```
pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn new(log_dir: &Path) -> Self {
        let mut cfg = Config::defaults();
        cfg.connection.token = "oauth:test-token".to_string();
        cfg.connection.nickname = "reader".to_string();
        cfg.connection.server = "127.0.0.1".to_string();
        cfg.value.log_dir = log_dir.to_path_buf();
        Self { cfg }
    }

    pub fn server(mut self, server: &str) -> Self {
        self.cfg.connection.server = server.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.connection.port = port;
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.cfg.connection.token = token.to_string();
        self
    }

    pub fn random_limit(mut self, limit: usize) -> Self {
        self.cfg.value.random_limit = limit;
        self
    }

    pub fn log_size_megabytes(mut self, mb: f64) -> Self {
        self.cfg.value.log_size_megabytes = mb;
        self
    }

    pub fn log_backup_count(mut self, count: i64) -> Self {
        self.cfg.value.log_backup_count = count;
        self
    }

    pub fn blacklist_users(mut self, users: &str) -> Self {
        self.cfg.blacklist.users = users.to_string();
        self
    }

    pub fn blacklist_affixes(mut self, begin_with: &str, end_with: &str) -> Self {
        self.cfg.blacklist.begin_with = begin_with.to_string();
        self.cfg.blacklist.end_with = end_with.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.cfg
    }
}

// ---------------------------------------------------------------------------
// Log helpers
// ---------------------------------------------------------------------------

/// Append one relay chat record per `(user, comment)` pair to `channel`'s log.
pub fn write_chats(store: &LogStore, channel: &str, chats: &[(&str, &str)]) {
    let mut writer = store.open_writer(channel).expect("open log writer");
    let ts = chrono::Local::now();
    for (user, comment) in chats {
        writer
            .write(&ts, &privmsg(user, channel, comment))
            .expect("write chat record");
    }
}

/// Build `ChatMessage` values from `(user, comment)` pairs.
pub fn chats(pairs: &[(&str, &str)]) -> Vec<ChatMessage> {
    pairs.iter().map(|(u, c)| ChatMessage::new(*u, *c)).collect()
}
