//! Log store — one rotating flat text log per channel.
//!
//! The ingestor appends timestamped relay lines through a [`LogWriter`]; the
//! selector reads the active file back with [`LogStore::read_messages`].
//!
//! # Layout
//!
//! ```text
//! logs/#channel.log      active file, appended to
//! logs/#channel.log.1    most recent backup
//! logs/#channel.log.N    oldest backup (N = backup_count)
//! ```
//!
//! Before a record is written, the writer checks whether it would push the
//! active file past `max_bytes`. If so the backups shift up one slot (the
//! oldest is deleted), the active file becomes `.1`, and a fresh active file
//! is created. A record larger than `max_bytes` on its own is still written
//! to a fresh file; the threshold only decides when to rotate.
//!
//! The active path never disappears during rotation, so a reader in another
//! process (`chatpick pick` next to `chatpick listen`) always opens either the
//! old file or the new one, which already holds the incoming record:
//!
//! ```text
//! 1. hard-link #chan.log   -> #chan.log.1     (old content now has two names)
//! 2. create    .#chan.log.new                 (holding the incoming record)
//! 3. rename    .#chan.log.new -> #chan.log    (atomic replace)
//! ```
//!
//! Once opened, a reader keeps its file handle even if the file is renamed.

use crate::parse::parse_chats;
use crate::types::ChatMessage;
use chrono::{DateTime, TimeZone};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Timestamp prefix of every record: `2024-01-15_10:00:00-{raw}`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Where logs live and when they rotate. Built by
/// [`Config::log_settings`](crate::config::Config::log_settings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            max_bytes: 1 << 20,
            backup_count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// LogStore
// ---------------------------------------------------------------------------

/// Handle to the per-channel log files under one directory.
#[derive(Debug, Clone)]
pub struct LogStore {
    settings: LogSettings,
}

impl LogStore {
    pub fn new(settings: LogSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// `{dir}/#{channel}.log`
    pub fn path_for(&self, channel: &str) -> PathBuf {
        self.settings.dir.join(format!("#{channel}.log"))
    }

    /// `{dir}/#{channel}.log.{slot}`
    pub fn backup_path(&self, channel: &str, slot: usize) -> PathBuf {
        self.settings.dir.join(format!("#{channel}.log.{slot}"))
    }

    /// `{dir}/.#{channel}.log.new`, the fresh active file before it is
    /// renamed into place.
    fn staging_path(&self, channel: &str) -> PathBuf {
        self.settings.dir.join(format!(".#{channel}.log.new"))
    }

    /// Open (or create) the active file for appending. Creates the log
    /// directory if it is missing.
    pub fn open_writer(&self, channel: &str) -> io::Result<LogWriter> {
        fs::create_dir_all(&self.settings.dir)?;
        let path = self.path_for(channel);
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        tracing::debug!(channel, path = %path.display(), size, "log writer opened");
        Ok(LogWriter {
            store: self.clone(),
            channel: channel.to_string(),
            path,
            file,
            size,
        })
    }

    /// Raw text of the active file. A missing file reads as empty.
    pub fn read_all(&self, channel: &str) -> io::Result<String> {
        let path = self.path_for(channel);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(channel, path = %path.display(), "no log yet");
                return Ok(String::new());
            }
            Err(e) => return Err(e),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Raw relay lines of the active file, oldest first, timestamp prefixes
    /// left in place.
    pub fn read_lines(&self, channel: &str) -> io::Result<Vec<String>> {
        Ok(self
            .read_all(channel)?
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Every chat message in the active file, oldest first. Lines that are
    /// not chat messages are skipped.
    pub fn read_messages(&self, channel: &str) -> io::Result<Vec<ChatMessage>> {
        Ok(parse_chats(&self.read_all(channel)?))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

// ---------------------------------------------------------------------------
// LogWriter
// ---------------------------------------------------------------------------

/// Append handle for one channel's active log file.
#[derive(Debug)]
pub struct LogWriter {
    store: LogStore,
    channel: String,
    path: PathBuf,
    file: File,
    size: u64,
}

impl LogWriter {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Bytes currently in the active file.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append one record: `{timestamp}-{raw}` plus a newline when `raw`
    /// does not already end with one.
    pub fn write<Tz>(&mut self, ts: &DateTime<Tz>, raw: &str) -> io::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut record = format!("{}-{}", ts.format(TIMESTAMP_FORMAT), raw);
        if !record.ends_with('\n') {
            record.push('\n');
        }

        if self.should_rotate(record.len() as u64) {
            return self.rotate_with(record.as_bytes());
        }

        self.file.write_all(record.as_bytes())?;
        self.file.flush()?;
        self.size += record.len() as u64;
        Ok(())
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        self.size > 0 && self.size + incoming > self.store.settings.max_bytes
    }

    /// Shift backups up one slot and start a fresh active file holding
    /// `first`. The record is written before the file is renamed into place.
    fn rotate_with(&mut self, first: &[u8]) -> io::Result<()> {
        let backups = self.store.settings.backup_count.max(1);

        remove_if_present(&self.store.backup_path(&self.channel, backups))?;
        for slot in (1..backups).rev() {
            let from = self.store.backup_path(&self.channel, slot);
            if from.exists() {
                fs::rename(&from, self.store.backup_path(&self.channel, slot + 1))?;
            }
        }

        self.file.flush()?;
        let newest_backup = self.store.backup_path(&self.channel, 1);
        if let Err(e) = fs::hard_link(&self.path, &newest_backup) {
            tracing::debug!(channel = %self.channel, error = %e, "hard link failed, copying instead");
            fs::copy(&self.path, &newest_backup)?;
        }

        let staging = self.store.staging_path(&self.channel);
        remove_if_present(&staging)?;
        let mut fresh = OpenOptions::new().create_new(true).append(true).open(&staging)?;
        fresh.write_all(first)?;
        fresh.flush()?;
        fs::rename(&staging, &self.path)?;
        self.file = fresh;

        tracing::info!(channel = %self.channel, rotated_bytes = self.size, backups, "log rotated");
        self.size = first.len() as u64;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
