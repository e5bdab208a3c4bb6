//! Core types for chatpick-core.
//!
//! This module defines the data shared across the pipeline: the parsed
//! [`ChatMessage`], the [`SelectionMode`] chosen by the front-end, and the
//! [`SelectionResult`] handed back to it.

use serde::Serialize;
use std::str::FromStr;

/// One chat line parsed out of the channel log.
///
/// Immutable once parsed. The username is kept exactly as the relay sent it;
/// case folding only happens at comparison time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChatMessage {
    pub username: String,
    pub comment: String,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            comment: comment.into(),
        }
    }

    /// Text handed to the speech collaborator: `"{username} says {comment}"`.
    pub fn speech_text(&self) -> String {
        format!("{} says {}", self.username, self.comment)
    }
}

/// How the selector orders the window before handing it to the blacklist filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Uniformly shuffled window.
    #[default]
    Random,
    /// Newest message first, then progressively older ones.
    Last,
    /// Only messages that start or end with `@{channel}`, newest first.
    Mention,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::Random => write!(f, "random"),
            SelectionMode::Last => write!(f, "last"),
            SelectionMode::Mention => write!(f, "mention"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" | "read random" => Ok(SelectionMode::Random),
            "last" | "read last" => Ok(SelectionMode::Last),
            "mention" | "@ me" | "@me" => Ok(SelectionMode::Mention),
            other => Err(format!("unknown selection mode: {other}")),
        }
    }
}

/// A single user action: pick one message from `channel` using `mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub channel: String,
    pub mode: SelectionMode,
}

impl SelectionRequest {
    pub fn new(channel: impl Into<String>, mode: SelectionMode) -> Self {
        Self {
            channel: channel.into(),
            mode,
        }
    }
}

/// Outcome of a selection. `NotFound` is a normal result, never a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SelectionResult {
    Found(ChatMessage),
    NotFound(String),
}

impl SelectionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, SelectionResult::Found(_))
    }

    /// The found message, if any.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            SelectionResult::Found(chat) => Some(chat),
            SelectionResult::NotFound(_) => None,
        }
    }
}

impl std::fmt::Display for SelectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionResult::Found(chat) => write!(f, "{}", chat.speech_text()),
            SelectionResult::NotFound(reason) => write!(f, "{reason}"),
        }
    }
}
