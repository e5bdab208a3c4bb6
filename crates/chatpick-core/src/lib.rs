//! chatpick-core — chatpick core library.
//!
//! This crate holds the storage and selection layers of the pipeline, plus
//! the shared types and configuration used by every layer.
//!
//! # Architecture
//!
//! ```text
//! Ingestor ──► LogStore ──► Selector ──► Blacklist ──► front-end
//! (feeds)      (write)      (read)       (filter)
//! ```
//!
//! The ingestor lives in `chatpick-feeds`; it only ever writes through a
//! [`log_store::LogWriter`]. Selection reads the same files back on demand.

pub mod blacklist;
pub mod config;
pub mod error;
pub mod log_store;
pub mod parse;
pub mod selector;
pub mod types;

pub use blacklist::{AffixRule, Blacklist};
pub use config::Config;
pub use error::{normalize_channel, Error, Result};
pub use log_store::{LogSettings, LogStore, LogWriter};
pub use selector::Selector;
pub use types::{ChatMessage, SelectionMode, SelectionRequest, SelectionResult};
