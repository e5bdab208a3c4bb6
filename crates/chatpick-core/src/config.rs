//! Configuration types for chatpick.
//!
//! [`Config::load`] reads `app.toml` (or the given path), creating it with
//! hardcoded defaults if it does not yet exist, then applies
//! `CHATPICK__SECTION__KEY` environment overrides. [`Config::defaults`]
//! returns the same defaults without touching the filesystem (useful in tests).
//!
//! The config is read once and never mutated afterwards; the ingestor and the
//! selector receive the pieces they need through their constructors.

use crate::blacklist::AffixRule;
use crate::error::{Error, Result};
use crate::log_store::LogSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[connection]
token    = ""
server   = "irc.chat.twitch.tv"
port     = 6667
nickname = ""

[value]
random_limit       = 50
log_size_megabytes = 1.0
log_backup_count   = 1
log_dir            = "logs"

[blacklist]
users      = ""
begin_with = ""
end_with   = ""
affix_rule = "both"
"#;

/// File read by [`Config::load`] when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "app.toml";

const ENV_PREFIX: &str = "CHATPICK";

/// One megabyte, as the log size setting counts it.
const MEGABYTE: f64 = (1u64 << 20) as f64;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub value: ValueConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
}

/// `[connection]` section: where the relay lives and who we log in as.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Pre-obtained access token, sent verbatim as `PASS {token}`.
    pub token: String,
    pub server: String,
    pub port: u16,
    pub nickname: String,
}

// Hand-written so the access token never ends up in a log line.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("server", &self.server)
            .field("port", &self.port)
            .field("nickname", &self.nickname)
            .finish()
    }
}

/// `[value]` section: selection window and log rotation limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueConfig {
    /// Size of the selection window (most recent N parsed messages).
    pub random_limit: usize,
    /// Rotation threshold in megabytes. Non-positive values fall back to 1.
    pub log_size_megabytes: f64,
    /// Number of rotated backups to keep. Values below 1 are raised to 1.
    pub log_backup_count: i64,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf { PathBuf::from("logs") }

/// `[blacklist]` section. Every list is a single comma-separated string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlacklistConfig {
    #[serde(default)]
    pub users: String,
    #[serde(default)]
    pub begin_with: String,
    #[serde(default)]
    pub end_with: String,
    #[serde(default)]
    pub affix_rule: AffixRule,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`]), layered on top of the
    /// built-in defaults and under environment overrides. Creates the file
    /// with defaults if it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
            tracing::info!(path = %path.display(), "wrote default config");
        }

        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document layered on top of the built-in defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    fn validate(&self) -> Result<()> {
        if self.value.random_limit == 0 {
            return Err(Error::InvalidConfig("value.random_limit must be at least 1".into()));
        }
        if self.connection.server.trim().is_empty() {
            return Err(Error::InvalidConfig("connection.server must not be empty".into()));
        }
        Ok(())
    }

    /// Rotation limits derived from the `[value]` section.
    pub fn log_settings(&self) -> LogSettings {
        let megabytes = if self.value.log_size_megabytes > 0.0 {
            self.value.log_size_megabytes
        } else {
            1.0
        };
        LogSettings {
            dir: self.value.log_dir.clone(),
            max_bytes: (megabytes * MEGABYTE) as u64,
            backup_count: self.value.log_backup_count.max(1) as usize,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
