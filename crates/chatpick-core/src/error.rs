//! Error type shared by the core pipeline layers.

/// Errors raised by configuration loading and the log store.
///
/// Running out of candidates during selection is not an error; it is a
/// [`SelectionResult::NotFound`](crate::SelectionResult::NotFound).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Normalise a channel name as typed by the user: surrounding whitespace and a
/// leading `#` are dropped. Blank names are rejected.
pub fn normalize_channel(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let name = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidChannel(raw.to_string()));
    }
    Ok(name.to_string())
}
