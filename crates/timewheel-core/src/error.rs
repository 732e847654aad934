//! Unified error types for TimeWheel.

use thiserror::Error;

/// Result type alias using TimeWheelError.
pub type Result<T> = std::result::Result<T, TimeWheelError>;

#[derive(Error, Debug)]
pub enum TimeWheelError {
    // Construction errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl TimeWheelError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
