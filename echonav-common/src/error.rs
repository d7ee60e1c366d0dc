//! Common error types for EchoNav

use thiserror::Error;

/// Common result type for EchoNav operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across EchoNav crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML document could not be parsed into the requested type
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging subsystem could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}
