//! Error types for echonav-engine
//!
//! Defines engine-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for echonav-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Required sensing capability is absent; the engine cannot start
    #[error("Sensing unavailable: {0}")]
    SensingUnavailable(String),

    /// Recognition model load or inference failure
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors from the shared crate (config file loading)
    #[error(transparent)]
    Common(#[from] echonav_common::Error),
}

/// Convenience Result type using echonav-engine Error
pub type Result<T> = std::result::Result<T, Error>;
