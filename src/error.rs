//! Error types for fdm-pipe-backend.

use thiserror::Error;

/// Errors that can occur in the pipe backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// IO error on the protocol pipe.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Invalid configuration (bad partition rule, overlap, unknown profile).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No partition key can be derived from the input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed line on the pipe.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
