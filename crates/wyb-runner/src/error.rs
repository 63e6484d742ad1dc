//! Error types for the runner.

use thiserror::Error;
use wyb_protocol::ProtocolError;

/// Errors raised while configuring or running the watch and phone sides.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Socket or file error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML file could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// A message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The catalog is unusable.
    #[error("invalid catalog: {0}")]
    Catalog(String),

    /// The loopback demo did not settle.
    #[error("conversation did not settle after {0} steps")]
    Runaway(usize),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
