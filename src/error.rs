//! Error types for the tagproof verifier.

use thiserror::Error;

/// Top-level error type for verifier operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Suite configuration was invalid or could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failed.
    #[error("git operation failed: {0}")]
    Git(String),

    /// IO error during scenario provisioning.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Workflow runs API operation failed.
    #[error("workflow API error: {0}")]
    Api(String),

    /// JSON payload could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML document could not be read or written.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for verifier operations.
pub type Result<T> = std::result::Result<T, Error>;
