//! Error types for Vigil

use thiserror::Error;

/// Main error type for Vigil operations
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("History database error: {0}")]
    HistoryError(#[from] rusqlite::Error),

    #[error("History store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Nothing to scan: {0}")]
    NothingToScan(#[from] TargetError),

    #[error("Scan cancelled")]
    Cancelled,
}

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Rejection of a raw target string before any probe runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("no target was provided")]
    InvalidInput,

    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// Failure of a single probe. Always recorded in the report, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("no response: {0}")]
    FetchFailure(String),

    #[error("could not resolve host: {0}")]
    DnsResolution(String),

    #[error("could not parse response: {0}")]
    ParseFailure(String),

    #[error("unexpected probe fault: {0}")]
    UnexpectedFault(String),

    #[error("probe cancelled")]
    Cancelled,
}
