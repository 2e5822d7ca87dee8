// src/sqli/error.rs
//! Error types for the SQL injection scanner
//!
//! Only conditions that stop a scan are errors. A probe that times out or cannot
//! connect is not an error: it is reported through `ProbeOutcome::Unreachable`
//! and the technique moves on.

use thiserror::Error;

/// Main error type for scanner operations
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration validation error (bad flags, malformed POST data)
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL or data parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Payload template could not be rendered
    #[error("Payload render error: {0}")]
    Render(String),

    /// The unmodified request failed, so there is nothing to compare against
    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// I/O error (report file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        ScanError::Http(e.to_string())
    }
}

impl From<url::ParseError> for ScanError {
    fn from(e: url::ParseError) -> Self {
        ScanError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::Serialize(format!("JSON: {}", e))
    }
}

impl From<serde_yaml::Error> for ScanError {
    fn from(e: serde_yaml::Error) -> Self {
        ScanError::Serialize(format!("YAML: {}", e))
    }
}
