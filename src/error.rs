//! Error types for the report orchestrator

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {

    // =============================
    // Request / Routing Errors
    // =============================

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("No source registered for route: {0}")]
    SourceNotFound(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Source error: {0}")]
    SourceError(String),

    // =============================
    // Persistence Errors
    // =============================

    #[error("Failed to write report to {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ReportError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteError {
            path: path.into(),
            source,
        }
    }
}
