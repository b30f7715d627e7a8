//! Error types shared across the crate

use thiserror::Error;

/// Errors produced by resolution and provisioning
#[derive(Debug, Error)]
pub enum Error {
    #[error("Hardware query failed: {0}")]
    HardwareQuery(String),

    #[error("Release catalog unavailable (primary: {primary}; mirror: {mirror})")]
    CatalogUnavailable { primary: String, mirror: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid backend selection '{0}', expected 'version/backend'")]
    InvalidSelection(String),
}

impl Error {
    /// Cancellation is surfaced as "stopped", never retried against the mirror.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
