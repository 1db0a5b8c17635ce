//! Error types for nbfetch core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching or linking resources
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Server error: {status} for {url}")]
    ServerError { status: u16, url: String },

    #[error("Server did not declare a content length for {url}")]
    MissingContentLength { url: String },

    #[error("Incomplete download: {} has {actual} of {expected} bytes", path.display())]
    Incomplete {
        path: PathBuf,
        expected: u64,
        actual: u64,
        #[source]
        source: Option<Box<FetchError>>,
    },

    #[error("Cannot remove partial file {}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Interrupted")]
    Interrupted,

    #[error("Cannot link {}", path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::Interrupted
                | FetchError::MissingContentLength { .. }
                | FetchError::InvalidUrl(_)
                | FetchError::InvalidFileName(_)
                | FetchError::Config(_)
        )
    }
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;
