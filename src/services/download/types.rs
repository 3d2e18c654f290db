//! Download errors and events.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::AnexoIdentity;
use crate::scrapers::ScrapeError;

/// Why a single download failed. Partial files are already removed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server returned an empty body")]
    EmptyPayload,

    #[error("Cancelled")]
    Cancelled,
}

impl From<ScrapeError> for DownloadError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::Http(e) => DownloadError::Http(e),
            ScrapeError::Status(status) => DownloadError::Status(status),
            ScrapeError::InvalidUrl(e) => {
                DownloadError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
            }
        }
    }
}

/// Events emitted during retrieval.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Download started; `path` is the reserved destination.
    Started {
        identity: AnexoIdentity,
        url: String,
        path: PathBuf,
    },
    Completed {
        identity: AnexoIdentity,
        path: PathBuf,
        bytes: u64,
    },
    Failed {
        identity: AnexoIdentity,
        url: String,
        error: String,
    },
}
