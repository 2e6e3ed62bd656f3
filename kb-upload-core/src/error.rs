//! Error types shared by the scanner and the two network clients.

use std::path::PathBuf;

/// Failure of a single request attempt that is not an HTTP status.
///
/// Status codes (including 4xx/5xx) are never errors here: they come back as
/// [`crate::contract::ApiResponse`] so the retry loops can inspect them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to traverse {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
