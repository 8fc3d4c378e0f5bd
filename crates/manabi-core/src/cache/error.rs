use std::path::PathBuf;

use thiserror::Error;

use super::CachePhase;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache index is corrupt: {0}")]
    Index(#[from] serde_json::Error),

    #[error("Invalid cache generation name: {0:?}")]
    InvalidGeneration(String),
}

#[derive(Error, Debug)]
pub enum CacheInstallError {
    #[error("Manifest entry {entry:?} is not a valid URL: {reason}")]
    InvalidUrl { entry: String, reason: String },

    #[error("Asset unreachable at install time: {url}")]
    Unreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to store cache generation: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot install from phase {0:?}")]
    WrongPhase(CachePhase),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cannot activate from phase {0:?}")]
    WrongPhase(CachePhase),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
