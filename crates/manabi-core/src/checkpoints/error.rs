use std::path::PathBuf;

use thiserror::Error;

use crate::cache::FetchError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Checkpoint file not readable: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint data could not be fetched: {0}")]
    Fetch(#[from] FetchError),

    #[error("Checkpoint data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Checkpoint data is not a FeatureCollection (type {0:?})")]
    NotAFeatureCollection(String),

    #[error("Checkpoint feature #{index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

impl LoadError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            index,
            reason: reason.into(),
        }
    }

    /// Message for the quiz box when checkpoints could not be loaded.
    pub fn user_message(&self) -> String {
        format!("Quiz unavailable: {}", self)
    }
}
