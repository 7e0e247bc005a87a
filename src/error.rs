use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the pipeline stages.
///
/// Per-document problems (unreadable files, oversized texts, recognizer
/// failures) are reported through this type but never abort a batch: the
/// stage runners log them and record a [`crate::SkippedFile`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entity recognizer failed: {0}")]
    Recognizer(String),

    #[error("text length {len} exceeds maximum limit {max}")]
    TooLong { len: usize, max: usize },

    #[error("invalid input: {0}")]
    Invalid(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
