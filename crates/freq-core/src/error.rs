use std::path::PathBuf;
use thiserror::Error;

use crate::models::CodePoint;

/// All errors produced by the frequency collector.
#[derive(Error, Debug)]
pub enum FreqError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of the transliteration table could not be parsed.
    #[error("Malformed transliteration table line {line} ({content:?}): {reason}")]
    MalformedTableLine {
        line: usize,
        content: String,
        reason: String,
    },

    /// A character present in the store has no transliteration entry.
    #[error("No transliteration known for {0}")]
    MissingTransliteration(CodePoint),

    /// The persistent store rejected or failed an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The store contents contradict each other (e.g. a total with no records).
    #[error("Inconsistent statistics: {0}")]
    Inconsistent(String),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FreqError {
    /// Wrap any displayable storage-layer error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        FreqError::Storage(err.to_string())
    }
}

/// Convenience alias used throughout the collector crates.
pub type Result<T> = std::result::Result<T, FreqError>;
