//! Error types for report persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to write a report file.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("cannot write report {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The error log could not be serialized.
    #[error("cannot serialize error log: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReportError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
