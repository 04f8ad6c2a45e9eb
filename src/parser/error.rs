//! Error types for export parsing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading an export archive.
#[derive(Debug, Error)]
pub enum ParseError {
    /// String does not have the `10.<registrant>/<suffix>` shape.
    #[error("invalid DOI '{value}'\n  Suggestion: DOIs look like 10.1234/abc.5")]
    InvalidDoi {
        /// The rejected value.
        value: String,
    },

    /// Archive directory does not exist.
    #[error("archive directory not found: {path}\n  Suggestion: {suggestion}")]
    ArchiveNotFound {
        /// The directory that was looked up.
        path: PathBuf,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Archive directory has no `.txt` exports in it.
    #[error("no .txt export files in {path}\n  Suggestion: {suggestion}")]
    NoExportFiles {
        /// The directory that was scanned.
        path: PathBuf,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Reading the archive failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The file or directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Creates an `InvalidDoi` error.
    #[must_use]
    pub fn invalid_doi(value: &str) -> Self {
        Self::InvalidDoi {
            value: value.to_string(),
        }
    }

    /// Creates an `ArchiveNotFound` error.
    #[must_use]
    pub fn archive_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ArchiveNotFound {
            path: path.into(),
            suggestion: "Export records from Web of Science as plain text into this directory",
        }
    }

    /// Creates a `NoExportFiles` error.
    #[must_use]
    pub fn no_export_files(path: impl Into<PathBuf>) -> Self {
        Self::NoExportFiles {
            path: path.into(),
            suggestion: "Save exports with the .txt extension (Plain Text / Full Record)",
        }
    }

    /// Creates an `Io` error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_doi_display_includes_value_and_suggestion() {
        let err = ParseError::invalid_doi("abc/def");
        let msg = err.to_string();
        assert!(msg.contains("abc/def"));
        assert!(msg.contains("Suggestion:"));
    }

    #[test]
    fn test_archive_not_found_display_includes_path() {
        let err = ParseError::archive_not_found("/nope/archive");
        assert!(err.to_string().contains("/nope/archive"));
    }

    #[test]
    fn test_no_export_files_display_mentions_txt() {
        let err = ParseError::no_export_files("archive");
        assert!(err.to_string().contains(".txt"));
    }
}
