//! Error types for the fetch module.
//!
//! [`TransportError`] describes what went wrong on a single HTTP attempt;
//! [`FetchError`] is the terminal cause recorded for a failed task. The
//! `Display` text of [`FetchError`] is what lands in the error log, and the
//! part before its first `:` is the error type used for grouping.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Network step of a fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    /// GET of the mirror page for an identifier.
    Page,
    /// Streaming GET of the discovered artifact URL.
    Artifact,
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("page request"),
            Self::Artifact => f.write_str("artifact download"),
        }
    }
}

/// Failure of one HTTP attempt.
///
/// There are deliberately no `From` impls: every variant is built with the URL
/// or path it concerns through the helper constructors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS or body-read failure.
    #[error("{source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The per-request timeout elapsed.
    #[error("request timed out")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP 403, the mirror's answer to clients it considers automated.
    #[error("HTTP 403 (blocked)")]
    Blocked {
        /// The URL that was refused.
        url: String,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be built from the URL.
    #[error("invalid URL {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// Writing the response body to disk failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an error for a non-success status, separating out 403.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        if status == 403 {
            Self::Blocked { url: url.into() }
        } else {
            Self::HttpStatus {
                url: url.into(),
                status,
            }
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Maps a reqwest send/read error, separating out timeouts.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else if source.is_builder() {
            Self::invalid_url(url)
        } else {
            Self::network(url, source)
        }
    }
}

/// Terminal cause of a failed fetch task.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A network step kept failing until the attempt budget ran out.
    #[error("{step} failed: {cause} (retried {attempts} times)")]
    RetriesExhausted {
        /// Which step gave up.
        step: FetchStep,
        /// Failure of the last attempt.
        #[source]
        cause: TransportError,
        /// Attempts made, including the first.
        attempts: u32,
    },

    /// A network step failed in a way retrying cannot fix.
    #[error("{step} failed: {cause}")]
    StepFailed {
        /// Which step failed.
        step: FetchStep,
        /// The failure.
        #[source]
        cause: TransportError,
    },

    /// None of the discovery strategies found an artifact link on the page.
    #[error("no artifact URL found on page")]
    NoArtifactUrl,

    /// The artifact body was zero bytes.
    #[error("empty download")]
    EmptyDownload,

    /// The artifact did not start with the expected magic bytes.
    #[error("invalid artifact format")]
    InvalidFormat,

    /// Writing or moving the artifact file failed.
    #[error("file write failed: {path}: {source}")]
    FileWrite {
        /// The file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The task died before reporting a result.
    #[error("task panicked: {detail}")]
    TaskPanicked {
        /// Join error text.
        detail: String,
    },
}

impl FetchError {
    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Maps a non-retryable transport failure onto the terminal cause.
    ///
    /// Disk errors become [`FetchError::FileWrite`]; everything else keeps its
    /// step.
    #[must_use]
    pub fn from_transport(step: FetchStep, cause: TransportError) -> Self {
        match cause {
            TransportError::Io { path, source } => Self::FileWrite { path, source },
            cause => Self::StepFailed { step, cause },
        }
    }
}
