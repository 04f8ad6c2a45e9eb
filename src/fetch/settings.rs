//! Per-run settings shared by every fetch task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::constants::{
    CONNECT_TIMEOUT, CONTENT_TIMEOUT, DEFAULT_EXTENSION, PAGE_TIMEOUT, PARTIAL_SUFFIX, PDF_MAGIC,
};
use super::pacing::RequestPacing;
use super::retry::RetryPolicy;
use crate::parser::Identifier;

/// Everything the engine needs besides the HTTP client.
///
/// Defaults: `pdf` files starting with `%PDF`, 10 s page timeout, 30 s
/// artifact timeout, 3 attempts per step, and pre-request pacing.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Directory artifacts are written to.
    pub output_dir: PathBuf,
    /// Artifact file extension, without the dot.
    pub extension: String,
    /// Bytes a valid artifact starts with.
    pub magic: Vec<u8>,
    /// Timeout for the page request.
    pub page_timeout: Duration,
    /// Timeout for the artifact request, body included.
    pub content_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Attempt budget and backoff for both network steps.
    pub retry_policy: RetryPolicy,
    /// Random delay before the first attempt of each step.
    pub pacing: RequestPacing,
    /// Where to save pages on which no artifact link was found.
    pub debug_html_dir: Option<PathBuf>,
}

impl FetchSettings {
    /// Default settings writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            magic: PDF_MAGIC.to_vec(),
            page_timeout: PAGE_TIMEOUT,
            content_timeout: CONTENT_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
            pacing: RequestPacing::default(),
            debug_html_dir: None,
        }
    }

    /// Same settings with pacing and backoff sleeps switched off.
    #[must_use]
    pub fn without_delays(self) -> Self {
        Self {
            retry_policy: self.retry_policy.without_delays(),
            pacing: RequestPacing::disabled(),
            ..self
        }
    }

    /// Final path of the artifact for `identifier`.
    #[must_use]
    pub fn artifact_path(&self, identifier: &Identifier) -> PathBuf {
        self.output_dir.join(identifier.file_name(&self.extension))
    }

    /// In-progress path next to `final_path`.
    #[must_use]
    pub fn partial_path(final_path: &Path) -> PathBuf {
        let mut name = final_path.as_os_str().to_os_string();
        name.push(".");
        name.push(PARTIAL_SUFFIX);
        PathBuf::from(name)
    }
}
