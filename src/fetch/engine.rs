//! Single-fetch engine: one DOI from mirror page to validated file.
//!
//! Each task walks a fixed sequence of states:
//!
//! ```text
//! CheckExisting ──exists──▶ Skipped
//!      │
//!   PageFetch ──retries exhausted──▶ Failed
//!      │
//!  UrlExtraction ──no link──▶ Failed
//!      │
//!  ContentFetch ──retries exhausted──▶ Failed (partial file removed)
//!      │
//!   Validate ──empty / wrong magic──▶ Failed (file removed)
//!      │
//!   Persist ──▶ Success
//! ```
//!
//! Page and artifact requests each get a random pre-request pause and up to
//! `max_attempts` attempts. HTTP 403 and transport failures are retried with
//! linear backoff; discovery, validation and disk failures end the task at
//! once.

mod artifact;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::{HttpClient, is_html_response, stream_to_file};
use super::discovery::{DiscoveredLink, DiscoveryChain, page_hint};
use super::error::{FetchError, FetchStep, TransportError};
use super::observer::FetchObserver;
use super::retry::{FailureType, RetryDecision, StepOutcome, classify_error};
use super::settings::FetchSettings;
use super::target::FetchTask;
use crate::parser::Identifier;

/// Terminal state of a fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Artifact downloaded, validated and saved.
    Success,
    /// Artifact was already present; no request was made.
    Skipped,
    /// The task ended with an error.
    Failed,
}

/// Outcome of one fetch task. Exactly one is produced per task.
#[derive(Debug)]
pub struct FetchResult {
    /// The DOI that was fetched.
    pub identifier: Identifier,
    /// Mirror page the task started from.
    pub target_url: Url,
    /// Terminal state.
    pub status: FetchStatus,
    /// Size of the artifact on disk (0 for failures).
    pub byte_size: u64,
    /// Wall-clock time of the whole task.
    pub elapsed: Duration,
    /// Backoff sleeps taken across both network steps.
    pub retries: u32,
    /// Cause of a failure.
    pub error: Option<FetchError>,
}

impl FetchResult {
    /// Builds a failed result.
    #[must_use]
    pub fn failed(task: &FetchTask, error: FetchError, elapsed: Duration, retries: u32) -> Self {
        Self {
            identifier: task.identifier.clone(),
            target_url: task.target_url.clone(),
            status: FetchStatus::Failed,
            byte_size: 0,
            elapsed,
            retries,
            error: Some(error),
        }
    }

    /// Error message as recorded in the error log.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

enum Completion {
    Saved(u64),
    AlreadyPresent(u64),
}

/// Runs the per-DOI state machine.
///
/// The engine is shared by all workers of a run behind an `Arc`; the output
/// directory must exist before [`FetchEngine::fetch`] is called.
pub struct FetchEngine {
    client: HttpClient,
    settings: FetchSettings,
    discovery: DiscoveryChain,
    observer: Arc<dyn FetchObserver>,
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("settings", &self.settings)
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}

impl FetchEngine {
    /// Creates an engine with the default discovery chain.
    #[must_use]
    pub fn new(client: HttpClient, settings: FetchSettings, observer: Arc<dyn FetchObserver>) -> Self {
        Self {
            client,
            settings,
            discovery: DiscoveryChain::default(),
            observer,
        }
    }

    /// Replaces the discovery chain.
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryChain) -> Self {
        self.discovery = discovery;
        self
    }

    /// Settings this engine runs with.
    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetches one DOI and reports how it ended. Never panics on I/O or
    /// network errors; they become a [`FetchStatus::Failed`] result.
    #[instrument(skip(self, task), fields(doi = %task.identifier))]
    pub async fn fetch(&self, task: &FetchTask) -> FetchResult {
        let started = Instant::now();
        let mut retries = 0u32;
        let outcome = self.run(task, &mut retries).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Completion::Saved(bytes)) => {
                info!(bytes, elapsed_ms = elapsed.as_millis(), retries, "artifact saved");
                Self::finished(task, FetchStatus::Success, bytes, elapsed, retries)
            }
            Ok(Completion::AlreadyPresent(bytes)) => {
                debug!(bytes, "artifact already present");
                Self::finished(task, FetchStatus::Skipped, bytes, elapsed, retries)
            }
            Err(error) => {
                debug!(error = %error, retries, "fetch failed");
                FetchResult::failed(task, error, elapsed, retries)
            }
        }
    }

    fn finished(
        task: &FetchTask,
        status: FetchStatus,
        byte_size: u64,
        elapsed: Duration,
        retries: u32,
    ) -> FetchResult {
        FetchResult {
            identifier: task.identifier.clone(),
            target_url: task.target_url.clone(),
            status,
            byte_size,
            elapsed,
            retries,
            error: None,
        }
    }

    async fn run(&self, task: &FetchTask, retries: &mut u32) -> Result<Completion, FetchError> {
        let final_path = self.settings.artifact_path(&task.identifier);

        // CheckExisting
        if let Some(size) = artifact::existing_size(&final_path).await {
            return Ok(Completion::AlreadyPresent(size));
        }

        // PageFetch
        let html = self
            .with_retry(FetchStep::Page, task, retries, || self.page_attempt(&task.target_url))
            .await?;

        // UrlExtraction
        let link = self.discover(task, &html).await?;

        // ContentFetch
        let partial = FetchSettings::partial_path(&final_path);
        let fetched = self
            .with_retry(FetchStep::Artifact, task, retries, || {
                self.artifact_attempt(&link.url, &task.target_url, &partial)
            })
            .await;
        let bytes_written = match fetched {
            Ok(bytes) => bytes,
            Err(error) => {
                artifact::remove_quietly(&partial).await;
                return Err(error);
            }
        };

        // Validate + Persist
        let bytes =
            artifact::validate_and_persist(&partial, &final_path, bytes_written, &self.settings.magic)
                .await?;
        Ok(Completion::Saved(bytes))
    }

    /// Runs `attempt` until it succeeds, fails fatally, or the policy gives up.
    async fn with_retry<T, F, Fut>(
        &self,
        step: FetchStep,
        task: &FetchTask,
        retries: &mut u32,
        mut attempt: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StepOutcome<T>>,
    {
        let policy = &self.settings.retry_policy;
        self.settings.pacing.pause(step).await;

        let mut attempt_number = 0u32;
        loop {
            attempt_number += 1;
            debug!(%step, attempt = attempt_number, "sending request");

            let cause = match attempt().await {
                StepOutcome::Success(value) => return Ok(value),
                StepOutcome::Fatal(error) => return Err(error),
                StepOutcome::Retryable(cause) => cause,
            };

            match policy.should_retry(classify_error(&cause), attempt_number) {
                RetryDecision::Retry { delay, attempt: next } => {
                    self.observer
                        .on_retry(&task.identifier, step, next, delay, &cause);
                    *retries += 1;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(%step, %reason, "giving up");
                    return Err(FetchError::RetriesExhausted {
                        step,
                        cause,
                        attempts: attempt_number,
                    });
                }
            }
        }
    }

    async fn page_attempt(&self, target_url: &Url) -> StepOutcome<String> {
        match self
            .client
            .fetch_page(target_url.as_str(), self.settings.page_timeout)
            .await
        {
            Ok(html) => StepOutcome::Success(html),
            Err(e) => transport_outcome(FetchStep::Page, e),
        }
    }

    async fn artifact_attempt(
        &self,
        link: &Url,
        referer: &Url,
        partial: &std::path::Path,
    ) -> StepOutcome<u64> {
        let response = match self
            .client
            .open_artifact(link.as_str(), referer.as_str(), self.settings.content_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_outcome(FetchStep::Artifact, e),
        };

        if is_html_response(&response) {
            debug!(url = %link, "artifact URL served an HTML page");
            return StepOutcome::Fatal(FetchError::InvalidFormat);
        }

        match stream_to_file(response, link.as_str(), partial).await {
            Ok(bytes) => StepOutcome::Success(bytes),
            Err(e) => {
                artifact::remove_quietly(partial).await;
                transport_outcome(FetchStep::Artifact, e)
            }
        }
    }

    async fn discover(&self, task: &FetchTask, html: &str) -> Result<DiscoveredLink, FetchError> {
        if let Some(link) = self.discovery.discover(html, &task.target_url) {
            return Ok(link);
        }

        let hint = page_hint(html).unwrap_or("unrecognised page layout");
        let dumped: Option<PathBuf> = match &self.settings.debug_html_dir {
            Some(dir) => artifact::write_debug_page(dir, &task.identifier, html).await,
            None => None,
        };
        warn!(
            url = %task.target_url,
            hint,
            page_bytes = html.len(),
            dumped = ?dumped,
            "no artifact link on page"
        );
        Err(FetchError::NoArtifactUrl)
    }
}

fn transport_outcome<T>(step: FetchStep, error: TransportError) -> StepOutcome<T> {
    if classify_error(&error) == FailureType::Permanent {
        StepOutcome::Fatal(FetchError::from_transport(step, error))
    } else {
        StepOutcome::Retryable(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::fetch::NoopObserver;
    use crate::fetch::TargetResolver;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn engine(output: &std::path::Path) -> FetchEngine {
        let client = HttpClient::new(4, Duration::from_secs(5)).unwrap();
        let settings = FetchSettings::new(output).without_delays();
        FetchEngine::new(client, settings, Arc::new(NoopObserver))
    }

    fn task(base: &str, doi: &str) -> FetchTask {
        TargetResolver::new(base)
            .unwrap()
            .resolve(&Identifier::parse(doi).unwrap())
            .unwrap()
    }

    #[test]
    fn test_transport_outcome_splits_permanent() {
        let outcome: StepOutcome<()> =
            transport_outcome(FetchStep::Page, TransportError::invalid_url("x"));
        assert!(matches!(outcome, StepOutcome::Fatal(FetchError::StepFailed { .. })));

        let outcome: StepOutcome<()> =
            transport_outcome(FetchStep::Page, TransportError::http_status("x", 403));
        assert!(matches!(outcome, StepOutcome::Retryable(TransportError::Blocked { .. })));
    }

    #[tokio::test]
    async fn test_fetch_skips_existing_without_network() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("10.1234_abc.pdf"), b"%PDF-1.4").unwrap();

        // Port 9 is discard; any request would fail, proving none is made.
        let result = engine(dir.path())
            .fetch(&task("http://127.0.0.1:9", "10.1234/abc"))
            .await;
        assert_eq!(result.status, FetchStatus::Skipped);
        assert_eq!(result.byte_size, 8);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_success_end_to_end() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/10.1234/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="download"><a href="/files/abc.pdf">save</a></div>"#,
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/abc.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 data".to_vec()))
            .mount(&mock_server)
            .await;

        let result = engine(dir.path())
            .fetch(&task(&mock_server.uri(), "10.1234/abc"))
            .await;
        assert_eq!(result.status, FetchStatus::Success, "{:?}", result.error);
        assert_eq!(result.byte_size, 13);
        assert_eq!(result.retries, 0);
        assert!(dir.path().join("10.1234_abc.pdf").exists());
        assert!(!dir.path().join("10.1234_abc.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_fetch_html_content_type_rejected_without_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/10.1234/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<object type="application/pdf" data="/files/abc.pdf#view=FitH"></object>"#,
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/abc.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"<html>captcha</html>".to_vec(), "text/html"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = engine(dir.path())
            .fetch(&task(&mock_server.uri(), "10.1234/abc"))
            .await;
        assert_eq!(result.status, FetchStatus::Failed);
        assert_eq!(result.error_message().unwrap(), "invalid artifact format");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_no_link_dumps_debug_page() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let debug_dir = dir.path().join("debug");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>article not found</p>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new(4, Duration::from_secs(5)).unwrap();
        let mut settings = FetchSettings::new(dir.path()).without_delays();
        settings.debug_html_dir = Some(debug_dir.clone());
        let engine = FetchEngine::new(client, settings, Arc::new(NoopObserver));

        let result = engine.fetch(&task(&mock_server.uri(), "10.1234/abc")).await;
        assert_eq!(result.status, FetchStatus::Failed);
        assert_eq!(result.error_message().unwrap(), "no artifact URL found on page");
        assert!(debug_dir.join("10.1234_abc.html").exists());
    }
}
