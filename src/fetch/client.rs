//! HTTP client wrapper for the page and artifact requests.
//!
//! One [`HttpClient`] is built per run and cloned into every task; clones
//! share the connection pool and cookie store.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::error::TransportError;
use crate::user_agent;

/// Shared HTTP client with browser headers and a cookie store.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use doihive_core::fetch::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(6, Duration::from_secs(10))?;
/// let html = client
///     .fetch_page("https://sci-hub.se/10.1234/abc", Duration::from_secs(10))
///     .await?;
/// println!("{} bytes of HTML", html.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client keeping up to `pool_size` idle connections per host.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error when the TLS backend or resolver cannot be
    /// initialised.
    pub fn new(pool_size: usize, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .default_headers(user_agent::browser_headers())
            .cookie_store(true)
            .gzip(true)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(pool_size)
            .build()?;
        Ok(Self { client })
    }

    /// GETs the mirror page and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Blocked`] for 403, [`TransportError::HttpStatus`]
    /// for other non-success codes, and timeout or network errors otherwise.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        let response = check_status(url, response)?;
        response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))
    }

    /// GETs the artifact with `Referer` set to the page it was found on.
    ///
    /// The body is not read; pass the response to [`stream_to_file`].
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::fetch_page`].
    #[instrument(level = "debug", skip(self))]
    pub async fn open_artifact(
        &self,
        url: &str,
        referer: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        check_status(url, response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        debug!(url, status = status.as_u16(), "non-success status");
        Err(TransportError::http_status(url, status.as_u16()))
    }
}

/// True when the response declares an HTML body.
pub(crate) fn is_html_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("text/html"))
}

/// Streams the response body into a new file at `file_path`, returning bytes written.
///
/// Leaves whatever was written on error; the caller removes it.
///
/// # Errors
///
/// Body read failures map to network or timeout errors, disk failures to
/// [`TransportError::Io`].
pub async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, TransportError> {
    let file = File::create(file_path)
        .await
        .map_err(|e| TransportError::io(file_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| TransportError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransportError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| TransportError::io(file_path, e))?;

    Ok(bytes_written)
}
