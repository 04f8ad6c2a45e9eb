//! Constants for the fetch module (timeouts, pacing, retry, artifact format).

use std::time::Duration;

/// Default mirror base URL.
pub const DEFAULT_BASE_URL: &str = "https://sci-hub.se";

/// Default number of concurrent fetch tasks.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Idle connections kept per host, as a multiple of the worker count.
pub const POOL_SIZE_PER_WORKER: usize = 2;

/// HTTP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for the mirror page.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for the artifact body.
pub const CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts per network step, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff unit; the wait after attempt `n` is `n * BACKOFF_BASE` plus jitter.
pub const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Upper bound of the random jitter added to each backoff.
pub const BACKOFF_MAX_JITTER: Duration = Duration::from_secs(2);

/// Pre-request delay range before the page request.
pub const PAGE_DELAY_MIN: Duration = Duration::from_millis(500);
/// See [`PAGE_DELAY_MIN`].
pub const PAGE_DELAY_MAX: Duration = Duration::from_millis(2000);

/// Pre-request delay range before the artifact request.
pub const CONTENT_DELAY_MIN: Duration = Duration::from_millis(300);
/// See [`CONTENT_DELAY_MIN`].
pub const CONTENT_DELAY_MAX: Duration = Duration::from_millis(1000);

/// Default artifact file extension.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Leading bytes every PDF starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Suffix of the in-progress download next to the final path.
pub const PARTIAL_SUFFIX: &str = "part";
