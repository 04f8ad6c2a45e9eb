//! Retry logic with linear backoff for the page and artifact requests.
//!
//! Each network attempt reports a [`StepOutcome`]. Retryable failures are
//! classified into a [`FailureType`] and the [`RetryPolicy`] decides whether
//! another attempt is made and how long to wait first.
//!
//! # Example
//!
//! ```
//! use doihive_core::fetch::{
//!     RetryDecision, RetryPolicy, TransportError, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = TransportError::http_status("https://sci-hub.se/10.1234/x", 403);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {delay:?} (attempt {attempt})");
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {reason}");
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::constants::{BACKOFF_BASE, BACKOFF_MAX_JITTER, DEFAULT_MAX_ATTEMPTS};
use super::error::{FetchError, TransportError};

/// Result of one attempt at a network step.
#[derive(Debug)]
pub enum StepOutcome<T> {
    /// The attempt produced its payload.
    Success(T),
    /// Transport-level failure; the retry policy decides what happens next.
    Retryable(TransportError),
    /// Failure that ends the task immediately.
    Fatal(FetchError),
}

/// Classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Connection errors, timeouts and non-403 HTTP errors.
    Transient,

    /// HTTP 403 from the mirror's bot filter.
    ///
    /// Retried like a transient failure; the backoff and jitter make the
    /// next attempt look less automated.
    Blocked,

    /// Failures that would repeat on every attempt (bad URL, local disk).
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Give up.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry budget and backoff shape.
///
/// # Delay Calculation
///
/// ```text
/// delay(attempt) = base_delay * attempt + uniform(0, max_jitter)
/// ```
///
/// With defaults (3 attempts, 2 s base, 2 s jitter) the waits are roughly
/// 2-4 s and 4-6 s; no wait follows the last attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Backoff unit multiplied by the attempt number.
    base_delay: Duration,

    /// Upper bound of the random jitter.
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: BACKOFF_BASE,
            max_jitter: BACKOFF_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Creates a policy with a custom attempt budget and default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Same attempt budget, no waiting between attempts.
    #[must_use]
    pub fn without_delays(self) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            ..self
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff unit.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the jitter bound.
    #[must_use]
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt) + self.calculate_jitter()
    }

    fn calculate_jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=max_ms))
    }
}

/// Classifies a transport failure for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 403 | Blocked |
/// | other HTTP status | Transient |
/// | Timeout, Network | Transient |
/// | InvalidUrl, Io | Permanent |
///
/// Mirrors answer with assorted 4xx/5xx codes while overloaded, so no status
/// is treated as permanent.
#[instrument]
pub fn classify_error(error: &TransportError) -> FailureType {
    match error {
        TransportError::Blocked { .. } => FailureType::Blocked,
        TransportError::HttpStatus { .. }
        | TransportError::Timeout { .. }
        | TransportError::Network { .. } => FailureType::Transient,
        TransportError::InvalidUrl { .. } | TransportError::Io { .. } => FailureType::Permanent,
    }
}
