//! Randomised pre-request delays.
//!
//! Before the first attempt of each network step the engine sleeps for a
//! random duration drawn from that step's [`DelayRange`], so concurrent
//! workers do not hit the mirror in lockstep. Retry backoff is separate and
//! handled by [`RetryPolicy`](super::RetryPolicy).
//!
//! # Example
//!
//! ```
//! use doihive_core::fetch::{FetchStep, RequestPacing};
//!
//! # async fn example() {
//! let pacing = RequestPacing::default();
//! pacing.pause(FetchStep::Page).await;
//! # }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::trace;

use super::constants::{CONTENT_DELAY_MAX, CONTENT_DELAY_MIN, PAGE_DELAY_MAX, PAGE_DELAY_MIN};
use super::error::FetchStep;

/// Inclusive range a pre-request delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Creates a range; bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that never waits.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a delay uniformly from the range.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }
}

/// Pre-request delay ranges for both network steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacing {
    /// Delay before the page request.
    pub page: DelayRange,
    /// Delay before the artifact request.
    pub artifact: DelayRange,
}

impl Default for RequestPacing {
    fn default() -> Self {
        Self {
            page: DelayRange::new(PAGE_DELAY_MIN, PAGE_DELAY_MAX),
            artifact: DelayRange::new(CONTENT_DELAY_MIN, CONTENT_DELAY_MAX),
        }
    }
}

impl RequestPacing {
    /// Pacing that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            page: DelayRange::zero(),
            artifact: DelayRange::zero(),
        }
    }

    /// Range used before `step`.
    #[must_use]
    pub fn range(&self, step: FetchStep) -> DelayRange {
        match step {
            FetchStep::Page => self.page,
            FetchStep::Artifact => self.artifact,
        }
    }

    /// Sleeps for a random delay appropriate to `step`.
    pub async fn pause(&self, step: FetchStep) {
        let delay = self.range(step).sample();
        if delay.is_zero() {
            return;
        }
        trace!(%step, delay_ms = delay.as_millis(), "pacing before request");
        tokio::time::sleep(delay).await;
    }
}
