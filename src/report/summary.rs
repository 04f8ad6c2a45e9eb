//! Run-wide counters and derived statistics.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::error_log::{ErrorLog, ErrorRecord};
use crate::fetch::{FetchResult, FetchStatus};

/// Aggregated outcome of one run.
///
/// Updated by a single owner as results arrive; `success + skipped + failed`
/// equals [`RunSummary::total`] once every task has been recorded.
#[derive(Debug, Clone)]
pub struct RunSummary {
    started_at: DateTime<Local>,
    total: usize,
    success: usize,
    skipped: usize,
    failed: usize,
    total_bytes: u64,
    success_time: Duration,
    skip_time: Duration,
    fail_time: Duration,
    retries: u64,
    errors: ErrorLog,
    wall_clock: Duration,
}

/// Plain statistics derived from a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Percentage of successes over `total`, 0 for an empty run.
    pub success_rate: f64,
    /// Bytes of newly saved artifacts.
    pub total_bytes: u64,
    pub average_duration: Duration,
    pub average_success_duration: Duration,
    pub average_skip_duration: Duration,
    pub average_fail_duration: Duration,
    pub wall_clock: Duration,
    /// Wall clock divided by the number of tasks.
    pub wall_clock_per_task: Duration,
    pub retries: u64,
}

impl RunSummary {
    /// Starts a summary for `total` tasks, stamped with the current time.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self::starting_at(total, Local::now())
    }

    /// Starts a summary with an explicit start time.
    #[must_use]
    pub fn starting_at(total: usize, started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            total,
            success: 0,
            skipped: 0,
            failed: 0,
            total_bytes: 0,
            success_time: Duration::ZERO,
            skip_time: Duration::ZERO,
            fail_time: Duration::ZERO,
            retries: 0,
            errors: ErrorLog::new(),
            wall_clock: Duration::ZERO,
        }
    }

    /// Folds one result into the counters.
    pub fn record(&mut self, result: &FetchResult) {
        self.retries += u64::from(result.retries);
        match result.status {
            FetchStatus::Success => {
                self.success += 1;
                self.total_bytes += result.byte_size;
                self.success_time += result.elapsed;
            }
            FetchStatus::Skipped => {
                self.skipped += 1;
                self.skip_time += result.elapsed;
            }
            FetchStatus::Failed => {
                self.failed += 1;
                self.fail_time += result.elapsed;
                if let Some(record) = ErrorRecord::from_result(result) {
                    self.errors.push(record);
                }
            }
        }
    }

    /// Stores the run's wall-clock duration.
    pub fn finish(&mut self, wall_clock: Duration) {
        self.wall_clock = wall_clock;
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Number of tasks in the run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Results recorded so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.success
    }

    #[must_use]
    pub fn skip_count(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries
    }

    #[must_use]
    pub fn wall_clock(&self) -> Duration {
        self.wall_clock
    }

    /// Failures recorded so far.
    #[must_use]
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Derives rates and averages from the counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn statistics(&self) -> RunStatistics {
        let success_rate = if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64 * 100.0
        };
        RunStatistics {
            total: self.total,
            success: self.success,
            skipped: self.skipped,
            failed: self.failed,
            success_rate,
            total_bytes: self.total_bytes,
            average_duration: average(
                self.success_time + self.skip_time + self.fail_time,
                self.completed(),
            ),
            average_success_duration: average(self.success_time, self.success),
            average_skip_duration: average(self.skip_time, self.skipped),
            average_fail_duration: average(self.fail_time, self.failed),
            wall_clock: self.wall_clock,
            wall_clock_per_task: average(self.wall_clock, self.total),
            retries: self.retries,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(sum: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => sum / n,
        Err(_) => Duration::from_secs_f64(sum.as_secs_f64() / count as f64),
    }
}
