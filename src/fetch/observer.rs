//! Run reporting hooks.
//!
//! A [`FetchObserver`] is handed to the orchestrator and engine when they are
//! built; there is no global reporter. Every method has an empty default.

use std::time::Duration;

use tracing::{info, warn};

use super::engine::{FetchResult, FetchStatus};
use super::error::{FetchStep, TransportError};
use crate::parser::Identifier;
use crate::report::RunSummary;

/// Receives progress events for one run.
pub trait FetchObserver: Send + Sync {
    /// Called once before any task starts.
    fn on_run_started(&self, _total: usize) {}

    /// Called before the engine sleeps ahead of retry `next_attempt`.
    fn on_retry(
        &self,
        _identifier: &Identifier,
        _step: FetchStep,
        _next_attempt: u32,
        _delay: Duration,
        _cause: &TransportError,
    ) {
    }

    /// Called once per task, in completion order.
    fn on_task_finished(&self, _result: &FetchResult, _summary: &RunSummary) {}

    /// Called once after the last task finished.
    fn on_run_finished(&self, _summary: &RunSummary) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}

/// Observer that logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_run_started(&self, total: usize) {
        info!(total, "fetch run started");
    }

    fn on_retry(
        &self,
        identifier: &Identifier,
        step: FetchStep,
        next_attempt: u32,
        delay: Duration,
        cause: &TransportError,
    ) {
        info!(
            doi = %identifier,
            %step,
            attempt = next_attempt,
            delay_ms = delay.as_millis(),
            error = %cause,
            "retrying request"
        );
    }

    fn on_task_finished(&self, result: &FetchResult, summary: &RunSummary) {
        let done = summary.completed();
        match (&result.status, &result.error) {
            (FetchStatus::Failed, Some(error)) => {
                warn!(doi = %result.identifier, done, error = %error, "fetch failed");
            }
            (status, _) => {
                info!(
                    doi = %result.identifier,
                    done,
                    status = ?status,
                    bytes = result.byte_size,
                    "fetch finished"
                );
            }
        }
    }

    fn on_run_finished(&self, summary: &RunSummary) {
        info!(
            success = summary.success_count(),
            skipped = summary.skip_count(),
            failed = summary.failed_count(),
            total = summary.total(),
            "fetch run finished"
        );
    }
}
