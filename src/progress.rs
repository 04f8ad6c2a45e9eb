//! Console progress bar driven by fetch events.

use std::time::Duration;

use doihive_core::fetch::{FetchObserver, FetchResult, FetchStatus, FetchStep, TransportError};
use doihive_core::parser::Identifier;
use doihive_core::report::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Progress bar observer. Hidden when `enabled` is false.
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl FetchObserver for ProgressObserver {
    fn on_run_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(120));
        info!(total, "starting downloads");
    }

    fn on_retry(
        &self,
        identifier: &Identifier,
        step: FetchStep,
        next_attempt: u32,
        delay: Duration,
        cause: &TransportError,
    ) {
        self.bar.suspend(|| {
            info!(
                doi = %identifier,
                %step,
                attempt = next_attempt,
                delay_ms = delay.as_millis(),
                error = %cause,
                "retrying"
            );
        });
    }

    fn on_task_finished(&self, result: &FetchResult, summary: &RunSummary) {
        self.bar.inc(1);
        self.bar.set_message(format!(
            "ok {} skip {} fail {}",
            summary.success_count(),
            summary.skip_count(),
            summary.failed_count()
        ));
        if result.status == FetchStatus::Failed {
            let error = result.error_message().unwrap_or_default();
            self.bar.suspend(|| warn!(doi = %result.identifier, %error, "download failed"));
        }
    }

    fn on_run_finished(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
