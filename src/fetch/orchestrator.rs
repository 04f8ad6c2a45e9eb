//! Bounded-concurrency fan-out of fetch tasks.
//!
//! Every task is spawned up front and waits on a shared semaphore, so at most
//! `concurrency` tasks hold a network connection at once. Results travel over
//! a channel to a single receiver which owns the [`RunSummary`]; no counter is
//! shared between workers.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use super::client::HttpClient;
use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY, POOL_SIZE_PER_WORKER};
use super::engine::{FetchEngine, FetchResult};
use super::error::FetchError;
use super::observer::FetchObserver;
use super::settings::FetchSettings;
use super::target::FetchTask;
use crate::parser::Identifier;
use crate::report::RunSummary;

/// Errors that stop a run before any task starts.
#[derive(Debug, Error)]
pub enum RunError {
    /// Worker count outside the accepted range.
    #[error("invalid concurrency {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Runs fetch tasks with at most `concurrency` in flight.
pub struct FetchOrchestrator {
    engine: Arc<FetchEngine>,
    observer: Arc<dyn FetchObserver>,
    concurrency: usize,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("engine", &self.engine)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    /// Wraps an existing engine.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::InvalidConcurrency`] if `concurrency` is outside
    /// `1..=100`.
    pub fn new(
        engine: FetchEngine,
        observer: Arc<dyn FetchObserver>,
        concurrency: usize,
    ) -> Result<Self, RunError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(RunError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            engine: Arc::new(engine),
            observer,
            concurrency,
        })
    }

    /// Builds the shared client and engine for `concurrency` workers.
    ///
    /// The connection pool keeps `2 × concurrency` idle connections per host.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::InvalidConcurrency`] for a bad worker count or
    /// [`RunError::Client`] if the TLS backend cannot be initialised.
    pub fn build(
        settings: FetchSettings,
        concurrency: usize,
        observer: Arc<dyn FetchObserver>,
    ) -> Result<Self, RunError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(RunError::InvalidConcurrency { value: concurrency });
        }
        let client = HttpClient::new(concurrency * POOL_SIZE_PER_WORKER, settings.connect_timeout)?;
        let engine = FetchEngine::new(client, settings, Arc::clone(&observer));
        Self::new(engine, observer, concurrency)
    }

    /// Configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Engine shared by the workers.
    #[must_use]
    pub fn engine(&self) -> &FetchEngine {
        &self.engine
    }

    /// Runs every task and returns the finished summary.
    ///
    /// Produces exactly one result per task, including tasks whose worker
    /// panicked. Returns only after all tasks have finished.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::OutputDir`] if the output directory cannot be
    /// created. Per-task failures never surface here.
    #[instrument(skip(self, tasks), fields(tasks = tasks.len(), concurrency = self.concurrency))]
    pub async fn run(&self, tasks: Vec<FetchTask>) -> Result<RunSummary, RunError> {
        let output_dir = &self.engine.settings().output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| RunError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        let started = Instant::now();
        let mut summary = RunSummary::new(tasks.len());
        self.observer.on_run_started(tasks.len());
        info!(total = tasks.len(), concurrency = self.concurrency, "starting fetch run");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<FetchResult>(self.concurrency.max(1) * 2);
        let mut handles: Vec<(FetchTask, JoinHandle<()>)> = Vec::with_capacity(tasks.len());

        for task in tasks {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let worker_task = task.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = engine.fetch(&worker_task).await;
                // Receiver outlives every sender.
                let _ = tx.send(result).await;
            });
            handles.push((task, handle));
        }
        drop(tx);

        let mut reported: HashSet<Identifier> = HashSet::new();
        while let Some(result) = rx.recv().await {
            reported.insert(result.identifier.clone());
            self.record(&mut summary, result);
        }

        for (task, handle) in handles {
            if let Err(e) = handle.await {
                error!(doi = %task.identifier, error = %e, "download task panicked");
                if !reported.contains(&task.identifier) {
                    let result = FetchResult::failed(
                        &task,
                        FetchError::TaskPanicked {
                            detail: e.to_string(),
                        },
                        std::time::Duration::ZERO,
                        0,
                    );
                    reported.insert(task.identifier.clone());
                    self.record(&mut summary, result);
                }
            }
        }

        summary.finish(started.elapsed());
        debug!(wall_clock_ms = summary.wall_clock().as_millis(), "all tasks joined");
        self.observer.on_run_finished(&summary);
        Ok(summary)
    }

    fn record(&self, summary: &mut RunSummary, result: FetchResult) {
        summary.record(&result);
        self.observer.on_task_finished(&result, summary);
    }
}
