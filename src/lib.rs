//! doihive core library
//!
//! Turns Web of Science export files into a folder of full-text PDFs: DOIs
//! are pulled from the exports, mapped onto a mirror URL, and fetched by a
//! bounded pool of workers that each walk page → link → artifact with retry
//! and validation.
//!
//! # Architecture
//!
//! - [`parser`] - Export parsing, DOI validation and archive coverage checks
//! - [`fetch`] - Target resolution, the single-fetch engine and the orchestrator
//! - [`report`] - Run statistics and the per-run error log

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod parser;
pub mod report;
pub(crate) mod user_agent;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use fetch::{
    DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, FetchEngine, FetchError, FetchObserver,
    FetchOrchestrator, FetchResult, FetchSettings, FetchStatus, FetchTask, RetryPolicy, RunError,
    TargetResolver, TracingObserver,
};
pub use parser::{ArchiveReport, Identifier, ParseError, check_archive, extract_identifiers};
pub use report::{ErrorLog, RunStatistics, RunSummary};
