//! DOI fetch pipeline: mirror page → artifact link → validated file.
//!
//! # Features
//!
//! - Browser-like request headers and a shared cookie store
//! - Randomised pacing before page and artifact requests
//! - Linear backoff with jitter on blocked and transient failures
//! - Four ordered link discovery strategies
//! - Streamed artifact downloads through a `.part` file, validated before rename
//! - Bounded worker pool with exactly one result per task
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use doihive_core::fetch::{
//!     DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, FetchOrchestrator, FetchSettings, TargetResolver,
//!     TracingObserver,
//! };
//! use doihive_core::parser::Identifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = TargetResolver::new(DEFAULT_BASE_URL)?;
//! let task = resolver.resolve(&Identifier::parse("10.1038/nature12373")?)?;
//!
//! let orchestrator = FetchOrchestrator::build(
//!     FetchSettings::new("pdf"),
//!     DEFAULT_CONCURRENCY,
//!     Arc::new(TracingObserver),
//! )?;
//! let summary = orchestrator.run(vec![task]).await?;
//! println!("{} saved", summary.success_count());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod discovery;
mod engine;
mod error;
mod observer;
mod orchestrator;
mod pacing;
mod retry;
mod settings;
mod target;

pub use client::{HttpClient, stream_to_file};
pub use constants::{
    BACKOFF_BASE, BACKOFF_MAX_JITTER, CONNECT_TIMEOUT, CONTENT_TIMEOUT, DEFAULT_BASE_URL,
    DEFAULT_CONCURRENCY, DEFAULT_EXTENSION, DEFAULT_MAX_ATTEMPTS, MAX_CONCURRENCY,
    MIN_CONCURRENCY, PAGE_TIMEOUT, PDF_MAGIC,
};
pub use discovery::{
    DiscoveredLink, DiscoveryChain, DiscoveryStrategy, DownloadLinkPattern, DownloadLinkSelector,
    EmbeddedObjectPattern, EmbeddedObjectSelector, HtmlPage, PageElement, page_hint,
};
pub use engine::{FetchEngine, FetchResult, FetchStatus};
pub use error::{FetchError, FetchStep, TransportError};
pub use observer::{FetchObserver, NoopObserver, TracingObserver};
pub use orchestrator::{FetchOrchestrator, RunError};
pub use pacing::{DelayRange, RequestPacing};
pub use retry::{FailureType, RetryDecision, RetryPolicy, StepOutcome, classify_error};
pub use settings::FetchSettings;
pub use target::{FetchTask, TargetError, TargetResolver};
