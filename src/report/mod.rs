//! Run statistics and the per-run error log.
//!
//! [`RunSummary`] is owned by a single writer (the orchestrator's result
//! receiver) and never shared between workers. Failed results land in its
//! [`ErrorLog`], which groups them by the text before the first `:` of the
//! message and persists them as JSON.

mod error;
mod error_log;
mod format;
mod summary;

pub use error::ReportError;
pub use error_log::{ErrorGroup, ErrorLog, ErrorRecord, error_kind};
pub use format::{format_bytes, format_duration};
pub use summary::{RunStatistics, RunSummary};

/// Timestamp layout used in per-run file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
