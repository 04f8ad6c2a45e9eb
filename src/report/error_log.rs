//! Error records, grouping and the per-run error files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use super::FILE_TIMESTAMP_FORMAT;
use super::error::ReportError;
use crate::fetch::FetchResult;

/// Examples kept per error group.
const GROUP_EXAMPLES: usize = 3;

/// One failed fetch as written to the error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Mirror page the task started from.
    #[serde(rename = "url")]
    pub target_url: String,
    /// The DOI that failed.
    #[serde(rename = "doi")]
    pub identifier: String,
    /// Terminal error message.
    #[serde(rename = "error")]
    pub message: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Local>,
}

impl ErrorRecord {
    /// Builds a record from a failed result, or `None` if it carries no error.
    #[must_use]
    pub fn from_result(result: &FetchResult) -> Option<Self> {
        let message = result.error_message()?;
        Some(Self {
            target_url: result.target_url.to_string(),
            identifier: result.identifier.to_string(),
            message,
            timestamp: Local::now(),
        })
    }

    /// Coarse error type of this record.
    #[must_use]
    pub fn kind(&self) -> &str {
        error_kind(&self.message)
    }
}

/// Text before the first `:` of `message`, trimmed; the whole message when
/// there is no `:`.
///
/// ```
/// use doihive_core::report::error_kind;
///
/// assert_eq!(error_kind("page request failed: HTTP 500 (retried 3 times)"), "page request failed");
/// assert_eq!(error_kind("empty download"), "empty download");
/// ```
#[must_use]
pub fn error_kind(message: &str) -> &str {
    message.split(':').next().unwrap_or(message).trim()
}

/// Errors sharing one coarse type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorGroup {
    /// Text before the first `:`.
    pub kind: String,
    /// Number of records of this type.
    pub count: usize,
    /// Up to three identifiers, in recording order.
    pub examples: Vec<String>,
}

#[derive(Serialize)]
struct LogSummary {
    total_errors: usize,
    generated_at: DateTime<Local>,
}

#[derive(Serialize)]
struct LogDocument<'a> {
    summary: LogSummary,
    errors: &'a [ErrorRecord],
}

/// Append-only list of failures for one run.
#[derive(Debug, Default, Clone)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in recording order.
    #[must_use]
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Groups records by [`error_kind`], largest group first, ties by name.
    #[must_use]
    pub fn groups(&self) -> Vec<ErrorGroup> {
        let mut by_kind: HashMap<&str, ErrorGroup> = HashMap::new();
        for record in &self.records {
            let group = by_kind.entry(record.kind()).or_insert_with(|| ErrorGroup {
                kind: record.kind().to_string(),
                count: 0,
                examples: Vec::new(),
            });
            group.count += 1;
            if group.examples.len() < GROUP_EXAMPLES {
                group.examples.push(record.identifier.clone());
            }
        }
        let mut groups: Vec<ErrorGroup> = by_kind.into_values().collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
        groups
    }

    /// Writes `download_errors_<YYYYMMDD_HHMMSS>.json` into `dir`.
    ///
    /// Returns `Ok(None)` without touching the filesystem when the log is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if `dir` cannot be created or the file cannot
    /// be written.
    pub fn write_json(
        &self,
        dir: &Path,
        started_at: DateTime<Local>,
    ) -> Result<Option<PathBuf>, ReportError> {
        if self.is_empty() {
            return Ok(None);
        }
        let document = LogDocument {
            summary: LogSummary {
                total_errors: self.records.len(),
                generated_at: Local::now(),
            },
            errors: &self.records,
        };
        let json = serde_json::to_string_pretty(&document)?;
        let path = dir.join(format!(
            "download_errors_{}.json",
            started_at.format(FILE_TIMESTAMP_FORMAT)
        ));
        write_file(dir, &path, &json)?;
        info!(path = %path.display(), errors = self.records.len(), "error log written");
        Ok(Some(path))
    }

    /// Writes `retry_dois_<YYYYMMDD_HHMMSS>.txt` into `dir`: a `#` header
    /// followed by one failed DOI per line.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] on filesystem failure.
    pub fn write_retry_list(
        &self,
        dir: &Path,
        started_at: DateTime<Local>,
    ) -> Result<Option<PathBuf>, ReportError> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut lines = vec![
            "# DOIs that failed to download".to_string(),
            format!("# generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
            format!("# count: {}", self.records.len()),
        ];
        lines.extend(self.records.iter().map(|record| record.identifier.clone()));
        let body = format!("{}\n", lines.join("\n"));
        let path = dir.join(format!(
            "retry_dois_{}.txt",
            started_at.format(FILE_TIMESTAMP_FORMAT)
        ));
        write_file(dir, &path, &body)?;
        info!(path = %path.display(), "retry list written");
        Ok(Some(path))
    }
}

fn write_file(dir: &Path, path: &Path, contents: &str) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    std::fs::write(path, contents).map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(doi: &str, message: &str) -> ErrorRecord {
        ErrorRecord {
            target_url: format!("https://mirror.test/{doi}"),
            identifier: doi.to_string(),
            message: message.to_string(),
            timestamp: Local::now(),
        }
    }

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_error_kind_splits_on_first_colon() {
        assert_eq!(error_kind("file write failed: /tmp/x: denied"), "file write failed");
        assert_eq!(error_kind("no artifact URL found on page"), "no artifact URL found on page");
        assert_eq!(error_kind(":leading"), "");
    }

    #[test]
    fn test_groups_sorted_by_count_then_name() {
        let mut log = ErrorLog::new();
        log.push(record("10.1/a", "empty download"));
        log.push(record("10.1/b", "page request failed: HTTP 500 (retried 3 times)"));
        log.push(record("10.1/c", "page request failed: HTTP 403 (blocked) (retried 3 times)"));
        log.push(record("10.1/d", "invalid artifact format"));

        let groups = log.groups();
        let kinds: Vec<&str> = groups.iter().map(|g| g.kind.as_str()).collect();
        assert_eq!(kinds, ["page request failed", "empty download", "invalid artifact format"]);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].examples, ["10.1/b", "10.1/c"]);
    }

    #[test]
    fn test_groups_keep_three_examples() {
        let mut log = ErrorLog::new();
        for i in 0..5 {
            log.push(record(&format!("10.1/{i}"), "empty download"));
        }
        let groups = log.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 5);
        assert_eq!(groups[0].examples.len(), 3);
    }

    #[test]
    fn test_write_json_skips_empty_log() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("logs");
        let written = ErrorLog::new().write_json(&target, started()).unwrap();
        assert!(written.is_none());
        assert!(!target.exists());
    }

    #[test]
    fn test_write_json_document_shape() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("logs");
        let mut log = ErrorLog::new();
        log.push(record("10.1234/abc", "empty download"));

        let path = log.write_json(&target, started()).unwrap().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "download_errors_20240309_140507.json"
        );

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total_errors"], 1);
        assert!(value["summary"]["generated_at"].is_string());
        let entry = &value["errors"][0];
        assert_eq!(entry["url"], "https://mirror.test/10.1234/abc");
        assert_eq!(entry["doi"], "10.1234/abc");
        assert_eq!(entry["error"], "empty download");
        assert!(entry["timestamp"].as_str().unwrap().starts_with("20"));
    }

    #[test]
    fn test_write_retry_list_format() {
        let dir = TempDir::new().unwrap();
        let mut log = ErrorLog::new();
        log.push(record("10.1/a", "empty download"));
        log.push(record("10.1/b", "invalid artifact format"));

        let path = log.write_retry_list(dir.path(), started()).unwrap().unwrap();
        assert!(path.ends_with("retry_dois_20240309_140507.txt"));
        let body = std::fs::read_to_string(path).unwrap();
        let dois: Vec<&str> = body.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(dois, ["10.1/a", "10.1/b"]);
        assert!(body.contains("# count: 2"));
        assert!(body.starts_with("# DOIs that failed to download\n# generated: "));
        assert!(body.ends_with("10.1/b\n"));
    }
}
