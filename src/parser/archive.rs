//! Archive-level scanning: identifier extraction and DOI coverage checks.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::doi::Identifier;
use super::error::ParseError;
use super::wos::{WosRecord, parse_records, read_export_text};

const EXPORT_EXTENSION: &str = "txt";

/// A record whose DOI is missing or malformed.
#[derive(Debug, Clone)]
pub struct MissingRecord {
    /// Position of the record within its file.
    pub index: usize,
    /// Raw record text.
    pub content: String,
}

/// Per-file DOI statistics.
#[derive(Debug, Clone)]
pub struct FileStats {
    /// File name without directory.
    pub file_name: String,
    /// Number of records in the file.
    pub total_records: usize,
    /// Records carrying a valid DOI.
    pub valid_dois: usize,
    /// Records without a valid DOI.
    pub missing: Vec<MissingRecord>,
}

/// DOI coverage over a whole archive directory.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    /// Export files scanned.
    pub total_files: usize,
    /// Records across all files.
    pub total_records: usize,
    /// Records with a valid DOI, counting repeats.
    pub total_dois: usize,
    /// Distinct valid DOIs.
    pub unique_dois: usize,
    /// Records without a valid DOI.
    pub missing_dois: usize,
    /// Per-file breakdown, in file name order.
    pub files: Vec<FileStats>,
    /// DOIs seen more than once, with per-file occurrence counts.
    pub duplicates: BTreeMap<String, BTreeMap<String, usize>>,
}

impl ArchiveReport {
    /// Percentage of records carrying a valid DOI (0 for an empty archive).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.total_dois as f64 / self.total_records as f64 * 100.0
        }
    }
}

/// Lists the `.txt` exports of `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`ParseError::ArchiveNotFound`] when `dir` does not exist,
/// [`ParseError::NoExportFiles`] when it holds no exports, and
/// [`ParseError::Io`] when it cannot be listed.
pub fn list_export_files(dir: &Path) -> Result<Vec<PathBuf>, ParseError> {
    if !dir.is_dir() {
        return Err(ParseError::archive_not_found(dir));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ParseError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ParseError::io(dir, e))?.path();
        let is_export = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION));
        if is_export {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ParseError::no_export_files(dir));
    }
    files.sort();
    Ok(files)
}

/// Extracts the distinct valid DOIs of every export in `dir`.
///
/// Order is first occurrence across files in name order, then record order.
///
/// # Errors
///
/// Same as [`list_export_files`], plus [`ParseError::Io`] for an unreadable
/// export.
#[instrument(fields(dir = %dir.display()))]
pub fn extract_identifiers(dir: &Path) -> Result<Vec<Identifier>, ParseError> {
    let mut seen = HashSet::new();
    let mut identifiers = Vec::new();

    for path in list_export_files(dir)? {
        let text = read_export_text(&path)?;
        for record in parse_records(&text) {
            let Some(identifier) = record_identifier(&record) else {
                continue;
            };
            if seen.insert(identifier.clone()) {
                identifiers.push(identifier);
            }
        }
    }

    info!(count = identifiers.len(), "extracted identifiers");
    Ok(identifiers)
}

/// Scans every export in `dir` and reports DOI coverage.
///
/// Files that cannot be read are logged and left out of the report.
///
/// # Errors
///
/// Same as [`list_export_files`].
#[instrument(fields(dir = %dir.display()))]
pub fn check_archive(dir: &Path) -> Result<ArchiveReport, ParseError> {
    let files = list_export_files(dir)?;
    let mut report = ArchiveReport {
        total_files: files.len(),
        ..ArchiveReport::default()
    };
    let mut occurrences: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for path in &files {
        let text = match read_export_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable export");
                continue;
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let stats = analyze_records(&file_name, &parse_records(&text), &mut occurrences);
        debug!(
            file = %stats.file_name,
            records = stats.total_records,
            valid = stats.valid_dois,
            "analyzed export"
        );
        report.total_records += stats.total_records;
        report.total_dois += stats.valid_dois;
        report.missing_dois += stats.missing.len();
        report.files.push(stats);
    }

    report.unique_dois = occurrences.len();
    report.duplicates = occurrences
        .into_iter()
        .filter(|(_, per_file)| per_file.values().sum::<usize>() > 1)
        .collect();
    Ok(report)
}

fn analyze_records(
    file_name: &str,
    records: &[WosRecord],
    occurrences: &mut BTreeMap<String, BTreeMap<String, usize>>,
) -> FileStats {
    let mut stats = FileStats {
        file_name: file_name.to_string(),
        total_records: records.len(),
        valid_dois: 0,
        missing: Vec::new(),
    };

    for record in records {
        match record_identifier(record) {
            Some(identifier) => {
                stats.valid_dois += 1;
                *occurrences
                    .entry(identifier.as_str().to_string())
                    .or_default()
                    .entry(file_name.to_string())
                    .or_default() += 1;
            }
            None => stats.missing.push(MissingRecord {
                index: record.index,
                content: record.content(),
            }),
        }
    }
    stats
}

fn record_identifier(record: &WosRecord) -> Option<Identifier> {
    Identifier::parse(&record.doi()?).ok()
}
