//! Web of Science tagged plain-text exports.
//!
//! An export is a sequence of records. Each line starts with a two-letter
//! field tag (`PT`, `AU`, `TI`, `DI`, ...) or with spaces for a continuation
//! line; a record ends with a line holding only `ER`, and the file ends with
//! `EF`.

use std::path::Path;

use tracing::{debug, trace};

use super::error::ParseError;

const RECORD_END_TAG: &str = "ER";
const FILE_END_TAG: &str = "EF";
const DOI_TAG: &str = "DI";

/// One record of a tagged export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WosRecord {
    /// Zero-based position of the record within its file.
    pub index: usize,
    /// Raw lines of the record, without the closing `ER`.
    pub lines: Vec<String>,
}

impl WosRecord {
    /// Value of the `DI` field, if present.
    ///
    /// The value is the whitespace-separated fields after the tag joined by a
    /// single space; it is not validated here.
    #[must_use]
    pub fn doi(&self) -> Option<String> {
        self.lines.iter().find_map(|line| {
            let rest = line.strip_prefix(DOI_TAG)?;
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let value = rest.split_whitespace().collect::<Vec<_>>().join(" ");
            (!value.is_empty()).then_some(value)
        })
    }

    /// The record text as it appeared in the export.
    #[must_use]
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}

/// Reads an export file into text.
///
/// A UTF-8 BOM is stripped; files that are not valid UTF-8 are decoded as
/// Latin-1. Line endings are normalised to `\n`.
///
/// # Errors
///
/// Returns [`ParseError::Io`] when the file cannot be read.
pub fn read_export_text(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path).map_err(|e| ParseError::io(path, e))?;
    Ok(decode_export_bytes(&bytes))
}

fn decode_export_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("export is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    };
    text.replace("\r\n", "\n")
}

/// Splits export text into records.
///
/// Blank trailing blocks and the lone `EF` end marker do not produce records.
#[must_use]
pub fn parse_records(text: &str) -> Vec<WosRecord> {
    let mut records = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.trim_end() == RECORD_END_TAG {
            push_record(&mut records, std::mem::take(&mut current));
        } else {
            current.push(line.to_string());
        }
    }
    push_record(&mut records, current);

    trace!(records = records.len(), "parsed export records");
    records
}

fn push_record(records: &mut Vec<WosRecord>, lines: Vec<String>) {
    let meaningful: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if meaningful.is_empty() || meaningful == [FILE_END_TAG] {
        return;
    }

    // Drop blank lines between records so `content()` starts at the first tag.
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(0);
    let index = records.len();
    records.push(WosRecord {
        index,
        lines: lines[start..].to_vec(),
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "FN Clarivate Analytics Web of Science\nVR 1.0\nPT J\nAU Smith, J\nTI A study of things\nDI 10.1234/abc.5\nER\n\nPT J\nAU Doe, A\nTI No identifier here\nER\n\nPT J\nTI Third\nDI 10.5555/xyz-9\nPY 2020\nER\n\nEF\n";

    #[test]
    fn test_parse_records_counts_records_and_skips_ef() {
        let records = parse_records(SAMPLE);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[2].index, 2);
    }

    #[test]
    fn test_record_doi_extracted_from_di_line() {
        let records = parse_records(SAMPLE);
        assert_eq!(records[0].doi().as_deref(), Some("10.1234/abc.5"));
        assert_eq!(records[1].doi(), None);
        assert_eq!(records[2].doi().as_deref(), Some("10.5555/xyz-9"));
    }

    #[test]
    fn test_record_doi_ignores_other_tags_starting_with_di() {
        let record = WosRecord {
            index: 0,
            lines: vec!["DIX something".to_string(), "DI 10.1234/real".to_string()],
        };
        assert_eq!(record.doi().as_deref(), Some("10.1234/real"));
    }

    #[test]
    fn test_record_doi_joins_fields_with_single_space() {
        let record = WosRecord {
            index: 0,
            lines: vec!["DI   10.1234/a   b".to_string()],
        };
        assert_eq!(record.doi().as_deref(), Some("10.1234/a b"));
    }

    #[test]
    fn test_record_content_starts_at_first_tag() {
        let records = parse_records(SAMPLE);
        assert!(records[1].content().starts_with("PT J"));
    }

    #[test]
    fn test_parse_records_trailing_record_without_er() {
        let records = parse_records("PT J\nDI 10.1234/tail");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doi().as_deref(), Some("10.1234/tail"));
    }

    #[test]
    fn test_parse_records_empty_text() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("\n\nEF\n").is_empty());
    }

    #[test]
    fn test_decode_export_bytes_strips_bom_and_crlf() {
        let text = decode_export_bytes(b"\xEF\xBB\xBFPT J\r\nDI 10.1234/x\r\nER\r\n");
        assert_eq!(text, "PT J\nDI 10.1234/x\nER\n");
    }

    #[test]
    fn test_decode_export_bytes_falls_back_to_latin1() {
        let text = decode_export_bytes(b"TI Caf\xE9\nDI 10.1234/x\n");
        assert!(text.starts_with("TI Caf\u{e9}"));
        assert!(text.contains("DI 10.1234/x"));
    }
}
