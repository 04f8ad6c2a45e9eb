//! Identifier extraction from Web of Science exports.
//!
//! Reads every `.txt` export in an archive directory, splits it into tagged
//! records and pulls the DOI out of each record's `DI` field. Only DOIs that
//! match `^10\.\d{4,9}/\S+$` become [`Identifier`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use doihive_core::parser::{check_archive, extract_identifiers};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = check_archive(Path::new("archive"))?;
//! println!("coverage: {:.2}%", report.coverage());
//! let identifiers = extract_identifiers(Path::new("archive"))?;
//! println!("{} unique DOIs", identifiers.len());
//! # Ok(())
//! # }
//! ```

mod archive;
mod doi;
mod error;
mod wos;

pub use archive::{
    ArchiveReport, FileStats, MissingRecord, check_archive, extract_identifiers,
    list_export_files,
};
pub use doi::{Identifier, is_valid_doi};
pub use error::ParseError;
pub use wos::{WosRecord, parse_records, read_export_text};
