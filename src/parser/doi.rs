//! DOI validation and the [`Identifier`] newtype.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::error::ParseError;

/// Full-string DOI shape: `10.` + 4-9 digit registrant + `/` + non-blank suffix.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Returns true when `value` is a syntactically valid DOI.
///
/// ```
/// use doihive_core::parser::is_valid_doi;
///
/// assert!(is_valid_doi("10.1234/abc.5"));
/// assert!(!is_valid_doi("10.12/x"));
/// assert!(!is_valid_doi("abc/def"));
/// ```
#[must_use]
pub fn is_valid_doi(value: &str) -> bool {
    DOI_PATTERN.is_match(value)
}

/// A validated DOI.
///
/// Immutable once constructed; the only way in is [`Identifier::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `value` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDoi`] when `value` is not a DOI.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        if is_valid_doi(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ParseError::invalid_doi(value))
        }
    }

    /// The DOI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe stem: `/` and `:` become `_`.
    ///
    /// Distinct DOIs can only collide if they differ solely in those two
    /// characters at the same positions.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0.replace(['/', ':'], "_")
    }

    /// Output file name for an artifact with the given extension.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.file_stem())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
