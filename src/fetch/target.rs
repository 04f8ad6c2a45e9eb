//! Maps identifiers to their mirror page URL.

use url::Url;

use crate::parser::Identifier;

/// Error building a [`TargetResolver`] or a target URL.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Base URL does not parse or cannot carry a path.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Identifier has a `.` or `..` part, which URL normalisation would
    /// collapse into a different path.
    #[error("identifier '{identifier}' contains a dot segment and cannot be sent as a path")]
    DotSegment {
        /// The rejected identifier.
        identifier: String,
    },
}

/// One unit of work: an identifier and the page to start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// The DOI being fetched.
    pub identifier: Identifier,
    /// Mirror page for the DOI.
    pub target_url: Url,
}

/// Appends identifiers to a configured mirror base URL.
///
/// Each `/`-separated part of the DOI becomes one path segment, so characters
/// such as `?`, `#` and `%` in a DOI suffix are percent-encoded rather than
/// starting a query or fragment. Identifiers with a `.` or `..` part are
/// rejected: no URL can carry them as literal segments.
///
/// ```
/// use doihive_core::fetch::TargetResolver;
/// use doihive_core::parser::Identifier;
///
/// let resolver = TargetResolver::new("https://sci-hub.se").unwrap();
/// let task = resolver.resolve(&Identifier::parse("10.1234/abc.5").unwrap()).unwrap();
/// assert_eq!(task.target_url.as_str(), "https://sci-hub.se/10.1234/abc.5");
/// ```
#[derive(Debug, Clone)]
pub struct TargetResolver {
    base: Url,
}

impl TargetResolver {
    /// Creates a resolver for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidBaseUrl`] when the URL does not parse, is
    /// not http(s), or cannot have path segments.
    pub fn new(base_url: &str) -> Result<Self, TargetError> {
        let invalid = |reason: String| TargetError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }
        Ok(Self { base })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds the task for `identifier`. Pure; no network access.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::DotSegment`] for identifiers such as
    /// `10.1234/a/../b`, and [`TargetError::InvalidBaseUrl`] if the base
    /// cannot take path segments, which [`TargetResolver::new`] already rules
    /// out.
    pub fn resolve(&self, identifier: &Identifier) -> Result<FetchTask, TargetError> {
        if identifier
            .as_str()
            .split('/')
            .any(|segment| matches!(segment, "." | ".."))
        {
            return Err(TargetError::DotSegment {
                identifier: identifier.to_string(),
            });
        }

        let mut target_url = self.base.clone();
        target_url.set_query(None);
        target_url.set_fragment(None);
        target_url
            .path_segments_mut()
            .map_err(|()| TargetError::InvalidBaseUrl {
                url: self.base.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(identifier.as_str().split('/'));

        Ok(FetchTask {
            identifier: identifier.clone(),
            target_url,
        })
    }
}
