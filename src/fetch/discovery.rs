//! Artifact link discovery on the mirror page.
//!
//! The page is queried through [`HtmlPage`], which only offers "first element
//! matching a selector", "attribute of an element" and the raw markup.
//! Discovery strategies run as an ordered chain and the first candidate wins:
//!
//! 1. [`DownloadLinkSelector`]: `href` of the link inside `div.download`
//! 2. [`DownloadLinkPattern`]: the same shape matched in raw markup
//! 3. [`EmbeddedObjectSelector`]: `data` of the embedded `<object>`
//! 4. [`EmbeddedObjectPattern`]: the same attribute matched in raw markup
//!
//! The raw-markup strategies catch pages the HTML parser restructures in ways
//! the selectors no longer match. Candidates are resolved against the page URL.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

#[allow(clippy::expect_used)]
static DOWNLOAD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["']download["'][^>]*>.*?<a[^>]+href\s*=\s*["']([^"']+)["']"#,
    )
    .expect("download link regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static OBJECT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<object[^>]+data\s*=\s*["']([^"']+)["']"#)
        .expect("object data regex is valid") // Static pattern, safe to panic
});

/// Parsed page with a deliberately narrow query surface.
pub struct HtmlPage<'a> {
    markup: &'a str,
    document: Html,
}

/// Element handle returned by [`HtmlPage::find_first`].
pub struct PageElement<'p> {
    element: ElementRef<'p>,
}

impl PageElement<'_> {
    /// Attribute value, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}

impl<'a> HtmlPage<'a> {
    /// Parses `markup`. Parsing never fails; broken markup yields a best-effort tree.
    #[must_use]
    pub fn parse(markup: &'a str) -> Self {
        Self {
            markup,
            document: Html::parse_document(markup),
        }
    }

    /// First element matching the CSS `selector`, in document order.
    ///
    /// An unparsable selector matches nothing.
    #[must_use]
    pub fn find_first(&self, selector: &str) -> Option<PageElement<'_>> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(e) => {
                debug!(selector, error = ?e, "invalid selector");
                return None;
            }
        };
        self.document
            .select(&selector)
            .next()
            .map(|element| PageElement { element })
    }

    /// The markup as received.
    #[must_use]
    pub fn raw_markup(&self) -> &'a str {
        self.markup
    }
}

/// One way of finding the artifact link on a page.
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Unresolved link candidate, if this strategy finds one.
    fn candidate(&self, page: &HtmlPage<'_>) -> Option<String>;
}

/// `div.download a[href]` via the parsed tree.
#[derive(Debug, Default)]
pub struct DownloadLinkSelector;

impl DiscoveryStrategy for DownloadLinkSelector {
    fn name(&self) -> &'static str {
        "download-link"
    }

    fn candidate(&self, page: &HtmlPage<'_>) -> Option<String> {
        let link = page.find_first("div.download a[href]")?;
        non_empty(link.attr("href")?)
    }
}

/// `div.download` link matched directly in the markup.
#[derive(Debug, Default)]
pub struct DownloadLinkPattern;

impl DiscoveryStrategy for DownloadLinkPattern {
    fn name(&self) -> &'static str {
        "download-link-pattern"
    }

    fn candidate(&self, page: &HtmlPage<'_>) -> Option<String> {
        let captures = DOWNLOAD_LINK_RE.captures(page.raw_markup())?;
        non_empty(captures.get(1)?.as_str())
    }
}

/// `data` of the embedded viewer object, preferring `type="application/pdf"`.
#[derive(Debug, Default)]
pub struct EmbeddedObjectSelector;

impl DiscoveryStrategy for EmbeddedObjectSelector {
    fn name(&self) -> &'static str {
        "embedded-object"
    }

    fn candidate(&self, page: &HtmlPage<'_>) -> Option<String> {
        let object = page
            .find_first(r#"object[type="application/pdf"][data]"#)
            .or_else(|| page.find_first("object[data]"))?;
        strip_fragment(object.attr("data")?)
    }
}

/// Embedded object `data` matched directly in the markup.
#[derive(Debug, Default)]
pub struct EmbeddedObjectPattern;

impl DiscoveryStrategy for EmbeddedObjectPattern {
    fn name(&self) -> &'static str {
        "embedded-object-pattern"
    }

    fn candidate(&self, page: &HtmlPage<'_>) -> Option<String> {
        let captures = OBJECT_DATA_RE.captures(page.raw_markup())?;
        strip_fragment(captures.get(1)?.as_str())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Drops a `#...` viewer fragment such as `#view=FitH`.
fn strip_fragment(value: &str) -> Option<String> {
    let without = value.split_once('#').map_or(value, |(head, _)| head);
    non_empty(without)
}

/// Artifact link found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute artifact URL.
    pub url: Url,
    /// Name of the strategy that found it.
    pub strategy: &'static str,
}

/// Ordered chain of discovery strategies.
pub struct DiscoveryChain {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl Default for DiscoveryChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(DownloadLinkSelector),
            Box::new(DownloadLinkPattern),
            Box::new(EmbeddedObjectSelector),
            Box::new(EmbeddedObjectPattern),
        ])
    }
}

impl std::fmt::Debug for DiscoveryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl DiscoveryChain {
    /// Chain running `strategies` in the given order.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// Runs the strategies over `markup` and resolves the first usable
    /// candidate against `page_url`.
    ///
    /// A candidate that does not resolve to a URL is passed over.
    #[must_use]
    pub fn discover(&self, markup: &str, page_url: &Url) -> Option<DiscoveredLink> {
        let page = HtmlPage::parse(markup);
        for strategy in &self.strategies {
            let Some(candidate) = strategy.candidate(&page) else {
                trace!(strategy = strategy.name(), "no candidate");
                continue;
            };
            match page_url.join(&candidate) {
                Ok(url) => {
                    debug!(strategy = strategy.name(), url = %url, "artifact link found");
                    return Some(DiscoveredLink {
                        url,
                        strategy: strategy.name(),
                    });
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), candidate = %candidate, error = %e, "unresolvable candidate");
                }
            }
        }
        None
    }
}

/// Best-effort reason a page carries no artifact link.
#[must_use]
pub fn page_hint(markup: &str) -> Option<&'static str> {
    let lower = markup.to_ascii_lowercase();
    if lower.contains("captcha") {
        Some("captcha challenge")
    } else if lower.contains("not available") || lower.contains("article not found") {
        Some("article not available on mirror")
    } else {
        None
    }
}
