//! Browser identity sent with every mirror request.
//!
//! The mirror rejects clients that do not look like a desktop browser, so the
//! shared HTTP client carries this header set as its defaults.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// Desktop Chrome User-Agent string.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const BROWSER_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Builds the default header set for the shared client.
///
/// `Accept-Encoding` is left to reqwest so that it only advertises encodings
/// it can decode.
#[must_use]
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_identify_as_chrome() {
        let headers = browser_headers();
        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(ua.contains("Chrome/120"), "unexpected UA: {ua}");
        assert!(ua.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_browser_headers_include_fetch_metadata() {
        let headers = browser_headers();
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
        assert_eq!(headers.get("sec-fetch-dest").unwrap(), "document");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=0");
    }

    #[test]
    fn test_browser_headers_leave_accept_encoding_to_client() {
        let headers = browser_headers();
        assert!(headers.get(reqwest::header::ACCEPT_ENCODING).is_none());
    }
}
