// src/canonical.rs
// =============================================================================
// URL canonicalization: turns any URL string into the identity we deduplicate
// on.
//
// A canonical URL is the absolute URL with its query string and fragment
// removed. Scheme, host, port and path are kept exactly as the `url` crate
// serializes them, which means:
// - hostnames are lower-cased (they are case-insensitive anyway)
// - path case is preserved (servers may treat /About and /about differently)
// - trailing slashes are preserved
//
// Stripping the query unconditionally merges pages like /list?page=2 into
// /list. That is a deliberate precision/recall tradeoff, not an accident.
// =============================================================================

use crate::error::{CrawlError, Result};
use serde::Serialize;
use std::fmt;
use url::Url;

/// The deduplication identity of a page
///
/// Two URLs are "the same page" iff their canonical forms are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hostname of the canonical URL, if it has one (mailto: etc. don't)
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }

    /// Only http(s) pages are crawlable
    pub fn is_web_page(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Canonicalizes a URL, optionally resolving it against a base first
//
// Parameters:
//   raw: the URL or href to canonicalize
//   base: the page the href was found on (for relative links), or None
//
// Returns: the canonical URL, or UnparsableUrl if `raw` is not a valid URL
//          (callers skip it, it is never fatal)
//
// Examples:
//   "https://Example.com/Docs?x=1#top"         -> "https://example.com/Docs"
//   "../about" with base "https://a.com/b/c"   -> "https://a.com/about"
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<CanonicalUrl> {
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };

    let url = parsed.map_err(|source| CrawlError::UnparsableUrl {
        url: raw.to_string(),
        source,
    })?;

    Ok(canonical_from_url(url))
}

/// Canonical form of an already-parsed URL (cannot fail)
pub fn canonical_from_url(mut url: Url) -> CanonicalUrl {
    url.set_query(None);
    url.set_fragment(None);
    CanonicalUrl(url.into())
}

/// True when both URLs live on the same host (scheme and port are ignored)
pub fn same_domain(a: &CanonicalUrl, b: &CanonicalUrl) -> bool {
    match (a.host(), b.host()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        canonicalize(raw, None).unwrap().to_string()
    }

    #[test]
    fn test_strips_query_and_fragment() {
        let plain = canon("https://example.com/shop/item");
        assert_eq!(canon("https://example.com/shop/item?color=red"), plain);
        assert_eq!(canon("https://example.com/shop/item#reviews"), plain);
        assert_eq!(canon("https://example.com/shop/item?a=1&b=2#x"), plain);
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "https://example.com",
            "https://Example.COM:8443/A/b/?q=1#f",
            "http://example.com/path/with%20space/",
            "https://example.com/a/./b/../c",
        ] {
            let once = canonicalize(raw, None).unwrap();
            let twice = canonicalize(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_preserves_path_case_and_trailing_slash() {
        assert_eq!(canon("https://EXAMPLE.com/About/"), "https://example.com/About/");
        assert_ne!(canon("https://example.com/docs"), canon("https://example.com/docs/"));
    }

    #[test]
    fn test_preserves_scheme_and_port() {
        assert_eq!(canon("http://example.com:8080/x?y"), "http://example.com:8080/x");
    }

    #[test]
    fn test_resolves_relative_against_base() {
        let base = Url::parse("https://example.com/blog/post-1?ref=home").unwrap();
        let link = canonicalize("../about?utm=1", Some(&base)).unwrap();
        assert_eq!(link.as_str(), "https://example.com/about");

        let fragment_only = canonicalize("#comments", Some(&base)).unwrap();
        assert_eq!(fragment_only.as_str(), "https://example.com/blog/post-1");
    }

    #[test]
    fn test_absolute_href_ignores_base() {
        let base = Url::parse("https://example.com/page").unwrap();
        let link = canonicalize("https://other.org/x#y", Some(&base)).unwrap();
        assert_eq!(link.as_str(), "https://other.org/x");
    }

    #[test]
    fn test_unparsable() {
        let err = canonicalize("not a url", None).unwrap_err();
        assert!(matches!(err, CrawlError::UnparsableUrl { .. }));
        assert!(canonicalize("http://", None).is_err());
    }

    #[test]
    fn test_same_domain_ignores_scheme_and_port() {
        let a = canonicalize("https://example.com/a", None).unwrap();
        let b = canonicalize("http://example.com:8080/b", None).unwrap();
        let c = canonicalize("https://blog.example.com/a", None).unwrap();
        assert!(same_domain(&a, &b));
        assert!(!same_domain(&a, &c));
    }

    #[test]
    fn test_is_web_page() {
        assert!(canonicalize("https://example.com/", None).unwrap().is_web_page());
        assert!(!canonicalize("ftp://example.com/file", None).unwrap().is_web_page());
    }

    #[test]
    fn test_same_domain_without_host() {
        let a = canonicalize("https://example.com/a", None).unwrap();
        let mail = canonicalize("mailto:someone@example.com", None).unwrap();
        assert!(!same_domain(&a, &mail));
    }
}
