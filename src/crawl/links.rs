// src/crawl/links.rs
// =============================================================================
// Pulls raw href values out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser), so broken markup is
//   repaired rather than rejected
//
// The extractor does NOT resolve or canonicalize anything. It hands back the
// hrefs as written; the driver resolves them against the page URL.
// =============================================================================

use crate::error::{CrawlError, Result};
use scraper::{Html, Selector};

/// Anything that can list the links on a page
pub trait LinkExtractor: Send + Sync {
    // Returns the raw href strings found in `html`
    //
    // `page_url` is only used for error reporting and by extractors that
    // need to know where the markup came from.
    fn extract_links(&self, html: &str, page_url: &str) -> Result<Vec<String>>;
}

// Extracts <a href="..."> values with scraper
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    selector: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Result<Self> {
        let selector = Selector::parse("a[href]").map_err(|e| CrawlError::Extraction {
            url: String::new(),
            message: format!("invalid link selector: {:?}", e),
        })?;
        Ok(Self { selector })
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, _page_url: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(html);

        let links = document
            .select(&self.selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| is_navigable(href))
            .map(str::to_string)
            .collect();

        Ok(links)
    }
}

// Skips hrefs that can never lead to another page
//
// - "#section" only moves within the current page
// - mailto:, tel:, javascript:, data: aren't web pages at all
fn is_navigable(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    !["mailto:", "tel:", "javascript:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
