//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow, with the attributes the prioritizer reads
//! - Page title

use crate::url::{is_crawlable_url, normalize_url};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// An outbound link found on a page
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLink {
    /// Absolute, normalized URL
    pub url: String,
    /// Trimmed anchor text
    pub anchor_text: String,
    pub rel: Option<String>,
    pub class: Option<String>,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Crawlable links found on the page
    pub links: Vec<DiscoveredLink>,
}

/// Parses a document and extracts its title and crawlable links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Static assets (stylesheets, scripts, images, archives, binaries)
///
/// `rel="nofollow"` links are kept; the prioritizer penalizes them instead.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use smart_crawler::crawler::parse_document;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_document(&Html::parse_document(html), &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/page");
/// ```
pub fn parse_document(document: &Html, base_url: &Url) -> ParsedPage {
    ParsedPage {
        title: extract_title(document),
        links: extract_links(document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all crawlable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<DiscoveredLink> {
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            links.push(DiscoveredLink {
                url,
                anchor_text: anchor_text(&element),
                rel: element.value().attr("rel").map(str::to_string),
                class: element.value().attr("class").map(str::to_string),
            });
        }
    }

    links
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Resolves a link href to a canonical absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs or static assets after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if !is_crawlable_url(absolute_url.as_str()) {
        return None;
    }

    normalize_url(absolute_url.as_str())
        .ok()
        .map(|url| url.to_string())
}
