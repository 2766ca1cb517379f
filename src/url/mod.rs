//! URL handling module
//!
//! This module provides URL normalization, the crawlability filter applied to
//! discovered links, and the coarse content-type guess made from a URL path.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// File extensions that mark a URL as a static asset rather than a page
const EXCLUDED_EXTENSIONS: &[&str] = &[
    "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "pdf", "zip", "exe", "dmg",
];

/// Returns true if a resolved URL is worth putting in the frontier
///
/// The URL must be absolute http(s) with a host, and must not look like a
/// static asset (stylesheets, scripts, images, archives, binaries).
///
/// # Examples
///
/// ```
/// use smart_crawler::url::is_crawlable_url;
///
/// assert!(is_crawlable_url("https://example.com/blog/post"));
/// assert!(!is_crawlable_url("https://example.com/logo.png"));
/// assert!(!is_crawlable_url("mailto:team@example.com"));
/// ```
pub fn is_crawlable_url(raw: &str) -> bool {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return false,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    if url.host_str().map_or(true, str::is_empty) {
        return false;
    }

    !is_static_asset(url.path())
}

/// Checks the extension of the last path segment only
fn is_static_asset(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((_, extension)) => EXCLUDED_EXTENSIONS
            .iter()
            .any(|excluded| extension.eq_ignore_ascii_case(excluded)),
        None => false,
    }
}

/// Guesses what kind of content a URL points at from its path
///
/// | Path contains | Guess |
/// |---|---|
/// | `/blog/`, `/article/` | `article` |
/// | `/news/` | `news` |
/// | `/doc`, `/help/` | `documentation` |
/// | anything else | `general` |
pub fn guess_content_type(url: &str) -> &'static str {
    let lower = url.to_lowercase();

    if lower.contains("/blog/") || lower.contains("/article/") {
        "article"
    } else if lower.contains("/news/") {
        "news"
    } else if lower.contains("/doc") || lower.contains("/help/") {
        "documentation"
    } else {
        "general"
    }
}
