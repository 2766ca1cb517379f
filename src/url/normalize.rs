use crate::UrlError;
use url::Url;

/// Click-tracking parameters that never change what a page serves
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Canonicalizes a URL so equal pages share one frontier key
///
/// Only http(s) URLs with a host are accepted. The result has a lower-case
/// host, no dot segments or empty path segments, no fragment, and a query with
/// tracking parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`) removed and the
/// rest sorted by key. A trailing slash is kept, since servers may treat
/// `/a/` and `/a` as different resources.
///
/// # Examples
///
/// ```
/// use smart_crawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/a/../page?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // The url crate lower-cases domains during parsing
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let path = collapse_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if params.is_empty() {
        url.set_query(None);
    } else {
        // Stable, so repeated keys keep their relative order
        params.sort_by(|a, b| a.0.cmp(&b.0));
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    Ok(url)
}

/// Drops empty segments left by repeated slashes
///
/// Dot segments are already resolved by the parser.
fn collapse_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut collapsed = format!("/{}", segments.join("/"));
    if path.ends_with('/') {
        collapsed.push('/');
    }
    collapsed
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
