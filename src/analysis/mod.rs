//! Page analysis heuristics
//!
//! Everything that turns a fetched document into crawl decisions lives here:
//! - Structural scoring of a page (quality, link density, importance)
//! - Ranking of the page's outbound links
//! - Exact-duplicate detection over content fingerprints

mod content;
mod dedup;
mod priority;

pub use content::ContentAnalyzer;
pub use dedup::{fingerprint, DuplicateDetector};
pub use priority::{LinkPrioritizer, BASE_PRIORITY};
