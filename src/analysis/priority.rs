//! Link ranking
//!
//! A discovered link starts at [`BASE_PRIORITY`] and is nudged up or down by a
//! fixed rule set over its anchor text, `rel` and `class` attributes, plus a
//! bonus from the importance of the page it was found on.
//!
//! | Rule | Effect |
//! |---|---|
//! | anchor has a high-value keyword | +20 (first match only) |
//! | anchor has a low-value keyword | -15 (first match only) |
//! | `rel` contains `nofollow` | -30 |
//! | `class` has a nav/menu marker | -10 |
//! | `class` has a content/article marker | +15 |
//! | referring page importance | +round(importance * 20) |

use crate::storage::{clamp_priority, CrawlContext};
use crate::url::guess_content_type;

/// Priority every link starts from
pub const BASE_PRIORITY: i64 = 50;

const HIGH_VALUE_KEYWORDS: &[&str] = &[
    "article",
    "news",
    "blog",
    "content",
    "post",
    "story",
    "research",
    "documentation",
];

const LOW_VALUE_KEYWORDS: &[&str] = &[
    "login", "register", "contact", "about", "terms", "privacy", "sitemap",
];

/// Turns analyzer output and per-link attributes into frontier priorities
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkPrioritizer;

impl LinkPrioritizer {
    pub fn new() -> Self {
        Self
    }

    /// Computes a link's priority, always within [1, 100]
    pub fn priority_of(
        &self,
        anchor_text: &str,
        rel: Option<&str>,
        class: Option<&str>,
        page_context: &CrawlContext,
    ) -> u32 {
        let mut priority = BASE_PRIORITY;

        let anchor = anchor_text.trim().to_lowercase();

        if HIGH_VALUE_KEYWORDS.iter().any(|kw| anchor.contains(kw)) {
            priority += 20;
        }

        if LOW_VALUE_KEYWORDS.iter().any(|kw| anchor.contains(kw)) {
            priority -= 15;
        }

        if rel.is_some_and(|rel| rel.contains("nofollow")) {
            priority -= 30;
        }

        if let Some(class) = class {
            if class.contains("nav") || class.contains("menu") {
                priority -= 10;
            }
            if class.contains("content") || class.contains("article") {
                priority += 15;
            }
        }

        priority += (page_context.importance * 20.0).round() as i64;

        clamp_priority(priority)
    }

    /// Builds the context a child link carries into the frontier
    ///
    /// Importance is the link's own priority scaled to [0, 1]; link density is
    /// inherited from the referring page.
    pub fn child_context(&self, url: &str, priority: u32, parent: &CrawlContext) -> CrawlContext {
        CrawlContext {
            content_type: guess_content_type(url).to_string(),
            importance: priority as f64 / 100.0,
            link_density: parent.link_density,
            ..CrawlContext::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(importance: f64) -> CrawlContext {
        CrawlContext {
            importance,
            ..CrawlContext::default()
        }
    }

    #[test]
    fn test_base_priority() {
        let p = LinkPrioritizer::new();
        assert_eq!(p.priority_of("Click here", None, None, &page(0.0)), 50);
    }

    #[test]
    fn test_high_value_anchor() {
        let p = LinkPrioritizer::new();
        assert_eq!(p.priority_of("Read our Article", None, None, &page(0.0)), 70);
    }

    #[test]
    fn test_keywords_do_not_stack_within_category() {
        let p = LinkPrioritizer::new();
        assert_eq!(
            p.priority_of("news blog article post", None, None, &page(0.0)),
            70
        );
        assert_eq!(
            p.priority_of("login register contact", None, None, &page(0.0)),
            35
        );
    }

    #[test]
    fn test_both_categories_apply() {
        let p = LinkPrioritizer::new();
        // +20 -15
        assert_eq!(p.priority_of("About this blog", None, None, &page(0.0)), 55);
    }

    #[test]
    fn test_nofollow_and_classes() {
        let p = LinkPrioritizer::new();
        assert_eq!(
            p.priority_of("x", Some("external nofollow"), None, &page(0.0)),
            20
        );
        assert_eq!(p.priority_of("x", None, Some("navbar-item"), &page(0.0)), 40);
        assert_eq!(p.priority_of("x", None, Some("article-link"), &page(0.0)), 65);
        // Independent checks: both markers present
        assert_eq!(
            p.priority_of("x", None, Some("menu content"), &page(0.0)),
            55
        );
    }

    #[test]
    fn test_importance_bonus_is_rounded() {
        let p = LinkPrioritizer::new();
        assert_eq!(p.priority_of("x", None, None, &page(1.0)), 70);
        assert_eq!(p.priority_of("x", None, None, &page(0.5)), 60);
        // 0.73 * 20 = 14.6
        assert_eq!(p.priority_of("x", None, None, &page(0.73)), 65);
    }

    #[test]
    fn test_stacked_negatives_clamp_to_one() {
        let p = LinkPrioritizer::new();
        let priority = p.priority_of(
            "Login / Contact / Privacy",
            Some("nofollow noopener"),
            Some("nav menu"),
            &page(0.0),
        );
        // 50 - 15 - 30 - 10
        assert_eq!(priority, 1);

        let negative_importance = page(-10.0);
        let priority = p.priority_of("Sitemap", None, None, &negative_importance);
        assert_eq!(priority, 1);
    }

    #[test]
    fn test_stacked_positives_clamp_to_hundred() {
        let p = LinkPrioritizer::new();
        let priority = p.priority_of(
            "Research article",
            None,
            Some("content article"),
            &page(1.0),
        );
        assert_eq!(priority, 100);
    }

    #[test]
    fn test_child_context() {
        let p = LinkPrioritizer::new();
        let parent = CrawlContext {
            link_density: 0.3,
            importance: 0.9,
            ..CrawlContext::default()
        };

        let child = p.child_context("https://example.com/blog/hello", 85, &parent);
        assert_eq!(child.content_type, "article");
        assert_eq!(child.importance, 0.85);
        assert_eq!(child.link_density, 0.3);
        assert_eq!(child.content_quality, 0.0);
    }
}
