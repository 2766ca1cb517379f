//! Structural content scoring
//!
//! Three independent heuristics are computed over a parsed document. Each one
//! is accumulated in tenths and capped at ten tenths, so the reported scores
//! are exact multiples of 0.1 and never exceed 1.0.

use crate::storage::CrawlContext;
use chrono::Utc;
use scraper::{Html, Selector};

/// Scores fetched documents for quality, link density and importance
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentAnalyzer;

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Runs all three heuristics and packs them into a context
    ///
    /// The content type is left as "general"; the caller knows the URL and
    /// fills in a better guess.
    pub fn analyze(&self, document: &Html) -> CrawlContext {
        CrawlContext {
            content_quality: self.quality(document),
            link_density: self.link_density(document),
            importance: self.importance(document),
            last_modified: Some(Utc::now()),
            ..CrawlContext::default()
        }
    }

    /// Quality score in [0, 1]
    ///
    /// | Signal | Score |
    /// |---|---|
    /// | body text > 500 chars | +0.3 |
    /// | body text > 2000 chars | +0.2 |
    /// | any h1/h2/h3 | +0.2 |
    /// | more than 3 paragraphs | +0.2 |
    /// | meta description | +0.1 |
    pub fn quality(&self, document: &Html) -> f64 {
        let mut tenths = 0u32;

        let text_length = body_text(document).trim().chars().count();
        if text_length > 500 {
            tenths += 3;
        }
        if text_length > 2000 {
            tenths += 2;
        }

        if count(document, "h1, h2, h3") > 0 {
            tenths += 2;
        }

        if count(document, "p") > 3 {
            tenths += 2;
        }

        if count(document, "meta[name='description']") > 0 {
            tenths += 1;
        }

        from_tenths(tenths)
    }

    /// Share of body text that sits inside anchors, in [0, 1]
    pub fn link_density(&self, document: &Html) -> f64 {
        let text_length = body_text(document).chars().count();
        if text_length == 0 {
            return 0.0;
        }

        let link_text_length = select_text(document, "a").chars().count();

        (link_text_length as f64 / text_length as f64).min(1.0)
    }

    /// Importance score in [0, 1], starting from 0.5
    pub fn importance(&self, document: &Html) -> f64 {
        let mut tenths = 5u32;

        let title_length = select_text(document, "title").chars().count();
        if title_length > 10 && title_length < 70 {
            tenths += 1;
        }

        if count(document, "article") > 0 {
            tenths += 2;
        }

        // Breadcrumbs usually mean the page sits deeper in a content hierarchy
        if count(document, "nav, .breadcrumb") > 0 {
            tenths += 1;
        }

        if count(document, "[class*='share'], [class*='social']") > 0 {
            tenths += 1;
        }

        from_tenths(tenths)
    }
}

fn from_tenths(tenths: u32) -> f64 {
    tenths.min(10) as f64 / 10.0
}

fn count(document: &Html, css: &str) -> usize {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).count(),
        Err(_) => 0,
    }
}

fn select_text(document: &Html, css: &str) -> String {
    match Selector::parse(css) {
        Ok(selector) => document
            .select(&selector)
            .flat_map(|element| element.text())
            .collect(),
        Err(_) => String::new(),
    }
}

fn body_text(document: &Html) -> String {
    select_text(document, "body")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_full_quality_score_is_exactly_one() {
        let paragraph = "x".repeat(500);
        let html = format!(
            r#"<html><head><meta name="description" content="desc"></head>
            <body><h1>Heading</h1>{}</body></html>"#,
            (0..5)
                .map(|_| format!("<p>{}</p>", paragraph))
                .collect::<String>()
        );

        let score = ContentAnalyzer::new().quality(&doc(&html));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_empty_document_scores() {
        let analyzer = ContentAnalyzer::new();
        let document = doc("<html><body></body></html>");

        assert_eq!(analyzer.quality(&document), 0.0);
        assert_eq!(analyzer.link_density(&document), 0.0);
        assert_eq!(analyzer.importance(&document), 0.5);
    }

    #[test]
    fn test_quality_medium_text_only() {
        let html = format!("<html><body><div>{}</div></body></html>", "y".repeat(800));
        assert_eq!(ContentAnalyzer::new().quality(&doc(&html)), 0.3);
    }

    #[test]
    fn test_quality_needs_more_than_three_paragraphs() {
        let three = "<html><body><p>a</p><p>b</p><p>c</p></body></html>";
        let four = "<html><body><p>a</p><p>b</p><p>c</p><p>d</p></body></html>";

        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.quality(&doc(three)), 0.0);
        assert_eq!(analyzer.quality(&doc(four)), 0.2);
    }

    #[test]
    fn test_link_density() {
        let html = "<html><body>abcdef<a href=\"/x\">ghij</a></body></html>";
        let density = ContentAnalyzer::new().link_density(&doc(html));
        assert!((density - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_link_density_all_links() {
        let html = "<html><body><a href=\"/x\">only links</a></body></html>";
        assert_eq!(ContentAnalyzer::new().link_density(&doc(html)), 1.0);
    }

    #[test]
    fn test_importance_all_signals_capped() {
        let html = r#"<html><head><title>A reasonable page title</title></head>
            <body>
                <nav class="breadcrumb">Home</nav>
                <article>Body</article>
                <div class="social-share">Share</div>
            </body></html>"#;

        assert_eq!(ContentAnalyzer::new().importance(&doc(html)), 1.0);
    }

    #[test]
    fn test_importance_title_bounds() {
        let analyzer = ContentAnalyzer::new();

        let short = "<html><head><title>Too short</title></head><body></body></html>";
        assert_eq!(analyzer.importance(&doc(short)), 0.5);

        let long = format!(
            "<html><head><title>{}</title></head><body></body></html>",
            "t".repeat(70)
        );
        assert_eq!(analyzer.importance(&doc(&long)), 0.5);

        let good = "<html><head><title>Just the right size</title></head><body></body></html>";
        assert_eq!(analyzer.importance(&doc(good)), 0.6);
    }

    #[test]
    fn test_analyze_combines_scores() {
        let html = r#"<html><head><title>Research notes archive</title></head>
            <body><article><h2>Notes</h2><a href="/a">link</a> text</article></body></html>"#;

        let context = ContentAnalyzer::new().analyze(&doc(html));
        assert_eq!(context.content_quality, 0.2);
        assert_eq!(context.importance, 0.8);
        assert!(context.link_density > 0.0 && context.link_density < 1.0);
        assert_eq!(context.content_type, "general");
        assert!(context.last_modified.is_some());
    }
}
