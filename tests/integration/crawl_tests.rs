//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against a SQLite frontier on disk.

use smart_crawler::config::{
    Config, CrawlerConfig, OutputConfig, RateLimitConfig, UserAgentConfig,
};
use smart_crawler::crawler::{Coordinator, CrawlOptions, SkipReason};
use smart_crawler::state::FrontierStatus;
use smart_crawler::storage::lock_store;
use smart_crawler::CrawlStats;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration that stops once the frontier is idle
fn create_test_config(db_path: &str, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 3,
            max_depth,
            refill_interval_ms: 10,
            idle_backoff_ms: 10,
            max_attempts: 2,
            idle_polls_before_stop: 5,
            ..CrawlerConfig::default()
        },
        rate_limit: RateLimitConfig {
            requests_per_second: 500,
            burst: 500,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            request_timeout_secs: 5,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            persist_links: true,
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Runs a crawl against `server` and returns the coordinator for inspection
async fn run_crawl(server: &MockServer, dir: &TempDir, max_depth: u32) -> (Coordinator, CrawlStats) {
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(db_path.to_str().unwrap(), max_depth);
    let options = CrawlOptions::from_config(format!("{}/", server.uri()), &config);

    let coordinator = Coordinator::from_config(config, true).unwrap();
    let stats = tokio::time::timeout(
        Duration::from_secs(20),
        coordinator.crawl(options, CancellationToken::new()),
    )
    .await
    .expect("crawl did not stop on an idle frontier")
    .unwrap();

    (coordinator, stats)
}

#[tokio::test]
async fn test_child_priorities_follow_anchor_text() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r#"<html><body>
                <a href="/article-page">Read our Article</a>
                <a href="/contact">Contact Us</a>
            </body></html>"#,
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (coordinator, stats) = run_crawl(&server, &dir, 0).await;

    assert_eq!(stats.pages_processed, 1);
    assert_eq!(stats.errors, 0);

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();

    let article = store
        .get_entry(&format!("{}/article-page", server.uri()))
        .unwrap()
        .expect("article link should be in the frontier");
    let contact = store
        .get_entry(&format!("{}/contact", server.uri()))
        .unwrap()
        .expect("contact link should be in the frontier");

    // Root importance is the 0.5 baseline: +10 for both children
    assert_eq!(article.entry.priority, 80);
    assert_eq!(contact.entry.priority, 45);
    assert_eq!(article.entry.depth, 1);
    assert_eq!(contact.entry.depth, 1);
    assert_eq!(
        article.entry.parent_url.as_deref(),
        Some(format!("{}/", server.uri()).as_str())
    );

    // Both are beyond max depth 0, so neither was fetched
    assert_eq!(article.status, FrontierStatus::DepthExceeded);
    assert_eq!(contact.status, FrontierStatus::DepthExceeded);

    assert_eq!(store.count_links().unwrap(), 2);
}

#[tokio::test]
async fn test_depth_limit_stops_expansion() {
    let server = MockServer::start().await;
    mount(&server, "/", html(r#"<html><body><a href="/a">A</a></body></html>"#)).await;
    mount(&server, "/a", html(r#"<html><body><a href="/b">B</a></body></html>"#)).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<html><body>too deep</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (coordinator, stats) = run_crawl(&server, &dir, 1).await;

    assert_eq!(stats.pages_processed, 2);

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();
    let deep = store
        .get_entry(&format!("{}/b", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(deep.entry.depth, 2);
    assert_eq!(deep.status, FrontierStatus::DepthExceeded);
    assert_eq!(store.count_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_irrelevant_content_type_is_skipped() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<html><body><a href="/photo">Photo</a></body></html>"#),
    )
    .await;
    mount(
        &server,
        "/photo",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (coordinator, stats) = run_crawl(&server, &dir, 1).await;

    assert_eq!(stats.pages_processed, 1);
    assert_eq!(stats.pages_skipped, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(
        stats.skipped_by_reason.get(&SkipReason::IrrelevantContentType),
        Some(&1)
    );

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();
    assert!(!store
        .is_already_crawled(&format!("{}/photo", server.uri()))
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_content_is_skipped() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r#"<html><body>
                <a href="/copy-one">One</a>
                <a href="/copy-two">Two</a>
            </body></html>"#,
        ),
    )
    .await;
    let same = "<html><body><p>Identical body</p></body></html>";
    mount(&server, "/copy-one", html(same)).await;
    mount(&server, "/copy-two", html(same)).await;

    let dir = TempDir::new().unwrap();
    let (coordinator, stats) = run_crawl(&server, &dir, 1).await;

    assert_eq!(stats.pages_processed, 2);
    assert_eq!(stats.pages_skipped, 1);
    assert_eq!(
        stats.skipped_by_reason.get(&SkipReason::DuplicateContent),
        Some(&1)
    );

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();
    assert_eq!(store.count_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_server_errors_are_retried_then_failed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<html><body><a href="/broken">Broken</a></body></html>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (coordinator, stats) = run_crawl(&server, &dir, 1).await;

    assert_eq!(stats.pages_processed, 1);
    assert_eq!(stats.errors, 2);

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();
    let broken = store
        .get_entry(&format!("{}/broken", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(broken.status, FrontierStatus::Failed);
    assert_eq!(broken.attempts, 2);
}

#[tokio::test]
async fn test_link_graph_targets_are_backfilled() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<html><body><a href="/next" rel="nofollow">Next</a></body></html>"#),
    )
    .await;
    mount(&server, "/next", html("<html><body>leaf</body></html>")).await;

    let dir = TempDir::new().unwrap();
    let (coordinator, _stats) = run_crawl(&server, &dir, 1).await;

    let store = coordinator.store();
    let store = lock_store(&store).unwrap();

    let root = store
        .get_page_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    let leaf = store
        .get_page_by_url(&format!("{}/next", server.uri()))
        .unwrap()
        .unwrap();

    let edges = store.get_outgoing_links(root.id.unwrap()).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, leaf.id);
    assert_eq!(edges[0].rel.as_deref(), Some("nofollow"));
}

#[tokio::test]
async fn test_cancellation_returns_stats() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html("<html><body>slow</body></html>").set_delay(Duration::from_millis(400)),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let mut config = create_test_config(db_path.to_str().unwrap(), 3);
    // Run until cancelled
    config.crawler.idle_polls_before_stop = 0;
    let options = CrawlOptions::from_config(format!("{}/", server.uri()), &config);

    let coordinator = Coordinator::from_config(config, true).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(10), coordinator.crawl(options, cancel))
        .await
        .expect("crawl did not stop after cancellation")
        .unwrap();

    assert!(stats.duration >= Duration::from_millis(150));
    // The slow fetch already under way is drained, not abandoned
    assert!(stats.pages_processed <= 1);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_rerun_does_not_refetch_completed_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>only once</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(db_path.to_str().unwrap(), 1);
    let options = CrawlOptions::from_config(format!("{}/", server.uri()), &config);

    let first = Coordinator::from_config(config.clone(), true).unwrap();
    let stats = first
        .crawl(options.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.pages_processed, 1);
    drop(first);

    // Same database, not fresh: the completed seed is not resurrected
    let second = Coordinator::from_config(config, false).unwrap();
    let stats = second.crawl(options, CancellationToken::new()).await.unwrap();
    assert_eq!(stats.pages_processed, 0);
}

#[tokio::test]
async fn test_resume_with_deeper_limit_expands_past_old_boundary() {
    let server = MockServer::start().await;
    mount(&server, "/", html(r#"<html><body><a href="/a">A</a></body></html>"#)).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<html><body>one level down</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let shallow = create_test_config(db_path.to_str().unwrap(), 0);
    let options = CrawlOptions::from_config(format!("{}/", server.uri()), &shallow);

    let first = Coordinator::from_config(shallow, true).unwrap();
    let stats = first
        .crawl(options.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.pages_processed, 1);
    {
        let store = first.store();
        let store = lock_store(&store).unwrap();
        let child = store
            .get_entry(&format!("{}/a", server.uri()))
            .unwrap()
            .unwrap();
        assert_eq!(child.status, FrontierStatus::DepthExceeded);
    }
    drop(first);

    // Same frontier, one level deeper: the cut-off child is crawled now
    let deeper = create_test_config(db_path.to_str().unwrap(), 1);
    let options = CrawlOptions {
        max_depth: 1,
        ..options
    };
    let second = Coordinator::from_config(deeper, false).unwrap();
    let stats = second.crawl(options, CancellationToken::new()).await.unwrap();
    assert_eq!(stats.pages_processed, 1);

    let store = second.store();
    let store = lock_store(&store).unwrap();
    let child = store
        .get_entry(&format!("{}/a", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(child.status, FrontierStatus::Completed);
    assert_eq!(store.count_pages().unwrap(), 2);
}
