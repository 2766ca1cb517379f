use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub workers: u32,

    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Capacity of the in-memory work channel
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,

    /// Interval between frontier refills (milliseconds)
    #[serde(rename = "refill-interval-ms")]
    pub refill_interval_ms: u64,

    /// Sleep after a refill that found nothing (milliseconds)
    #[serde(rename = "idle-backoff-ms")]
    pub idle_backoff_ms: u64,

    /// Fetch attempts before a frontier entry is marked failed
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Consecutive idle refills before the crawl stops on its own (0 = never)
    #[serde(rename = "idle-polls-before-stop")]
    pub idle_polls_before_stop: u32,

    /// Age after which another run may reclaim an `in_flight` entry (seconds)
    #[serde(rename = "in-flight-lease-secs")]
    pub in_flight_lease_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            max_depth: 3,
            channel_capacity: 1000,
            refill_interval_ms: 500,
            idle_backoff_ms: 1000,
            max_attempts: 3,
            idle_polls_before_stop: 0,
            in_flight_lease_secs: 600,
        }
    }
}

/// Shared token bucket configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained outbound fetch rate
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: u32,

    /// Bucket size
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 15,
            burst: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SmartCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Whether outbound links are stored as link edges
    #[serde(rename = "persist-links", default = "default_persist_links")]
    pub persist_links: bool,
}

fn default_persist_links() -> bool {
    true
}
