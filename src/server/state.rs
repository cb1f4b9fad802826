use crate::cache::{CacheEntry, ContentCache};
use crate::config::Config;
use crate::feed::source::MergedPageSource;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache key of the merged feed page.
pub const FEED_PAGE_KEY: &str = "page:feed";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared HTTP client for connection pooling
    pub http_client: Client,
    /// Every served byte flows through this cache
    pub cache: ContentCache,
    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Self {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let cache = ContentCache::new(Duration::from_secs(config.cache_ttl_secs));

        // Seed the merged page entry. Its first read triggers the first
        // round of feed downloads; afterwards the TTL drives refreshes.
        cache.put(CacheEntry::with_source(
            FEED_PAGE_KEY,
            Duration::from_secs(config.feed_refresh_secs),
            Some("text/html; charset=utf-8".to_string()),
            Arc::new(MergedPageSource::new(
                http_client.clone(),
                config.site_title.clone(),
                config.channels.clone(),
            )),
        ));

        Self {
            config: Arc::new(config),
            http_client,
            cache,
            started_at: Instant::now(),
        }
    }
}
