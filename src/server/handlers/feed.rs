//! Feed-facing handlers: the merged page and raw per-channel passthrough.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::serve_entry;
use crate::cache::{CacheEntry, HttpSource};
use crate::error::{Result, RiptideError};
use crate::server::state::{AppState, FEED_PAGE_KEY};

/// Serve the merged feed page.
pub async fn serve_home(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    // Seeded in AppState::new, removable only via an explicit cache clear.
    let entry = state
        .cache
        .lookup(FEED_PAGE_KEY)
        .ok_or(RiptideError::NotFound)?;
    serve_entry(&entry, "home", &headers).await
}

/// Serve one channel's raw RSS document, cached with the feed refresh TTL.
pub async fn serve_channel(
    Path(codename): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    // Unknown codenames are a routing 404; the cache only ever sees keys
    // with a configured origin behind them.
    let channel = state
        .config
        .channels
        .iter()
        .find(|channel| channel.codename == codename)
        .ok_or(RiptideError::NotFound)?
        .clone();

    info!("serving feed {} from {}", channel.codename, channel.url);

    let key = format!("feed:{}", channel.codename);
    let ttl = Duration::from_secs(state.config.feed_refresh_secs);
    let entry = state.cache.get_with(&key, || {
        CacheEntry::with_source(
            &key,
            ttl,
            Some("application/rss+xml; charset=utf-8".to_string()),
            Arc::new(HttpSource::new(state.http_client.clone(), channel.url.clone())),
        )
    });

    serve_entry(&entry, "feed", &headers).await
}
