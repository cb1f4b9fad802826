//! Reload source that rebuilds the merged feed page.
//!
//! The merged page is itself a cache entry; this source is its reload
//! capability. Every refresh refetches all configured channels, parses
//! them, and renders the page. A channel that fails to download or parse
//! is logged and skipped so one dead origin cannot take the page down.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::Client;
use std::io;
use tracing::warn;

use crate::cache::{ReloadSource, SourceData};
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::feed::{FeedChannel, parser};
use crate::http_retry::{RetryConfig, fetch_with_retry};
use crate::{metrics, render};

pub struct MergedPageSource {
    client: Client,
    site_title: String,
    channels: Vec<ChannelConfig>,
}

impl MergedPageSource {
    pub fn new(client: Client, site_title: impl Into<String>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            client,
            site_title: site_title.into(),
            channels,
        }
    }
}

#[async_trait]
impl ReloadSource for MergedPageSource {
    async fn fetch(&self) -> io::Result<SourceData> {
        let fetches = self
            .channels
            .iter()
            .map(|channel| async move { (channel, fetch_channel(&self.client, channel).await) });

        let mut feeds = Vec::new();
        for (channel, result) in join_all(fetches).await {
            match result {
                Ok(feed) => feeds.push((channel.clone(), feed)),
                Err(err) => {
                    metrics::record_origin_error();
                    warn!("skipping channel {}: {}", channel.codename, err);
                }
            }
        }

        let html = render::feed_page(&self.site_title, &feeds);
        Ok(SourceData::Buffer(Bytes::from(html)))
    }
}

/// Download and parse one channel.
async fn fetch_channel(client: &Client, channel: &ChannelConfig) -> Result<FeedChannel> {
    let response = fetch_with_retry(client, &channel.url, &RetryConfig::default()).await?;
    let body = response.text().await?;
    parser::parse_rss(&body)
}
