//! RSS feed model and aggregation.

pub mod parser;
pub mod source;

use chrono::{DateTime, FixedOffset};

/// One entry of a feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// `pubDate`, when present and parseable (RFC 2822).
    pub published: Option<DateTime<FixedOffset>>,
}

/// A parsed RSS 2.0 channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

/// An item attributed to the channel it came from.
#[derive(Clone, Debug)]
pub struct MergedItem {
    /// Display title of the owning channel.
    pub channel: String,
    pub item: FeedItem,
}

/// Interleave the items of all channels, newest first. Items without a
/// parseable date sort last, keeping their channel order.
pub fn merge_items(feeds: &[(String, FeedChannel)]) -> Vec<MergedItem> {
    let mut merged: Vec<MergedItem> = feeds
        .iter()
        .flat_map(|(channel, feed)| {
            feed.items.iter().map(|item| MergedItem {
                channel: channel.clone(),
                item: item.clone(),
            })
        })
        .collect();
    merged.sort_by(|a, b| b.item.published.cmp(&a.item.published));
    merged
}
