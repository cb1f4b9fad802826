use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// One subscribed feed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Short identifier used in URLs (`/feeds/{codename}`).
    pub codename: String,
    /// Display title on the merged page.
    pub title: String,
    /// Where the RSS document lives.
    pub url: String,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Heading of the merged feed page.
    pub site_title: String,
    /// Directory static assets are served from.
    pub static_root: PathBuf,
    /// Freshness window for cached static assets, in seconds.
    pub cache_ttl_secs: u64,
    /// Refresh interval for feed content, in seconds.
    pub feed_refresh_secs: u64,
    /// Subscribed channels, from FEEDS_FILE.
    pub channels: Vec<ChannelConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    /// In DEV mode missing vars get sensible defaults; in PROD mode PORT is
    /// required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let site_title = env::var("SITE_TITLE").unwrap_or_else(|_| "Riptide".to_string());

        let static_root =
            PathBuf::from(env::var("STATIC_ROOT").unwrap_or_else(|_| "static".to_string()));

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let feed_refresh_secs = env::var("FEED_REFRESH_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let channels = match env::var("FEEDS_FILE") {
            Ok(path) => load_channels(&path)?,
            Err(_) => Vec::new(),
        };

        Ok(Config {
            port,
            is_dev,
            site_title,
            static_root,
            cache_ttl_secs,
            feed_refresh_secs,
            channels,
        })
    }
}

/// Read and validate the channel list from a JSON file.
///
/// The file is a JSON array of `{codename, title, url}` objects. Codenames
/// become URL path segments, so they are restricted to
/// `[a-z0-9_-]`; URLs must parse.
fn load_channels(path: &str) -> Result<Vec<ChannelConfig>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read FEEDS_FILE {path}: {err}"))?;
    let channels: Vec<ChannelConfig> = serde_json::from_str(&raw)
        .map_err(|err| format!("cannot parse FEEDS_FILE {path}: {err}"))?;

    for channel in &channels {
        if channel.codename.is_empty()
            || !channel
                .codename
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(format!("invalid channel codename: {:?}", channel.codename).into());
        }
        url::Url::parse(&channel.url)
            .map_err(|err| format!("invalid url for channel {}: {err}", channel.codename))?;
    }
    Ok(channels)
}
