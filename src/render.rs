//! HTML rendering for the merged feed page.

use crate::config::ChannelConfig;
use crate::feed::{FeedChannel, merge_items};

/// Replace the characters reserved in HTML with entities.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the merged view of every fetched channel, newest items first.
pub fn feed_page(site_title: &str, feeds: &[(ChannelConfig, FeedChannel)]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(site_title)));
    html.push_str("<link rel=\"stylesheet\" href=\"/static/style.css\">\n");
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(site_title)));

    if feeds.is_empty() {
        html.push_str("<p>No channels configured.</p>\n");
    } else {
        html.push_str("<nav><ul>\n");
        for (config, channel) in feeds {
            let label = if channel.title.is_empty() {
                &config.title
            } else {
                &channel.title
            };
            html.push_str(&format!(
                "<li><a href=\"/feeds/{}\">{}</a></li>\n",
                escape_html(&config.codename),
                escape_html(label),
            ));
        }
        html.push_str("</ul></nav>\n");

        let titled: Vec<(String, FeedChannel)> = feeds
            .iter()
            .map(|(config, channel)| (config.title.clone(), channel.clone()))
            .collect();
        html.push_str("<ul class=\"items\">\n");
        for merged in merge_items(&titled) {
            html.push_str("<li>");
            if merged.item.link.is_empty() {
                html.push_str(&format!(
                    "<span class=\"title\">{}</span>",
                    escape_html(&merged.item.title)
                ));
            } else {
                html.push_str(&format!(
                    "<a class=\"title\" href=\"{}\">{}</a>",
                    escape_html(&merged.item.link),
                    escape_html(&merged.item.title),
                ));
            }
            html.push_str(&format!(
                " <span class=\"channel\">{}</span>",
                escape_html(&merged.channel)
            ));
            if let Some(published) = merged.item.published {
                html.push_str(&format!(
                    " <span class=\"date\">{}</span>",
                    published.format("%Y-%m-%d %H:%M")
                ));
            }
            if !merged.item.description.is_empty() {
                html.push_str(&format!(
                    "<p>{}</p>",
                    escape_html(&merged.item.description)
                ));
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedItem;

    fn config(codename: &str, title: &str) -> ChannelConfig {
        ChannelConfig {
            codename: codename.to_string(),
            title: title.to_string(),
            url: "https://example.com/feed.rss".to_string(),
        }
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn empty_config_renders_placeholder() {
        let html = feed_page("My Feeds", &[]);
        assert!(html.contains("<h1>My Feeds</h1>"));
        assert!(html.contains("No channels configured."));
    }

    #[test]
    fn items_and_channel_links_rendered_escaped() {
        let feeds = vec![(
            config("news", "News & Views"),
            FeedChannel {
                title: "News & Views".to_string(),
                link: "https://example.com".to_string(),
                description: String::new(),
                items: vec![FeedItem {
                    title: "1 < 2".to_string(),
                    link: "https://example.com/post".to_string(),
                    description: "a & b".to_string(),
                    published: None,
                }],
            },
        )];

        let html = feed_page("T", &feeds);
        assert!(html.contains("href=\"/feeds/news\""));
        assert!(html.contains("News &amp; Views"));
        assert!(html.contains("1 &lt; 2"));
        assert!(html.contains("<p>a &amp; b</p>"));
        assert!(!html.contains("1 < 2"));
    }
}
