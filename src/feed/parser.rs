//! Lenient RSS 2.0 pull parser.
//!
//! Real-world feeds are messy: missing fields, CDATA bodies, vendor
//! extensions. The parser takes what it recognizes (channel and item
//! `title`/`link`/`description`, item `pubDate`) and skips everything else.
//! Only malformed XML is an error.

use chrono::DateTime;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::{FeedChannel, FeedItem};
use crate::error::{Result, RiptideError};

#[derive(Default)]
struct PendingItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

impl PendingItem {
    fn build(self) -> FeedItem {
        FeedItem {
            title: self.title,
            link: self.link,
            description: self.description,
            published: DateTime::parse_from_rfc2822(self.pub_date.trim()).ok(),
        }
    }
}

/// Parse an RSS 2.0 document into a [`FeedChannel`].
pub fn parse_rss(xml: &str) -> Result<FeedChannel> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut channel = FeedChannel::default();
    let mut item: Option<PendingItem> = None;
    // Open-element stack; field text is only captured when its direct
    // parent is <channel> or <item>, so e.g. <image><title> stays out of
    // the channel title.
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|err| RiptideError::FeedParse(err.to_string()))?
        {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name == "item" && item.is_none() {
                    item = Some(PendingItem::default());
                }
                stack.push(name);
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some("item") {
                    if let Some(pending) = item.take() {
                        channel.items.push(pending.build());
                    }
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| RiptideError::FeedParse(err.to_string()))?;
                capture(&stack, &mut channel, &mut item, &text);
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                capture(&stack, &mut channel, &mut item, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(channel)
}

/// Append `text` to whichever field the current element position names.
fn capture(
    stack: &[String],
    channel: &mut FeedChannel,
    item: &mut Option<PendingItem>,
    text: &str,
) {
    let Some(field) = stack.last() else { return };
    let parent = stack
        .len()
        .checked_sub(2)
        .and_then(|i| stack.get(i))
        .map(String::as_str);

    match (parent, field.as_str()) {
        (Some("item"), name) => {
            if let Some(pending) = item.as_mut() {
                match name {
                    "title" => pending.title.push_str(text),
                    "link" => pending.link.push_str(text),
                    "description" => pending.description.push_str(text),
                    "pubDate" => pending.pub_date.push_str(text),
                    _ => {}
                }
            }
        }
        (Some("channel"), "title") => channel.title.push_str(text),
        (Some("channel"), "link") => channel.link.push_str(text),
        (Some("channel"), "description") => channel.description.push_str(text),
        _ => {}
    }
}
