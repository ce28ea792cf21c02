use chrono::{DateTime, Duration, Utc};
use std::fmt::Write;

use super::model::{permalink, SyntheticFeedItem};

pub const DEFAULT_FEED_LENGTH: usize = 20;

/// Longest feed whose last term still fits in a `u64`
pub const MAX_FEED_LENGTH: usize = 90;

/// First `n` terms of the Fibonacci-like sequence seeded at (1, 2),
/// paired with their index.
pub fn numbers(n: usize) -> impl Iterator<Item = (usize, u64)> {
    let mut pair = (1u64, 2u64);
    (0..n).map(move |i| {
        let value = pair.0;
        pair = (pair.1, pair.0.saturating_add(pair.1));
        (i, value)
    })
}

/// Items in generation order. Item `i` is published `n - i` minutes before
/// `now`, so publish dates strictly increase with the index.
pub fn feed_items(n: usize, now: DateTime<Utc>) -> Vec<SyntheticFeedItem> {
    let oldest = now - Duration::minutes(n as i64);

    numbers(n)
        .map(|(index, value)| SyntheticFeedItem {
            index,
            value,
            permalink: permalink(value),
            published: oldest + Duration::minutes(index as i64),
        })
        .collect()
}

pub fn feed_title(n: usize) -> String {
    format!("{} numbers", n)
}

/// RSS 2.0 document listing the first `n` numbers, newest item first
pub fn numbers_feed(n: usize, now: DateTime<Utc>) -> String {
    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    doc.push_str("<rss version=\"2.0\">\n");
    doc.push_str("    <channel>\n");
    let _ = writeln!(doc, "        <title>{}</title>", feed_title(n));

    for item in feed_items(n, now).iter().rev() {
        doc.push_str("        <item>\n");
        let _ = writeln!(doc, "            <title>{}</title>", item.value);
        let _ = writeln!(
            doc,
            "            <guid isPermaLink=\"true\">{}</guid>",
            item.permalink
        );
        let _ = writeln!(doc, "            <link>{}</link>", item.permalink);
        let _ = writeln!(
            doc,
            "            <pubDate>{}</pubDate>",
            item.published.to_rfc2822()
        );
        doc.push_str("        </item>\n");
    }

    doc.push_str("    </channel>\n");
    doc.push_str("</rss>\n");
    doc
}
