use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry of the synthetic numbers feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntheticFeedItem {
    /// Position in the generated sequence, starting at 0
    pub index: usize,
    pub value: u64,
    /// Derived from `value`, so equal values always share an identifier
    pub permalink: String,
    pub published: DateTime<Utc>,
}

pub fn permalink(value: u64) -> String {
    format!("https://en.wikipedia.org/wiki/{}", value)
}
