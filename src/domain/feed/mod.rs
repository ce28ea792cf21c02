pub mod fibonacci;
pub mod model;

pub use fibonacci::{
    feed_items, feed_title, numbers, numbers_feed, DEFAULT_FEED_LENGTH, MAX_FEED_LENGTH,
};
pub use model::SyntheticFeedItem;
