use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use crate::domain::feed::numbers_feed;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml";

#[derive(Debug, Clone, Copy)]
pub struct FeedState {
    pub length: usize,
}

/// GET /{any} - Regenerate the numbers feed
pub async fn serve_feed(State(state): State<FeedState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, RSS_CONTENT_TYPE)],
        numbers_feed(state.length, Utc::now()),
    )
}
