use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Spout (source type) for plain RSS feeds
pub const RSS_SPOUT: &str = "spouts\\rss\\feed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated { username: String },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// An item as listed by `GET /items`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_bool")]
    pub unread: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub starred: bool,
    #[serde(default)]
    pub title: String,
    /// Remaining fields (content, source, datetime, ...) kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Response of `POST /source`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_id")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

// The application has emitted ids and flags as numbers, numeric strings
// and booleans depending on version and database driver.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => Ok(b),
        Loose::Int(i) => Ok(i != 0),
        Loose::Text(s) => match s.as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(de::Error::custom(format!("not a boolean: {}", other))),
        },
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Int(i) => Ok(i),
        Loose::Text(s) => s.parse().map_err(de::Error::custom),
        Loose::Bool(b) => Err(de::Error::custom(format!("not an id: {}", b))),
    }
}

fn lenient_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    lenient_id(deserializer).map(Some)
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {:?} (unread: {}, starred: {})",
            self.id, self.title, self.unread, self.starred
        )
    }
}
