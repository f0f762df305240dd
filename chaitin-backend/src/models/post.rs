use chrono::{DateTime, Utc};
use serde::Serialize;

/// Blog entry with a markdown body
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Option<i64>,
}
