use chrono::{DateTime, Utc};
use serde::Serialize;

/// Hosted image, served at `/images/{slug}.{extension}`
#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub id: i64,
    pub slug: String,
    #[serde(skip_serializing)]
    pub data: Vec<u8>,
    pub extension: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<i64>,
}

impl Image {
    pub fn path(&self) -> String {
        format!("/images/{}.{}", self.slug, self.extension)
    }
}
