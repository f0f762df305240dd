use chrono::{DateTime, Utc};
use serde::Serialize;

/// Log entry for one broadcast message
#[derive(Debug, Clone, Serialize)]
pub struct EmailRecord {
    pub id: i64,
    pub subscription_id: Option<i64>,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
}
