use chrono::{DateTime, Utc};
use serde::Serialize;

/// RSVP for a workshop, unique per (workshop, email)
#[derive(Debug, Clone, Serialize)]
pub struct Attendance {
    pub id: i64,
    pub workshop_id: Option<i64>,
    pub email: String,
    pub rsvp: bool,
    pub created_at: DateTime<Utc>,
}
