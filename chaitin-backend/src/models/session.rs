use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login session, referenced by the `sessionid` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Session lifetime: 52 weeks
pub const SESSION_AGE_SECONDS: i64 = 60 * 60 * 24 * 7 * 52;
