use chrono::{DateTime, Utc};
use serde::Serialize;

/// Site member. Password hash and avatar bytes never reach templates.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub about: String,
    pub is_public: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing)]
    pub avatar_data: Vec<u8>,
    /// Empty when the user has no avatar
    pub avatar_ext: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn has_avatar(&self) -> bool {
        !self.avatar_data.is_empty() && !self.avatar_ext.is_empty()
    }
}

/// Editable profile fields
#[derive(Debug, Clone)]
pub struct UserProfileUpdate {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub about: String,
    pub is_public: bool,
}
