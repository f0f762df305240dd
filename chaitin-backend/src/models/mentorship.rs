use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Mentorship {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub mentor_id: i64,
    /// Joined from users for display
    pub mentor_username: String,
}
