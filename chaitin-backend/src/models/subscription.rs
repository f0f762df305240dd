use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Mailing-list entry
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub unsubscribe_key: Uuid,
}

impl Subscription {
    pub fn unsubscribe_path(&self) -> String {
        unsubscribe_path(&self.unsubscribe_key)
    }
}

pub fn unsubscribe_path(key: &Uuid) -> String {
    format!("/unsubscribe/{}/", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_serializes_as_hyphenated_string() {
        let key = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let subscription = Subscription {
            id: 1,
            email: "tester@example.com".to_string(),
            created_at: Utc::now(),
            unsubscribe_key: key,
        };
        let json = serde_json::to_value(&subscription).unwrap();
        assert_eq!(json["unsubscribe_key"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(subscription.unsubscribe_path(), "/unsubscribe/67e55044-10b1-426f-9247-bb680e5fe0c8/");
    }
}
