//! Mailing list database operations

use chrono::Utc;
use rusqlite::{Result as SqliteResult, Row, types::Type};
use uuid::Uuid;

use super::super::{Database, row_datetime};
use crate::models::Subscription;

impl Database {
    fn row_to_subscription(row: &Row) -> SqliteResult<Subscription> {
        let key: String = row.get(3)?;
        Ok(Subscription {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row_datetime(row, 2)?,
            unsubscribe_key: Uuid::parse_str(&key)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        })
    }

    /// Add an email to the mailing list with a fresh unsubscribe key
    pub fn create_subscription(&self, email: &str) -> SqliteResult<Subscription> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let key = Uuid::new_v4();

        conn.execute(
            "INSERT INTO subscriptions (email, created_at, unsubscribe_key) VALUES (?1, ?2, ?3)",
            rusqlite::params![email, now.to_rfc3339(), key.to_string()],
        )?;

        Ok(Subscription {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            created_at: now,
            unsubscribe_key: key,
        })
    }

    pub fn subscription_exists(&self, email: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_subscription_by_key(&self, key: &Uuid) -> SqliteResult<Option<Subscription>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, created_at, unsubscribe_key FROM subscriptions WHERE unsubscribe_key = ?1",
        )?;
        let subscription = stmt
            .query_row([key.to_string()], |row| Self::row_to_subscription(row))
            .ok();
        Ok(subscription)
    }

    /// All subscriptions, oldest first
    pub fn list_subscriptions(&self) -> SqliteResult<Vec<Subscription>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, created_at, unsubscribe_key FROM subscriptions ORDER BY created_at, id",
        )?;
        let subscriptions = stmt
            .query_map([], |row| Self::row_to_subscription(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(subscriptions)
    }

    pub fn count_subscriptions(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
    }

    pub fn delete_subscription(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM subscriptions WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    /// Unsubscribe by key, returning the removed email if the key was valid
    pub fn unsubscribe(&self, key: &Uuid) -> SqliteResult<Option<String>> {
        match self.get_subscription_by_key(key)? {
            Some(subscription) => {
                self.delete_subscription(subscription.id)?;
                Ok(Some(subscription.email))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let db = Database::in_memory().unwrap();
        let subscription = db.create_subscription("tester@example.com").unwrap();
        assert!(db.subscription_exists("tester@example.com").unwrap());

        let email = db.unsubscribe(&subscription.unsubscribe_key).unwrap();
        assert_eq!(email.as_deref(), Some("tester@example.com"));
        assert_eq!(db.count_subscriptions().unwrap(), 0);

        // Second use of the same link is a no-op
        assert!(db.unsubscribe(&subscription.unsubscribe_key).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_subscription("tester@example.com").unwrap();
        let err = db.create_subscription("tester@example.com").unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_keys_are_unique_per_subscription() {
        let db = Database::in_memory().unwrap();
        let a = db.create_subscription("a@example.com").unwrap();
        let b = db.create_subscription("b@example.com").unwrap();
        assert_ne!(a.unsubscribe_key, b.unsubscribe_key);

        let listed = db.list_subscriptions().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].email, "a@example.com");
    }
}
