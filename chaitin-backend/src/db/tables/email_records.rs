//! Broadcast log database operations

use chrono::{DateTime, Utc};
use rusqlite::{Result as SqliteResult, Row};

use super::super::{Database, row_opt_datetime};
use crate::models::EmailRecord;

impl Database {
    fn row_to_email_record(row: &Row) -> SqliteResult<EmailRecord> {
        Ok(EmailRecord {
            id: row.get(0)?,
            subscription_id: row.get(1)?,
            email: row.get(2)?,
            subject: row.get(3)?,
            body: row.get(4)?,
            sent_at: row_opt_datetime(row, 5)?,
        })
    }

    /// Log a message that is about to go out; `sent_at` stays empty until delivery
    pub fn create_email_record(
        &self,
        subscription_id: Option<i64>,
        email: &str,
        subject: &str,
        body: &str,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO email_records (subscription_id, email, subject, body, sent_at) VALUES (?1, ?2, ?3, ?4, NULL)",
            rusqlite::params![subscription_id, email, subject, body],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Stamp a batch of records as sent
    pub fn mark_email_records_sent(&self, ids: &[i64], sent_at: DateTime<Utc>) -> SqliteResult<usize> {
        let conn = self.conn.lock().unwrap();
        let sent_at = sent_at.to_rfc3339();
        let mut stmt = conn.prepare("UPDATE email_records SET sent_at = ?1 WHERE id = ?2")?;
        let mut updated = 0;
        for id in ids {
            updated += stmt.execute(rusqlite::params![&sent_at, id])?;
        }
        Ok(updated)
    }

    /// Records, most recently sent first (unsent last)
    pub fn list_email_records(&self) -> SqliteResult<Vec<EmailRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, subscription_id, email, subject, body, sent_at FROM email_records
             ORDER BY sent_at IS NULL, sent_at DESC, id DESC",
        )?;
        let records = stmt
            .query_map([], |row| Self::row_to_email_record(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count_email_records(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM email_records", [], |row| row.get(0))
    }
}
