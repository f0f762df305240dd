//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init)
//! - Schema creation and migrations
//!
//! All table operations are in the tables/ subdirectory.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Result as SqliteResult, Row, types::Type};
use std::path::Path;
use std::sync::Mutex;

/// Storage format for workshop schedule times (naive London wall-clock)
pub(crate) const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Main database wrapper, one connection shared behind a Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Fresh in-memory database, used by tests
    pub fn in_memory() -> SqliteResult<Self> {
        Self::new(":memory:")
    }

    /// Initialize all database tables and run migrations
    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Members
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                about TEXT NOT NULL DEFAULT '',
                is_public INTEGER NOT NULL DEFAULT 0,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                avatar_data BLOB NOT NULL DEFAULT x'',
                avatar_ext TEXT NOT NULL DEFAULT '',
                date_joined TEXT NOT NULL
            )",
            [],
        )?;

        // Login sessions (cookie token -> user)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Mailing list
        conn.execute(
            "CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL,
                unsubscribe_key TEXT UNIQUE NOT NULL
            )",
            [],
        )?;

        // Blog
        conn.execute(
            "CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                body TEXT NOT NULL,
                published_at TEXT,
                author_id INTEGER,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS workshops (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                body TEXT NOT NULL DEFAULT '',
                scheduled_at TEXT,
                location_name TEXT NOT NULL DEFAULT '',
                location_address TEXT NOT NULL DEFAULT '',
                location_url TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS attendances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workshop_id INTEGER,
                email TEXT NOT NULL,
                rsvp INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                UNIQUE(workshop_id, email),
                FOREIGN KEY (workshop_id) REFERENCES workshops(id) ON DELETE SET NULL
            )",
            [],
        )?;

        // Broadcast log
        conn.execute(
            "CREATE TABLE IF NOT EXISTS email_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subscription_id INTEGER,
                email TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                sent_at TEXT,
                FOREIGN KEY (subscription_id) REFERENCES subscriptions(id) ON DELETE SET NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS mentorships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                body TEXT NOT NULL,
                mentor_id INTEGER NOT NULL,
                FOREIGN KEY (mentor_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Image hosting
        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT UNIQUE NOT NULL,
                data BLOB NOT NULL,
                extension TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                uploaded_by INTEGER,
                FOREIGN KEY (uploaded_by) REFERENCES users(id) ON DELETE SET NULL
            )",
            [],
        )?;

        // Contact forms
        conn.execute(
            "CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submitter TEXT NOT NULL,
                email TEXT NOT NULL,
                links TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL,
                topic TEXT NOT NULL,
                audience TEXT NOT NULL DEFAULT '',
                outcome TEXT NOT NULL DEFAULT '',
                \"when\" TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS proposals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                topic TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT,
                topic TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comment TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                email TEXT,
                description TEXT NOT NULL,
                occurred_at TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_auth_sessions_user ON auth_sessions(user_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attendances_workshop ON attendances(workshop_id)",
            [],
        )?;

        // Migration: Add is_confirmed column to workshops if it doesn't exist
        let has_is_confirmed: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('workshops') WHERE name='is_confirmed'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|c| c > 0)
            .unwrap_or(false);

        if !has_is_confirmed {
            conn.execute(
                "ALTER TABLE workshops ADD COLUMN is_confirmed INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }

        Ok(())
    }
}

/// Read an RFC 3339 timestamp column
pub(crate) fn row_datetime(row: &Row, idx: usize) -> SqliteResult<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_datetime(idx, &value)
}

/// Read a nullable RFC 3339 timestamp column
pub(crate) fn row_opt_datetime(row: &Row, idx: usize) -> SqliteResult<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|v| parse_datetime(idx, &v)).transpose()
}

/// Read a nullable naive datetime column
pub(crate) fn row_opt_naive(row: &Row, idx: usize) -> SqliteResult<Option<NaiveDateTime>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            NaiveDateTime::parse_from_str(&v, NAIVE_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

fn parse_datetime(idx: usize, value: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// True when the error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chaitin.db");
        let path = path.to_str().unwrap();

        let db = Database::new(path).unwrap();
        db.create_subscription("tester@example.com").unwrap();
        drop(db);

        // Reopening runs init again against the existing file
        let db = Database::new(path).unwrap();
        assert_eq!(db.count_subscriptions().unwrap(), 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn.lock().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
