//! Login session database operations

use chrono::{Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use rusqlite::Result as SqliteResult;

use super::super::{Database, row_datetime};
use crate::models::{SESSION_AGE_SECONDS, Session, User};

const TOKEN_LENGTH: usize = 48;

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

impl Database {
    /// Create a new session for a user
    pub fn create_session(&self, user_id: i64) -> SqliteResult<Session> {
        let conn = self.conn.lock().unwrap();
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(SESSION_AGE_SECONDS);

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![&token, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            token,
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a session token to its user, if the session is still valid
    pub fn get_user_by_session(&self, token: &str) -> SqliteResult<Option<User>> {
        let user_id = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
            )?;

            let session = stmt
                .query_row([token], |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        token: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: row_datetime(row, 3)?,
                        expires_at: row_datetime(row, 4)?,
                    })
                })
                .ok();

            match session {
                Some(session) if session.expires_at > Utc::now() => session.user_id,
                Some(session) => {
                    // Expired, clean it up
                    conn.execute("DELETE FROM auth_sessions WHERE id = ?1", [session.id])?;
                    return Ok(None);
                }
                None => return Ok(None),
            }
        };

        self.get_user(user_id)
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows_affected > 0)
    }

    /// Remove all expired sessions, returns how many were deleted
    pub fn cleanup_expired_sessions(&self) -> SqliteResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute("DELETE FROM auth_sessions WHERE expires_at < ?1", [&now])
    }
}
