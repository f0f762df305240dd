//! User database operations

use chrono::Utc;
use rusqlite::{Result as SqliteResult, Row};

use super::super::{Database, row_datetime};
use crate::models::{User, UserProfileUpdate};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, about, is_public, is_superuser, avatar_data, avatar_ext, date_joined";

impl Database {
    fn row_to_user(row: &Row) -> SqliteResult<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            full_name: row.get(4)?,
            about: row.get(5)?,
            is_public: row.get::<_, i64>(6)? != 0,
            is_superuser: row.get::<_, i64>(7)? != 0,
            avatar_data: row.get(8)?,
            avatar_ext: row.get(9)?,
            date_joined: row_datetime(row, 10)?,
        })
    }

    /// Insert a new user. The caller hashes the password.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_superuser: bool,
    ) -> SqliteResult<User> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (username, email, password_hash, is_superuser, date_joined) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![username, email, password_hash, is_superuser as i64, &now],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_user(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;
        let user = stmt.query_row([id], |row| Self::row_to_user(row)).ok();
        Ok(user)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS))?;
        let user = stmt.query_row([username], |row| Self::row_to_user(row)).ok();
        Ok(user)
    }

    /// Members in random order, optionally only those with public profiles
    pub fn list_members(&self, public_only: bool) -> SqliteResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let sql = if public_only {
            format!("SELECT {} FROM users WHERE is_public = 1 ORDER BY RANDOM()", USER_COLUMNS)
        } else {
            format!("SELECT {} FROM users ORDER BY RANDOM()", USER_COLUMNS)
        };
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([], |row| Self::row_to_user(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(users)
    }

    /// All users, newest first (back-office)
    pub fn list_users(&self) -> SqliteResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id DESC", USER_COLUMNS))?;
        let users = stmt
            .query_map([], |row| Self::row_to_user(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(users)
    }

    pub fn count_users(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
    }

    /// Update editable profile fields
    pub fn update_user_profile(&self, id: i64, profile: &UserProfileUpdate) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET username = ?1, email = ?2, full_name = ?3, about = ?4, is_public = ?5 WHERE id = ?6",
            rusqlite::params![
                &profile.username,
                &profile.email,
                &profile.full_name,
                &profile.about,
                profile.is_public as i64,
                id
            ],
        )?;
        Ok(())
    }

    /// Replace the avatar; empty data and extension remove it
    pub fn set_user_avatar(&self, id: i64, data: &[u8], extension: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET avatar_data = ?1, avatar_ext = ?2 WHERE id = ?3",
            rusqlite::params![data, extension, id],
        )?;
        Ok(())
    }

    /// Delete a user. Sessions and mentorships cascade; posts and images keep their rows.
    pub fn delete_user(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;

    #[test]
    fn test_create_and_lookup_user() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("gregory", "g@example.com", "hash", false).unwrap();
        assert!(!user.is_public);
        assert!(!user.has_avatar());

        let found = db.get_user_by_username("gregory").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_user("gregory", "g@example.com", "hash", false).unwrap();
        let err = db.create_user("gregory", "other@example.com", "hash", false).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_list_members_public_only() {
        let db = Database::in_memory().unwrap();
        let public = db.create_user("public", "", "hash", false).unwrap();
        db.create_user("private", "", "hash", false).unwrap();
        db.update_user_profile(
            public.id,
            &UserProfileUpdate {
                username: "public".to_string(),
                email: String::new(),
                full_name: "Public Person".to_string(),
                about: String::new(),
                is_public: true,
            },
        )
        .unwrap();

        let members = db.list_members(true).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].full_name, "Public Person");
        assert_eq!(db.list_members(false).unwrap().len(), 2);
    }

    #[test]
    fn test_avatar_set_and_clear() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("gregory", "", "hash", false).unwrap();

        db.set_user_avatar(user.id, &[1, 2, 3], "png").unwrap();
        let user = db.get_user(user.id).unwrap().unwrap();
        assert!(user.has_avatar());
        assert_eq!(user.avatar_data, vec![1, 2, 3]);

        db.set_user_avatar(user.id, &[], "").unwrap();
        assert!(!db.get_user(user.id).unwrap().unwrap().has_avatar());
    }
}
