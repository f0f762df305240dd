//! Mentorship database operations

use rusqlite::{Result as SqliteResult, Row};

use super::super::Database;
use crate::models::Mentorship;

const MENTORSHIP_SELECT: &str = "SELECT m.id, m.title, m.slug, m.body, m.mentor_id, u.username
     FROM mentorships m JOIN users u ON u.id = m.mentor_id";

impl Database {
    fn row_to_mentorship(row: &Row) -> SqliteResult<Mentorship> {
        Ok(Mentorship {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            body: row.get(3)?,
            mentor_id: row.get(4)?,
            mentor_username: row.get(5)?,
        })
    }

    pub fn create_mentorship(
        &self,
        title: &str,
        slug: &str,
        body: &str,
        mentor_id: i64,
    ) -> SqliteResult<Mentorship> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO mentorships (title, slug, body, mentor_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![title, slug, body, mentor_id],
        )?;
        drop(conn);

        self.get_mentorship_by_slug(slug)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_mentorship_by_slug(&self, slug: &str) -> SqliteResult<Option<Mentorship>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("{} WHERE m.slug = ?1", MENTORSHIP_SELECT))?;
        let mentorship = stmt.query_row([slug], |row| Self::row_to_mentorship(row)).ok();
        Ok(mentorship)
    }

    pub fn list_mentorships(&self) -> SqliteResult<Vec<Mentorship>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("{} ORDER BY m.id DESC", MENTORSHIP_SELECT))?;
        let mentorships = stmt
            .query_map([], |row| Self::row_to_mentorship(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(mentorships)
    }

    pub fn list_mentorships_by_mentor(&self, mentor_id: i64) -> SqliteResult<Vec<Mentorship>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{} WHERE m.mentor_id = ?1 ORDER BY m.id DESC", MENTORSHIP_SELECT))?;
        let mentorships = stmt
            .query_map([mentor_id], |row| Self::row_to_mentorship(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(mentorships)
    }

    pub fn count_mentorships(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM mentorships", [], |row| row.get(0))
    }

    pub fn delete_mentorship(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM mentorships WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentorships_cascade_with_mentor() {
        let db = Database::in_memory().unwrap();
        let mentor = db.create_user("gregory", "", "hash", false).unwrap();
        let created = db
            .create_mentorship("Complexity", "complexity", "Kolmogorov", mentor.id)
            .unwrap();
        assert_eq!(created.mentor_username, "gregory");
        assert_eq!(db.list_mentorships_by_mentor(mentor.id).unwrap().len(), 1);

        db.delete_user(mentor.id).unwrap();
        assert_eq!(db.count_mentorships().unwrap(), 0);
    }
}
