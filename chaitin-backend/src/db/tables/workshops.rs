//! Workshop and attendance (RSVP) database operations

use chrono::Utc;
use rusqlite::{Result as SqliteResult, Row};

use super::super::{Database, NAIVE_FORMAT, row_datetime, row_opt_naive};
use crate::models::{Attendance, Workshop, WorkshopInput};

const WORKSHOP_COLUMNS: &str =
    "id, title, slug, body, scheduled_at, location_name, location_address, location_url, is_confirmed";

impl Database {
    // ============================================
    // Workshop methods
    // ============================================

    fn row_to_workshop(row: &Row) -> SqliteResult<Workshop> {
        Ok(Workshop {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            body: row.get(3)?,
            scheduled_at: row_opt_naive(row, 4)?,
            location_name: row.get(5)?,
            location_address: row.get(6)?,
            location_url: row.get(7)?,
            is_confirmed: row.get::<_, i64>(8)? != 0,
        })
    }

    fn query_workshops(&self, sql: &str) -> SqliteResult<Vec<Workshop>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let workshops = stmt
            .query_map([], |row| Self::row_to_workshop(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(workshops)
    }

    pub fn create_workshop(&self, input: &WorkshopInput) -> SqliteResult<Workshop> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO workshops (title, slug, body, scheduled_at, location_name, location_address, location_url, is_confirmed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &input.title,
                &input.slug,
                &input.body,
                input.scheduled_at.map(|at| at.format(NAIVE_FORMAT).to_string()),
                &input.location_name,
                &input.location_address,
                &input.location_url,
                input.is_confirmed as i64,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_workshop(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn update_workshop(&self, id: i64, input: &WorkshopInput) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE workshops SET title = ?1, slug = ?2, body = ?3, scheduled_at = ?4, location_name = ?5,
             location_address = ?6, location_url = ?7, is_confirmed = ?8 WHERE id = ?9",
            rusqlite::params![
                &input.title,
                &input.slug,
                &input.body,
                input.scheduled_at.map(|at| at.format(NAIVE_FORMAT).to_string()),
                &input.location_name,
                &input.location_address,
                &input.location_url,
                input.is_confirmed as i64,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn get_workshop(&self, id: i64) -> SqliteResult<Option<Workshop>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM workshops WHERE id = ?1", WORKSHOP_COLUMNS))?;
        let workshop = stmt.query_row([id], |row| Self::row_to_workshop(row)).ok();
        Ok(workshop)
    }

    pub fn get_workshop_by_slug(&self, slug: &str) -> SqliteResult<Option<Workshop>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM workshops WHERE slug = ?1", WORKSHOP_COLUMNS))?;
        let workshop = stmt.query_row([slug], |row| Self::row_to_workshop(row)).ok();
        Ok(workshop)
    }

    /// Every workshop: scheduled ones newest first, then drafts by title descending
    pub fn list_workshops(&self) -> SqliteResult<Vec<Workshop>> {
        self.query_workshops(&format!(
            "SELECT {} FROM workshops ORDER BY scheduled_at IS NULL, scheduled_at DESC, title DESC",
            WORKSHOP_COLUMNS
        ))
    }

    /// Workshops with a date, newest first
    pub fn list_scheduled_workshops(&self) -> SqliteResult<Vec<Workshop>> {
        self.query_workshops(&format!(
            "SELECT {} FROM workshops WHERE scheduled_at IS NOT NULL ORDER BY scheduled_at DESC",
            WORKSHOP_COLUMNS
        ))
    }

    pub fn count_workshops(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM workshops", [], |row| row.get(0))
    }

    pub fn delete_workshop(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM workshops WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    // ============================================
    // Attendance methods
    // ============================================

    fn row_to_attendance(row: &Row) -> SqliteResult<Attendance> {
        Ok(Attendance {
            id: row.get(0)?,
            workshop_id: row.get(1)?,
            email: row.get(2)?,
            rsvp: row.get::<_, i64>(3)? != 0,
            created_at: row_datetime(row, 4)?,
        })
    }

    pub fn get_attendance(&self, workshop_id: i64, email: &str) -> SqliteResult<Option<Attendance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, workshop_id, email, rsvp, created_at FROM attendances WHERE workshop_id = ?1 AND email = ?2",
        )?;
        let attendance = stmt
            .query_row(rusqlite::params![workshop_id, email], |row| Self::row_to_attendance(row))
            .ok();
        Ok(attendance)
    }

    /// Record an RSVP. Returns the attendance and whether it was newly created.
    pub fn get_or_create_attendance(
        &self,
        workshop_id: i64,
        email: &str,
    ) -> SqliteResult<(Attendance, bool)> {
        if let Some(existing) = self.get_attendance(workshop_id, email)? {
            return Ok((existing, false));
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO attendances (workshop_id, email, rsvp, created_at) VALUES (?1, ?2, 1, ?3)",
            rusqlite::params![workshop_id, email, now.to_rfc3339()],
        )?;

        Ok((
            Attendance {
                id: conn.last_insert_rowid(),
                workshop_id: Some(workshop_id),
                email: email.to_string(),
                rsvp: true,
                created_at: now,
            },
            true,
        ))
    }

    /// All attendances ordered by workshop (newest id first) then id
    pub fn list_attendances(&self) -> SqliteResult<Vec<Attendance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, workshop_id, email, rsvp, created_at FROM attendances ORDER BY workshop_id DESC, id",
        )?;
        let attendances = stmt
            .query_map([], |row| Self::row_to_attendance(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(attendances)
    }

    pub fn count_attendances(&self, workshop_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM attendances WHERE workshop_id = ?1 AND rsvp = 1",
            [workshop_id],
            |row| row.get(0),
        )
    }
}
