//! Hosted image database operations

use chrono::Utc;
use rusqlite::{Result as SqliteResult, Row};

use super::super::{Database, row_datetime};
use crate::models::Image;

const IMAGE_COLUMNS: &str = "id, slug, data, extension, uploaded_at, uploaded_by";

impl Database {
    fn row_to_image(row: &Row) -> SqliteResult<Image> {
        Ok(Image {
            id: row.get(0)?,
            slug: row.get(1)?,
            data: row.get(2)?,
            extension: row.get(3)?,
            uploaded_at: row_datetime(row, 4)?,
            uploaded_by: row.get(5)?,
        })
    }

    pub fn create_image(
        &self,
        slug: &str,
        data: &[u8],
        extension: &str,
        uploaded_by: Option<i64>,
    ) -> SqliteResult<Image> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO images (slug, data, extension, uploaded_at, uploaded_by) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![slug, data, extension, now.to_rfc3339(), uploaded_by],
        )?;

        Ok(Image {
            id: conn.last_insert_rowid(),
            slug: slug.to_string(),
            data: data.to_vec(),
            extension: extension.to_string(),
            uploaded_at: now,
            uploaded_by,
        })
    }

    pub fn get_image_by_slug(&self, slug: &str) -> SqliteResult<Option<Image>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM images WHERE slug = ?1", IMAGE_COLUMNS))?;
        let image = stmt.query_row([slug], |row| Self::row_to_image(row)).ok();
        Ok(image)
    }

    /// Images uploaded by one user, newest first
    pub fn list_images_by_user(&self, user_id: i64) -> SqliteResult<Vec<Image>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM images WHERE uploaded_by = ?1 ORDER BY id DESC",
            IMAGE_COLUMNS
        ))?;
        let images = stmt
            .query_map([user_id], |row| Self::row_to_image(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(images)
    }

    pub fn list_images(&self) -> SqliteResult<Vec<Image>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM images ORDER BY id DESC", IMAGE_COLUMNS))?;
        let images = stmt
            .query_map([], |row| Self::row_to_image(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(images)
    }

    pub fn count_images(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
    }

    pub fn delete_image(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_blob_roundtrip() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("gregory", "", "hash", false).unwrap();
        let data = vec![0x89, b'P', b'N', b'G', 0, 255];
        db.create_image("a1b2c3", &data, "png", Some(user.id)).unwrap();

        let image = db.get_image_by_slug("a1b2c3").unwrap().unwrap();
        assert_eq!(image.data, data);
        assert_eq!(image.path(), "/images/a1b2c3.png");
        assert_eq!(db.list_images_by_user(user.id).unwrap().len(), 1);

        db.delete_user(user.id).unwrap();
        let orphan = db.get_image_by_slug("a1b2c3").unwrap().unwrap();
        assert_eq!(orphan.uploaded_by, None);
    }
}
