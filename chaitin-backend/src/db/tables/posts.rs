//! Blog post database operations

use rusqlite::{Result as SqliteResult, Row};

use super::super::{Database, row_opt_datetime};
use crate::models::{Post, PostInput};

const POST_COLUMNS: &str = "id, title, slug, body, published_at, author_id";

impl Database {
    fn row_to_post(row: &Row) -> SqliteResult<Post> {
        Ok(Post {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            body: row.get(3)?,
            published_at: row_opt_datetime(row, 4)?,
            author_id: row.get(5)?,
        })
    }

    pub fn create_post(&self, input: &PostInput) -> SqliteResult<Post> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO posts (title, slug, body, published_at, author_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                &input.title,
                &input.slug,
                &input.body,
                input.published_at.map(|dt| dt.to_rfc3339()),
                input.author_id
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_post(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn update_post(&self, id: i64, input: &PostInput) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE posts SET title = ?1, slug = ?2, body = ?3, published_at = ?4 WHERE id = ?5",
            rusqlite::params![
                &input.title,
                &input.slug,
                &input.body,
                input.published_at.map(|dt| dt.to_rfc3339()),
                id
            ],
        )?;
        Ok(())
    }

    pub fn get_post(&self, id: i64) -> SqliteResult<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS))?;
        let post = stmt.query_row([id], |row| Self::row_to_post(row)).ok();
        Ok(post)
    }

    pub fn get_post_by_slug(&self, slug: &str) -> SqliteResult<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM posts WHERE slug = ?1", POST_COLUMNS))?;
        let post = stmt.query_row([slug], |row| Self::row_to_post(row)).ok();
        Ok(post)
    }

    /// Published posts, newest first
    pub fn list_published_posts(&self) -> SqliteResult<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE published_at IS NOT NULL ORDER BY published_at DESC",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map([], |row| Self::row_to_post(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(posts)
    }

    /// Every post including drafts, newest id first (back-office)
    pub fn list_posts(&self) -> SqliteResult<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM posts ORDER BY id DESC", POST_COLUMNS))?;
        let posts = stmt
            .query_map([], |row| Self::row_to_post(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(posts)
    }

    pub fn count_posts(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
    }

    pub fn delete_post(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(slug: &str, published: Option<(i32, u32, u32)>) -> PostInput {
        PostInput {
            title: format!("Post {}", slug),
            slug: slug.to_string(),
            body: "I am the body".to_string(),
            published_at: published
                .map(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()),
            author_id: None,
        }
    }

    #[test]
    fn test_published_posts_newest_first() {
        let db = Database::in_memory().unwrap();
        db.create_post(&post("old", Some((2020, 2, 18)))).unwrap();
        db.create_post(&post("draft", None)).unwrap();
        db.create_post(&post("new", Some((2022, 7, 4)))).unwrap();

        let slugs: Vec<_> = db
            .list_published_posts()
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["new", "old"]);
        assert_eq!(db.count_posts().unwrap(), 3);
    }

    #[test]
    fn test_author_delete_keeps_post() {
        let db = Database::in_memory().unwrap();
        let author = db.create_user("gregory", "", "hash", false).unwrap();
        let mut input = post("first-post", Some((2020, 2, 18)));
        input.author_id = Some(author.id);
        let created = db.create_post(&input).unwrap();
        assert_eq!(created.author_id, Some(author.id));

        db.delete_user(author.id).unwrap();
        let kept = db.get_post_by_slug("first-post").unwrap().unwrap();
        assert_eq!(kept.author_id, None);
    }
}
