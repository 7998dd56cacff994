use crate::database::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        forum_id: row.get(2)?,
        author_id: row.get(3)?,
        content: row.get(4)?,
        likes: row.get(5)?,
        dislikes: row.get(6)?,
        edited: row.get::<_, i64>(7)? != 0,
        edited_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const COLUMNS: &str = "id, thread_id, forum_id, author_id, content, likes, dislikes, \
                       edited, edited_at, created_at, updated_at";

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO posts (thread_id, forum_id, author_id, content, likes, dislikes,
                               edited, edited_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.thread_id,
                record.forum_id,
                record.author_id,
                record.content,
                record.likes,
                record.dislikes,
                if record.edited { 1 } else { 0 },
                record.edited_at,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                map_post,
            )
            .optional()?)
    }

    fn get_in_thread(&self, id: i64, thread_id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM posts WHERE id = ?1 AND thread_id = ?2"),
                params![id, thread_id],
                map_post,
            )
            .optional()?)
    }

    fn first_in_thread(&self, thread_id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM posts WHERE thread_id = ?1 ORDER BY id ASC LIMIT 1"
                ),
                params![thread_id],
                map_post,
            )
            .optional()?)
    }

    fn latest_in_thread(&self, thread_id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM posts WHERE thread_id = ?1 ORDER BY id DESC LIMIT 1"
                ),
                params![thread_id],
                map_post,
            )
            .optional()?)
    }

    fn list_for_thread(&self, thread_id: i64, limit: i64, offset: i64) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM posts WHERE thread_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![thread_id, limit, offset], map_post)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count_for_thread(&self, thread_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )?)
    }

    fn count_before(&self, thread_id: i64, post_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE thread_id = ?1 AND id < ?2",
            params![thread_id, post_id],
            |row| row.get(0),
        )?)
    }

    fn count_all(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?)
    }

    fn count_for_author(&self, author_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
            params![author_id],
            |row| row.get(0),
        )?)
    }

    fn update_content(&self, post_id: i64, content: &str, edited_at: i64) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET content = ?1, edited = 1, edited_at = ?2, updated_at = ?2
            WHERE id = ?3
            "#,
            params![content, edited_at, post_id],
        )?;
        Ok(())
    }

    fn bump_vote_counters(
        &self,
        post_id: i64,
        likes_delta: i64,
        dislikes_delta: i64,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET likes = likes + ?1, dislikes = dislikes + ?2
            WHERE id = ?3
            "#,
            params![likes_delta, dislikes_delta, post_id],
        )?;
        Ok(())
    }
}
