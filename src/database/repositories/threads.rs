use crate::database::models::ThreadRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteThreadRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_thread(row: &Row<'_>) -> rusqlite::Result<ThreadRecord> {
    Ok(ThreadRecord {
        id: row.get(0)?,
        category_id: row.get(1)?,
        forum_id: row.get(2)?,
        author_id: row.get(3)?,
        name: row.get(4)?,
        slug: row.get(5)?,
        posts: row.get(6)?,
        views: row.get(7)?,
        pinned: row.get::<_, i64>(8)? != 0,
        locked: row.get::<_, i64>(9)? != 0,
        new_post_at: row.get(10)?,
        edited_post_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

const COLUMNS: &str = "id, category_id, forum_id, author_id, name, slug, posts, views, \
                       pinned, locked, new_post_at, edited_post_at, created_at, updated_at";

impl<'conn> super::ThreadRepository for SqliteThreadRepository<'conn> {
    fn create(&self, record: &ThreadRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO threads (category_id, forum_id, author_id, name, slug, posts, views,
                                 pinned, locked, new_post_at, edited_post_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.category_id,
                record.forum_id,
                record.author_id,
                record.name,
                record.slug,
                record.posts,
                record.views,
                if record.pinned { 1 } else { 0 },
                if record.locked { 1 } else { 0 },
                record.new_post_at,
                record.edited_post_at,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<ThreadRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM threads WHERE id = ?1"),
                params![id],
                map_thread,
            )
            .optional()?)
    }

    fn get_in_forum(
        &self,
        id: i64,
        category_id: i64,
        forum_id: i64,
        slug: Option<&str>,
    ) -> Result<Option<ThreadRecord>> {
        let row = match slug {
            Some(slug) => self
                .conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM threads
                         WHERE id = ?1 AND category_id = ?2 AND forum_id = ?3 AND slug = ?4"
                    ),
                    params![id, category_id, forum_id, slug],
                    map_thread,
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM threads
                         WHERE id = ?1 AND category_id = ?2 AND forum_id = ?3"
                    ),
                    params![id, category_id, forum_id],
                    map_thread,
                )
                .optional()?,
        };
        Ok(row)
    }

    fn list_for_forum(&self, forum_id: i64, limit: i64, offset: i64) -> Result<Vec<ThreadRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM threads
             WHERE forum_id = ?1
             ORDER BY pinned DESC, COALESCE(new_post_at, created_at) DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![forum_id, limit, offset], map_thread)?;
        let mut threads = Vec::new();
        for row in rows {
            threads.push(row?);
        }
        Ok(threads)
    }

    fn count_for_forum(&self, forum_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM threads WHERE forum_id = ?1",
            params![forum_id],
            |row| row.get(0),
        )?)
    }

    fn count_all(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))?)
    }

    fn bump_posts(&self, thread_id: i64, delta: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET posts = posts + ?1 WHERE id = ?2",
            params![delta, thread_id],
        )?;
        Ok(())
    }

    fn bump_views(&self, thread_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET views = views + 1 WHERE id = ?1",
            params![thread_id],
        )?;
        Ok(())
    }

    fn touch_new_post(&self, thread_id: i64, at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET new_post_at = ?1 WHERE id = ?2",
            params![at, thread_id],
        )?;
        Ok(())
    }

    fn touch_edited_post(&self, thread_id: i64, at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET edited_post_at = ?1 WHERE id = ?2",
            params![at, thread_id],
        )?;
        Ok(())
    }

    fn rename(&self, thread_id: i64, name: &str, slug: &str, at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET name = ?1, slug = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, slug, at, thread_id],
        )?;
        Ok(())
    }

    fn set_pinned(&self, thread_id: i64, pinned: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET pinned = ?1 WHERE id = ?2",
            params![if pinned { 1 } else { 0 }, thread_id],
        )?;
        Ok(())
    }

    fn set_locked(&self, thread_id: i64, locked: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE threads SET locked = ?1 WHERE id = ?2",
            params![if locked { 1 } else { 0 }, thread_id],
        )?;
        Ok(())
    }
}
