use crate::database::models::ForumRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteForumRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_forum(row: &Row<'_>) -> rusqlite::Result<ForumRecord> {
    Ok(ForumRecord {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        sub: row.get(3)?,
        slug: row.get(4)?,
        visible: row.get::<_, i64>(5)? != 0,
        sort: row.get(6)?,
        threads: row.get(7)?,
        posts: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const COLUMNS: &str =
    "id, category_id, name, sub, slug, visible, sort, threads, posts, created_at, updated_at";

impl<'conn> super::ForumRepository for SqliteForumRepository<'conn> {
    fn create(&self, record: &ForumRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO forums (category_id, name, sub, slug, visible, sort, threads, posts, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.category_id,
                record.name,
                record.sub,
                record.slug,
                if record.visible { 1 } else { 0 },
                record.sort,
                record.threads,
                record.posts,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<ForumRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM forums WHERE id = ?1"),
                params![id],
                map_forum,
            )
            .optional()?)
    }

    fn get_in_category(&self, id: i64, category_id: i64) -> Result<Option<ForumRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM forums WHERE id = ?1 AND category_id = ?2"),
                params![id, category_id],
                map_forum,
            )
            .optional()?)
    }

    fn list_for_category(&self, category_id: i64) -> Result<Vec<ForumRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM forums WHERE category_id = ?1 ORDER BY sort ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![category_id], map_forum)?;
        let mut forums = Vec::new();
        for row in rows {
            forums.push(row?);
        }
        Ok(forums)
    }

    fn bump_counters(&self, forum_id: i64, threads_delta: i64, posts_delta: i64) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE forums
            SET threads = threads + ?1, posts = posts + ?2
            WHERE id = ?3
            "#,
            params![threads_delta, posts_delta, forum_id],
        )?;
        Ok(())
    }
}
