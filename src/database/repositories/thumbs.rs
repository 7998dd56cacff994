use crate::database::models::PostThumbRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteThumbRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::ThumbRepository for SqliteThumbRepository<'conn> {
    fn get(&self, post_id: i64, user_id: i64) -> Result<Option<PostThumbRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT post_id, user_id, thumb, created_at
                FROM post_thumbs
                WHERE post_id = ?1 AND user_id = ?2
                "#,
                params![post_id, user_id],
                |row| {
                    Ok(PostThumbRecord {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                        thumb: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn set(&self, record: &PostThumbRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO post_thumbs (post_id, user_id, thumb, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(post_id, user_id) DO UPDATE SET
                thumb = excluded.thumb,
                created_at = excluded.created_at
            "#,
            params![record.post_id, record.user_id, record.thumb, record.created_at],
        )?;
        Ok(())
    }
}
