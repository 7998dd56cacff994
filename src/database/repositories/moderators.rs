use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteModeratorRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::ModeratorRepository for SqliteModeratorRepository<'conn> {
    fn assign(&self, forum_id: i64, user_id: i64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO moderators (forum_id, user_id)
            VALUES (?1, ?2)
            "#,
            params![forum_id, user_id],
        )?;
        Ok(())
    }

    fn withdraw(&self, forum_id: i64, user_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM moderators WHERE forum_id = ?1 AND user_id = ?2",
            params![forum_id, user_id],
        )?;
        Ok(())
    }

    fn list_for_forum(&self, forum_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id FROM moderators WHERE forum_id = ?1 ORDER BY user_id ASC",
        )?;
        let rows = stmt.query_map(params![forum_id], |row| row.get::<_, i64>(0))?;
        let mut moderators = Vec::new();
        for row in rows {
            moderators.push(row?);
        }
        Ok(moderators)
    }

    fn is_moderator(&self, forum_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM moderators WHERE forum_id = ?1 AND user_id = ?2",
            params![forum_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
