use crate::database::models::CategoryRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCategoryRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        visible: row.get::<_, i64>(3)? != 0,
        sort: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const COLUMNS: &str = "id, name, slug, visible, sort, created_at, updated_at";

impl<'conn> super::CategoryRepository for SqliteCategoryRepository<'conn> {
    fn create(&self, record: &CategoryRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO categories (name, slug, visible, sort, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.name,
                record.slug,
                if record.visible { 1 } else { 0 },
                record.sort,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CategoryRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM categories WHERE id = ?1"),
                params![id],
                map_category,
            )
            .optional()?)
    }

    fn get_by_slug(&self, id: i64, slug: &str) -> Result<Option<CategoryRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM categories WHERE id = ?1 AND slug = ?2"),
                params![id, slug],
                map_category,
            )
            .optional()?)
    }

    fn list(&self) -> Result<Vec<CategoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM categories ORDER BY sort ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], map_category)?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }
}
