use crate::database::models::MessageRecord;
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

pub(super) struct SqliteMessageRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::MessageRepository for SqliteMessageRepository<'conn> {
    fn batch_insert(&self, records: &[MessageRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        // One multi-row VALUES statement so the whole fan-out lands at once.
        let placeholders = (0..records.len())
            .map(|i| {
                let base = i * 8;
                format!(
                    "(?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{})",
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6,
                    base + 7,
                    base + 8
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO messages (sender_id, receiver_id, topic, content, \
             sender_status, receiver_status, created_at, updated_at) VALUES {placeholders}"
        );
        let mut values: Vec<Value> = Vec::with_capacity(records.len() * 8);
        for record in records {
            values.push(Value::Integer(record.sender_id));
            values.push(Value::Integer(record.receiver_id));
            values.push(Value::Text(record.topic.clone()));
            values.push(Value::Text(record.content.clone()));
            values.push(Value::Integer(record.sender_status));
            values.push(Value::Integer(record.receiver_status));
            values.push(Value::Integer(record.created_at));
            values.push(Value::Integer(record.updated_at));
        }
        let inserted = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(inserted)
    }

    fn list_for_receiver(&self, receiver_id: i64) -> Result<Vec<MessageRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, sender_id, receiver_id, topic, content,
                   sender_status, receiver_status, created_at, updated_at
            FROM messages
            WHERE receiver_id = ?1
            ORDER BY id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![receiver_id], |row| {
            Ok(MessageRecord {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                topic: row.get(3)?,
                content: row.get(4)?,
                sender_status: row.get(5)?,
                receiver_status: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        })?;
        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    fn count_unread(&self, receiver_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND receiver_status = ?2",
            params![receiver_id, MessageRecord::STATUS_NEW],
            |row| row.get(0),
        )?)
    }
}
