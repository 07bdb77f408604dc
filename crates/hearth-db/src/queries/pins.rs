use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::PinnedMessage;

use crate::Database;

fn pin_from_row(row: &Row<'_>) -> rusqlite::Result<PinnedMessage> {
    Ok(PinnedMessage {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        channel_id: row.get("channel_id")?,
        pinned_by: row.get("pinned_by")?,
        pinned_at: row.get("pinned_at")?,
    })
}

impl Database {
    pub fn pin_message(&self, message_id: i64, channel_id: i64, pinned_by: i64) -> Result<PinnedMessage> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pinned_messages (message_id, channel_id, pinned_by, pinned_at) VALUES (?1, ?2, ?3, ?4)",
                params![message_id, channel_id, pinned_by, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM pinned_messages WHERE id = ?1", [id], pin_from_row)?)
        })
    }

    pub fn get_pin(&self, channel_id: i64, message_id: i64) -> Result<Option<PinnedMessage>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM pinned_messages WHERE channel_id = ?1 AND message_id = ?2",
                    params![channel_id, message_id],
                    pin_from_row,
                )
                .optional()?)
        })
    }

    /// Newest pin first.
    pub fn list_pins(&self, channel_id: i64) -> Result<Vec<PinnedMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM pinned_messages WHERE channel_id = ?1 ORDER BY pinned_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([channel_id], pin_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn delete_pin(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM pinned_messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}
