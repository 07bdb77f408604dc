use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::ScheduledMessage;

use crate::Database;

fn scheduled_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledMessage> {
    Ok(ScheduledMessage {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        channel_id: row.get("channel_id")?,
        receiver_id: row.get("receiver_id")?,
        content: row.get("content")?,
        formatting: row.get("formatting")?,
        mentions: row.get("mentions")?,
        scheduled_for: row.get("scheduled_for")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        sent_at: row.get("sent_at")?,
    })
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn create_scheduled(
        &self,
        user_id: i64,
        channel_id: Option<i64>,
        receiver_id: Option<i64>,
        content: &str,
        formatting: Option<&str>,
        mentions: Option<&str>,
        scheduled_for: DateTime<Utc>,
    ) -> Result<ScheduledMessage> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scheduled_messages
                    (user_id, channel_id, receiver_id, content, formatting, mentions, scheduled_for, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
                params![user_id, channel_id, receiver_id, content, formatting, mentions, scheduled_for, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM scheduled_messages WHERE id = ?1", [id], scheduled_from_row)?)
        })
    }

    /// `user_id`'s scheduled messages in `status`, soonest first.
    pub fn list_scheduled(&self, user_id: i64, status: &str) -> Result<Vec<ScheduledMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM scheduled_messages WHERE user_id = ?1 AND status = ?2
                 ORDER BY scheduled_for ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![user_id, status], scheduled_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn get_scheduled(&self, id: i64, user_id: i64) -> Result<Option<ScheduledMessage>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM scheduled_messages WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                    scheduled_from_row,
                )
                .optional()?)
        })
    }

    pub fn update_scheduled(
        &self,
        id: i64,
        content: Option<&str>,
        formatting: Option<&str>,
        mentions: Option<&str>,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE scheduled_messages SET
                    content = COALESCE(?2, content),
                    formatting = COALESCE(?3, formatting),
                    mentions = COALESCE(?4, mentions),
                    scheduled_for = COALESCE(?5, scheduled_for)
                 WHERE id = ?1",
                params![id, content, formatting, mentions, scheduled_for],
            )?;
            Ok(())
        })
    }

    pub fn cancel_scheduled(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE scheduled_messages SET status = 'cancelled' WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::queries::fixtures;

    #[test]
    fn cancelled_messages_leave_the_pending_list() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        let when = Utc::now() + Duration::hours(1);

        let s = db.create_scheduled(alice, Some(cid), None, "later", None, None, when).unwrap();
        assert_eq!(s.status, "pending");
        assert_eq!(db.list_scheduled(alice, "pending").unwrap().len(), 1);

        db.cancel_scheduled(s.id).unwrap();
        assert!(db.list_scheduled(alice, "pending").unwrap().is_empty());
        assert_eq!(db.get_scheduled(s.id, alice).unwrap().unwrap().status, "cancelled");
    }
}
