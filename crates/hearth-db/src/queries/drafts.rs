use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use hearth_types::models::Draft;

use crate::Database;

fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<Draft> {
    Ok(Draft {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        channel_id: row.get("channel_id")?,
        receiver_id: row.get("receiver_id")?,
        content: row.get("content")?,
        formatting: row.get("formatting")?,
        mentions: row.get("mentions")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn find_draft(
    conn: &Connection,
    user_id: i64,
    channel_id: Option<i64>,
    receiver_id: Option<i64>,
) -> Result<Option<Draft>> {
    Ok(conn
        .query_row(
            "SELECT * FROM drafts WHERE user_id = ?1 AND channel_id IS ?2 AND receiver_id IS ?3",
            params![user_id, channel_id, receiver_id],
            draft_from_row,
        )
        .optional()?)
}

impl Database {
    /// Insert or overwrite the single draft `user_id` keeps per target.
    pub fn upsert_draft(
        &self,
        user_id: i64,
        channel_id: Option<i64>,
        receiver_id: Option<i64>,
        content: &str,
        formatting: Option<&str>,
        mentions: Option<&str>,
    ) -> Result<Draft> {
        self.with_tx(|tx| {
            let now = Utc::now();
            let id = match find_draft(tx, user_id, channel_id, receiver_id)? {
                Some(existing) => {
                    tx.execute(
                        "UPDATE drafts SET content = ?2, formatting = ?3, mentions = ?4, updated_at = ?5 WHERE id = ?1",
                        params![existing.id, content, formatting, mentions, now],
                    )?;
                    existing.id
                }
                None => {
                    tx.execute(
                        "INSERT INTO drafts (user_id, channel_id, receiver_id, content, formatting, mentions, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                        params![user_id, channel_id, receiver_id, content, formatting, mentions, now],
                    )?;
                    tx.last_insert_rowid()
                }
            };
            Ok(tx.query_row("SELECT * FROM drafts WHERE id = ?1", [id], draft_from_row)?)
        })
    }

    /// Most recently touched first.
    pub fn list_drafts(&self, user_id: i64) -> Result<Vec<Draft>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM drafts WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC")?;
            let rows = stmt
                .query_map([user_id], draft_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn channel_draft(&self, user_id: i64, channel_id: i64) -> Result<Option<Draft>> {
        self.with_conn(|conn| find_draft(conn, user_id, Some(channel_id), None))
    }

    pub fn dm_draft(&self, user_id: i64, receiver_id: i64) -> Result<Option<Draft>> {
        self.with_conn(|conn| find_draft(conn, user_id, None, Some(receiver_id)))
    }

    pub fn get_draft(&self, id: i64, user_id: i64) -> Result<Option<Draft>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM drafts WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                    draft_from_row,
                )
                .optional()?)
        })
    }

    pub fn update_draft(
        &self,
        id: i64,
        content: Option<&str>,
        formatting: Option<&str>,
        mentions: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE drafts SET
                    content = COALESCE(?2, content),
                    formatting = COALESCE(?3, formatting),
                    mentions = COALESCE(?4, mentions),
                    updated_at = ?5
                 WHERE id = ?1",
                params![id, content, formatting, mentions, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn delete_draft(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM drafts WHERE id = ?1 AND user_id = ?2", params![id, user_id])?;
            Ok(n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn upsert_keeps_one_draft_per_target() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let cid = fixtures::channel(&db, "general", false, alice);

        let first = db.upsert_draft(alice, Some(cid), None, "he", None, None).unwrap();
        let second = db.upsert_draft(alice, Some(cid), None, "hello", None, None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "hello");

        db.upsert_draft(alice, None, Some(bob), "psst", None, None).unwrap();
        assert_eq!(db.list_drafts(alice).unwrap().len(), 2);
        assert_eq!(db.dm_draft(alice, bob).unwrap().unwrap().content, "psst");
        assert!(db.channel_draft(bob, cid).unwrap().is_none());
    }
}
