use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::Call;

use crate::Database;

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<Call> {
    Ok(Call {
        id: row.get("id")?,
        channel_id: row.get("channel_id")?,
        dm_user_id: row.get("dm_user_id")?,
        call_type: row.get("call_type")?,
        started_by: row.get("started_by")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        status: row.get("status")?,
        call_url: row.get("call_url")?,
    })
}

impl Database {
    pub fn create_call(
        &self,
        channel_id: Option<i64>,
        dm_user_id: Option<i64>,
        call_type: &str,
        started_by: i64,
        call_url: &str,
    ) -> Result<Call> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO calls (channel_id, dm_user_id, call_type, started_by, started_at, status, call_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6)",
                params![channel_id, dm_user_id, call_type, started_by, Utc::now(), call_url],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM calls WHERE id = ?1", [id], call_from_row)?)
        })
    }

    pub fn get_call(&self, id: i64) -> Result<Option<Call>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM calls WHERE id = ?1", [id], call_from_row)
                .optional()?)
        })
    }

    pub fn end_call(&self, id: i64) -> Result<Option<Call>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE calls SET status = 'ended', ended_at = ?2 WHERE id = ?1 AND status = 'active'",
                params![id, Utc::now()],
            )?;
            Ok(conn
                .query_row("SELECT * FROM calls WHERE id = ?1", [id], call_from_row)
                .optional()?)
        })
    }

    /// Active calls in channels `user_id` belongs to, or DMs they take part in.
    pub fn active_calls_for(&self, user_id: i64) -> Result<Vec<Call>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM calls
                 WHERE status = 'active' AND (
                    channel_id IN (SELECT channel_id FROM channel_members WHERE user_id = ?1)
                    OR (channel_id IS NULL AND (started_by = ?1 OR dm_user_id = ?1))
                 )
                 ORDER BY started_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], call_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn active_calls_are_scoped_to_participants() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let carol = fixtures::user(&db, "carol");
        let cid = fixtures::channel(&db, "general", false, alice);

        let channel_call = db.create_call(Some(cid), None, "audio", alice, "u1").unwrap();
        db.create_call(None, Some(bob), "video", alice, "u2").unwrap();

        assert_eq!(db.active_calls_for(alice).unwrap().len(), 2);
        assert_eq!(db.active_calls_for(bob).unwrap().len(), 1);
        assert!(db.active_calls_for(carol).unwrap().is_empty());

        let ended = db.end_call(channel_call.id).unwrap().unwrap();
        assert_eq!(ended.status, "ended");
        assert!(ended.ended_at.is_some());
        assert_eq!(db.active_calls_for(alice).unwrap().len(), 1);
    }
}
