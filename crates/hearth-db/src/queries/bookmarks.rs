use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::Bookmark;

use crate::Database;

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        message_id: row.get("message_id")?,
        direct_message_id: row.get("direct_message_id")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    pub fn create_bookmark(
        &self,
        user_id: i64,
        message_id: Option<i64>,
        direct_message_id: Option<i64>,
        note: Option<&str>,
    ) -> Result<Bookmark> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bookmarks (user_id, message_id, direct_message_id, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, message_id, direct_message_id, note, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM bookmarks WHERE id = ?1", [id], bookmark_from_row)?)
        })
    }

    /// Whether `user_id` already bookmarked this target.
    pub fn bookmark_exists(
        &self,
        user_id: i64,
        message_id: Option<i64>,
        direct_message_id: Option<i64>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM bookmarks
                     WHERE user_id = ?1 AND message_id IS ?2 AND direct_message_id IS ?3",
                    params![user_id, message_id, direct_message_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    /// Newest first.
    pub fn list_bookmarks(&self, user_id: i64, skip: i64, limit: i64) -> Result<Vec<Bookmark>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM bookmarks WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit, skip], bookmark_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn delete_bookmark(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Replace the note on one of `user_id`'s bookmarks. `None` if not theirs.
    pub fn set_bookmark_note(&self, id: i64, user_id: i64, note: Option<&str>) -> Result<Option<Bookmark>> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE bookmarks SET note = ?3 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id, note],
            )?;
            if n == 0 {
                return Ok(None);
            }
            Ok(conn
                .query_row("SELECT * FROM bookmarks WHERE id = ?1", [id], bookmark_from_row)
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn bookmarks_are_per_user_and_target() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let cid = fixtures::channel(&db, "general", false, alice);
        let mid = db.insert_message(cid, alice, "hi", None, false).unwrap();

        let b = db.create_bookmark(alice, Some(mid), None, Some("later")).unwrap();
        assert!(db.bookmark_exists(alice, Some(mid), None).unwrap());
        assert!(!db.bookmark_exists(bob, Some(mid), None).unwrap());

        assert!(db.set_bookmark_note(b.id, bob, Some("mine")).unwrap().is_none());
        let updated = db.set_bookmark_note(b.id, alice, Some("now")).unwrap().unwrap();
        assert_eq!(updated.note.as_deref(), Some("now"));

        db.delete_message(mid).unwrap();
        assert!(db.list_bookmarks(alice, 0, 50).unwrap().is_empty());
    }
}
