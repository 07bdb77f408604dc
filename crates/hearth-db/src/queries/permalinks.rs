use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::Permalink;

use crate::Database;

fn permalink_from_row(row: &Row<'_>) -> rusqlite::Result<Permalink> {
    Ok(Permalink {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        direct_message_id: row.get("direct_message_id")?,
        permalink: row.get("permalink")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    /// Existing permalink for exactly this target, if any.
    pub fn find_permalink(&self, message_id: Option<i64>, direct_message_id: Option<i64>) -> Result<Option<Permalink>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM permalinks WHERE message_id IS ?1 AND direct_message_id IS ?2",
                    params![message_id, direct_message_id],
                    permalink_from_row,
                )
                .optional()?)
        })
    }

    pub fn create_permalink(
        &self,
        message_id: Option<i64>,
        direct_message_id: Option<i64>,
        slug: &str,
    ) -> Result<Permalink> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO permalinks (message_id, direct_message_id, permalink, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![message_id, direct_message_id, slug, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM permalinks WHERE id = ?1", [id], permalink_from_row)?)
        })
    }

    pub fn get_permalink(&self, slug: &str) -> Result<Option<Permalink>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM permalinks WHERE permalink = ?1", [slug], permalink_from_row)
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn lookup_by_target_and_slug() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        let mid = db.insert_message(cid, alice, "hi", None, false).unwrap();

        assert!(db.find_permalink(Some(mid), None).unwrap().is_none());
        let link = db.create_permalink(Some(mid), None, "abcd1234").unwrap();
        assert_eq!(db.find_permalink(Some(mid), None).unwrap().unwrap().id, link.id);
        assert_eq!(db.get_permalink("abcd1234").unwrap().unwrap().message_id, Some(mid));

        db.delete_message(mid).unwrap();
        assert!(db.get_permalink("abcd1234").unwrap().is_none());
    }
}
