use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use hearth_types::models::{Attachment, DmAttachment};

use crate::Database;
use crate::queries::direct_messages::dm_attachment_from_row;
use crate::queries::messages::attachment_from_row;

impl Database {
    /// Channel-message attachments on messages `user_id` can read, newest first.
    pub fn list_readable_attachments(&self, user_id: i64, skip: i64, limit: i64) -> Result<Vec<Attachment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.* FROM attachments a
                 JOIN messages m ON m.id = a.message_id
                 JOIN channels c ON c.id = m.channel_id
                 WHERE c.is_private = 0
                    OR EXISTS (SELECT 1 FROM channel_members cm WHERE cm.channel_id = c.id AND cm.user_id = ?1)
                 ORDER BY a.uploaded_at DESC, a.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit, skip], attachment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn get_attachment(&self, id: i64) -> Result<Option<Attachment>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM attachments WHERE id = ?1", [id], attachment_from_row)
                .optional()?)
        })
    }

    pub fn get_dm_attachment(&self, id: i64) -> Result<Option<DmAttachment>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM dm_attachments WHERE id = ?1", [id], dm_attachment_from_row)
                .optional()?)
        })
    }

    pub fn message_attachments(&self, message_id: i64) -> Result<Vec<Attachment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM attachments WHERE message_id = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map([message_id], attachment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn dm_attachments(&self, direct_message_id: i64) -> Result<Vec<DmAttachment>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM dm_attachments WHERE direct_message_id = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map([direct_message_id], dm_attachment_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn delete_attachment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM attachments WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn delete_dm_attachment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM dm_attachments WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NewFile;
    use crate::queries::fixtures;

    fn file(name: &str) -> NewFile {
        NewFile {
            filename: name.into(),
            file_path: format!("messages/{}", name),
            file_type: "document".into(),
            file_size: 1,
            mime_type: None,
        }
    }

    #[test]
    fn listing_skips_private_channels_of_non_members() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let public = fixtures::channel(&db, "general", false, alice);
        let private = fixtures::channel(&db, "secret", true, alice);
        let m1 = db.insert_message(public, alice, "a", None, false).unwrap();
        let m2 = db.insert_message(private, alice, "b", None, false).unwrap();
        db.add_message_attachment(m1, &file("pub.txt")).unwrap();
        db.add_message_attachment(m2, &file("priv.txt")).unwrap();

        assert_eq!(db.list_readable_attachments(alice, 0, 50).unwrap().len(), 2);
        let for_bob = db.list_readable_attachments(bob, 0, 50).unwrap();
        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].filename, "pub.txt");
    }
}
