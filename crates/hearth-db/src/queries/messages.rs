use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use hearth_types::models::{Attachment, Message, Reaction, ReactionGroup, Thread};

use crate::models::{MessageRow, NewFile, ThreadRow};
use crate::queries::users::users_by_ids;
use crate::{Database, placeholders};

impl Database {
    // -- Messages --

    pub fn insert_message(
        &self,
        channel_id: i64,
        user_id: i64,
        content: &str,
        formatted_content: Option<&str>,
        is_system_message: bool,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (channel_id, user_id, content, formatted_content, is_system_message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![channel_id, user_id, content, formatted_content, is_system_message, Utc::now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Message plus the files stored with it, recorded in one transaction.
    pub fn insert_message_with_files(
        &self,
        channel_id: i64,
        user_id: i64,
        content: &str,
        formatted_content: Option<&str>,
        files: &[NewFile],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            let now = Utc::now();
            tx.execute(
                "INSERT INTO messages (channel_id, user_id, content, formatted_content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![channel_id, user_id, content, formatted_content, now],
            )?;
            let message_id = tx.last_insert_rowid();
            for file in files {
                insert_attachment(tx, message_id, file)?;
            }
            Ok(message_id)
        })
    }

    pub fn get_message_row(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message_row(conn, id))
    }

    /// Fully projected message (author, attachments, reactions).
    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        self.with_conn(|conn| {
            let Some(row) = query_message_row(conn, id)? else {
                return Ok(None);
            };
            Ok(hydrate_messages(conn, vec![row])?.pop())
        })
    }

    /// All messages of a channel, oldest first.
    pub fn channel_messages(&self, channel_id: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM messages WHERE channel_id = ?1 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([channel_id], MessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_messages(conn, rows)
        })
    }

    /// Replace content, stamp `edited_at`; formatting/mentions only when given.
    pub fn update_message(
        &self,
        id: i64,
        content: &str,
        formatting: Option<&str>,
        mentions: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET
                    content = ?2,
                    edited_at = ?3,
                    formatting = COALESCE(?4, formatting),
                    mentions = COALESCE(?5, mentions)
                 WHERE id = ?1",
                params![id, content, Utc::now(), formatting, mentions],
            )?;
            Ok(())
        })
    }

    /// Hard delete; threads, reactions, attachments, pins, bookmarks and
    /// permalinks go with it.
    pub fn delete_message(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn add_message_attachment(&self, message_id: i64, file: &NewFile) -> Result<Attachment> {
        self.with_conn(|conn| {
            let id = insert_attachment(conn, message_id, file)?;
            Ok(conn.query_row("SELECT * FROM attachments WHERE id = ?1", [id], attachment_from_row)?)
        })
    }

    // -- Threads --

    pub fn insert_thread(&self, parent_message_id: i64, user_id: i64, content: &str) -> Result<Thread> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO threads (parent_message_id, user_id, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![parent_message_id, user_id, content, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row("SELECT * FROM threads WHERE id = ?1", [id], ThreadRow::from_row)?;
            Ok(hydrate_threads(conn, vec![row])?.remove(0))
        })
    }

    pub fn get_thread_row(&self, id: i64) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM threads WHERE id = ?1", [id], ThreadRow::from_row)
                .optional()?)
        })
    }

    pub fn get_thread(&self, id: i64) -> Result<Option<Thread>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row("SELECT * FROM threads WHERE id = ?1", [id], ThreadRow::from_row)
                .optional()?;
            match row {
                Some(row) => Ok(hydrate_threads(conn, vec![row])?.pop()),
                None => Ok(None),
            }
        })
    }

    /// Replies to a message, oldest first.
    pub fn list_threads(&self, parent_message_id: i64) -> Result<Vec<Thread>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM threads WHERE parent_message_id = ?1 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([parent_message_id], ThreadRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_threads(conn, rows)
        })
    }

    pub fn update_thread(&self, id: i64, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE threads SET content = ?2, edited_at = ?3 WHERE id = ?1",
                params![id, content, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn delete_thread(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM threads WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Reactions --

    /// Fails with a unique violation if the user already reacted with `emoji`.
    pub fn insert_reaction(&self, message_id: i64, user_id: i64, emoji: &str) -> Result<Reaction> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reactions (message_id, user_id, emoji, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![message_id, user_id, emoji, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM reactions WHERE id = ?1", [id], reaction_from_row)?)
        })
    }

    pub fn has_reacted(&self, message_id: i64, user_id: i64, emoji: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                    params![message_id, user_id, emoji],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn get_reaction(&self, id: i64) -> Result<Option<Reaction>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM reactions WHERE id = ?1", [id], reaction_from_row)
                .optional()?)
        })
    }

    pub fn list_reactions(&self, message_id: i64) -> Result<Vec<Reaction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM reactions WHERE message_id = ?1 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([message_id], reaction_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn delete_reaction(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM reactions WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

pub(crate) fn query_message_row(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    Ok(conn
        .query_row("SELECT * FROM messages WHERE id = ?1", [id], MessageRow::from_row)
        .optional()?)
}

pub(crate) fn insert_attachment(conn: &Connection, message_id: i64, file: &NewFile) -> Result<i64> {
    conn.execute(
        "INSERT INTO attachments (message_id, filename, file_path, file_type, file_size, mime_type, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message_id,
            file.filename,
            file.file_path,
            file.file_type,
            file.file_size,
            file.mime_type,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        filename: row.get("filename")?,
        file_path: row.get("file_path")?,
        file_type: row.get("file_type")?,
        file_size: row.get("file_size")?,
        mime_type: row.get("mime_type")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}

fn reaction_from_row(row: &Row<'_>) -> rusqlite::Result<Reaction> {
    Ok(Reaction {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        user_id: row.get("user_id")?,
        emoji: row.get("emoji")?,
        timestamp: row.get("timestamp")?,
    })
}

/// Batch-load authors, attachments and reactions for a page of messages.
pub(crate) fn hydrate_messages(conn: &Connection, rows: Vec<MessageRow>) -> Result<Vec<Message>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let message_ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
    let mut author_ids: Vec<i64> = rows.iter().map(|m| m.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = users_by_ids(conn, &author_ids)?;

    let in_list = placeholders(message_ids.len());

    let mut attachments: HashMap<i64, Vec<Attachment>> = HashMap::new();
    {
        let sql = format!(
            "SELECT * FROM attachments WHERE message_id IN ({}) ORDER BY id",
            in_list
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params_from_iter(message_ids.iter()), attachment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for a in list {
            attachments.entry(a.message_id).or_default().push(a);
        }
    }

    // message_id -> emoji -> user_ids, emoji order by first use
    let mut reactions: HashMap<i64, Vec<ReactionGroup>> = HashMap::new();
    {
        let sql = format!(
            "SELECT * FROM reactions WHERE message_id IN ({}) ORDER BY id",
            in_list
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params_from_iter(message_ids.iter()), reaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for r in list {
            let groups = reactions.entry(r.message_id).or_default();
            match groups.iter_mut().find(|g| g.emoji == r.emoji) {
                Some(group) => {
                    group.count += 1;
                    group.user_ids.push(r.user_id);
                }
                None => groups.push(ReactionGroup {
                    emoji: r.emoji,
                    count: 1,
                    user_ids: vec![r.user_id],
                }),
            }
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| Message {
            attachments: attachments.remove(&row.id).unwrap_or_default(),
            reactions: reactions.remove(&row.id).unwrap_or_default(),
            user: authors.get(&row.user_id).map(|u| u.to_summary()),
            id: row.id,
            channel_id: row.channel_id,
            user_id: row.user_id,
            content: row.content,
            timestamp: row.timestamp,
            edited_at: row.edited_at,
            is_deleted: row.is_deleted,
            is_system_message: row.is_system_message,
            formatted_content: row.formatted_content,
            formatting: row.formatting,
            mentions: row.mentions,
        })
        .collect())
}

fn hydrate_threads(conn: &Connection, rows: Vec<ThreadRow>) -> Result<Vec<Thread>> {
    let mut ids: Vec<i64> = rows.iter().map(|t| t.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let authors = users_by_ids(conn, &ids)?;
    Ok(rows
        .into_iter()
        .map(|row| Thread {
            user: authors.get(&row.user_id).map(|u| u.to_summary()),
            id: row.id,
            parent_message_id: row.parent_message_id,
            user_id: row.user_id,
            content: row.content,
            timestamp: row.timestamp,
            edited_at: row.edited_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::is_unique_violation;
    use crate::models::NewFile;
    use crate::queries::fixtures;

    #[test]
    fn channel_messages_are_oldest_first_with_authors() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        db.insert_message(cid, alice, "one", None, false).unwrap();
        db.insert_message(cid, alice, "two", None, false).unwrap();

        let msgs = db.channel_messages(cid).unwrap();
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert_eq!(msgs[0].user.as_ref().unwrap().username, "alice");
    }

    #[test]
    fn reactions_are_grouped_by_emoji() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let cid = fixtures::channel(&db, "general", false, alice);
        let mid = db.insert_message(cid, alice, "hi", None, false).unwrap();

        db.insert_reaction(mid, alice, "👍").unwrap();
        db.insert_reaction(mid, bob, "👍").unwrap();
        db.insert_reaction(mid, bob, "🎉").unwrap();

        let msg = db.get_message(mid).unwrap().unwrap();
        assert_eq!(msg.reactions.len(), 2);
        assert_eq!(msg.reactions[0].emoji, "👍");
        assert_eq!(msg.reactions[0].count, 2);
        assert_eq!(msg.reactions[0].user_ids, vec![alice, bob]);
    }

    #[test]
    fn duplicate_reaction_is_a_unique_violation() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        let mid = db.insert_message(cid, alice, "hi", None, false).unwrap();

        db.insert_reaction(mid, alice, "👍").unwrap();
        let err = db.insert_reaction(mid, alice, "👍").unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn edit_sets_edited_at_and_keeps_formatting() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        let mid = db.insert_message(cid, alice, "hi", None, false).unwrap();

        db.update_message(mid, "hello", Some("{}"), None).unwrap();
        db.update_message(mid, "hello again", None, Some("[2]")).unwrap();
        let row = db.get_message_row(mid).unwrap().unwrap();
        assert_eq!(row.content, "hello again");
        assert_eq!(row.formatting.as_deref(), Some("{}"));
        assert_eq!(row.mentions.as_deref(), Some("[2]"));
        assert!(row.edited_at.is_some());
    }

    #[test]
    fn delete_cascades_to_children() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let cid = fixtures::channel(&db, "general", false, alice);
        let file = NewFile {
            filename: "a.txt".into(),
            file_path: "messages/x.txt".into(),
            file_type: "document".into(),
            file_size: 3,
            mime_type: Some("text/plain".into()),
        };
        let mid = db
            .insert_message_with_files(cid, alice, "hi", None, std::slice::from_ref(&file))
            .unwrap();
        let thread = db.insert_thread(mid, alice, "reply").unwrap();
        let reaction = db.insert_reaction(mid, alice, "👍").unwrap();
        assert_eq!(db.get_message(mid).unwrap().unwrap().attachments.len(), 1);

        db.delete_message(mid).unwrap();
        assert!(db.get_thread_row(thread.id).unwrap().is_none());
        assert!(db.get_reaction(reaction.id).unwrap().is_none());
        assert!(db.message_attachments(mid).unwrap().is_empty());
    }
}
