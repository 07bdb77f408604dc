use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use hearth_types::models::{Conversation, DirectMessage, DmAttachment};

use crate::models::{DirectMessageRow, NewFile};
use crate::queries::users::users_by_ids;
use crate::{Database, placeholders};

impl Database {
    pub fn insert_direct_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        formatted_content: Option<&str>,
        files: &[NewFile],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO direct_messages (sender_id, receiver_id, content, formatted_content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![sender_id, receiver_id, content, formatted_content, Utc::now()],
            )?;
            let dm_id = tx.last_insert_rowid();
            for file in files {
                insert_dm_attachment(tx, dm_id, file)?;
            }
            Ok(dm_id)
        })
    }

    pub fn get_direct_message_row(&self, id: i64) -> Result<Option<DirectMessageRow>> {
        self.with_conn(|conn| query_dm_row(conn, id))
    }

    pub fn get_direct_message(&self, id: i64) -> Result<Option<DirectMessage>> {
        self.with_conn(|conn| {
            let Some(row) = query_dm_row(conn, id)? else {
                return Ok(None);
            };
            Ok(hydrate_dms(conn, vec![row])?.pop())
        })
    }

    /// Both directions between `user_id` and `other_id`, oldest first.
    /// Messages addressed to `user_id` are marked read in the same transaction.
    pub fn read_conversation(&self, user_id: i64, other_id: i64) -> Result<Vec<DirectMessage>> {
        self.with_tx(|tx| {
            tx.execute(
                "UPDATE direct_messages SET is_read = 1
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                params![other_id, user_id],
            )?;
            let mut stmt = tx.prepare(
                "SELECT * FROM direct_messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![user_id, other_id], DirectMessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_dms(tx, rows)
        })
    }

    /// One entry per counterpart, newest conversation first.
    pub fn list_conversations(&self, user_id: i64) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM direct_messages
                 WHERE sender_id = ?1 OR receiver_id = ?1
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], DirectMessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            // First row per counterpart is the latest, since rows are newest first.
            let mut latest: Vec<DirectMessageRow> = Vec::new();
            let mut unread: HashMap<i64, i64> = HashMap::new();
            for row in rows {
                let other = row.counterpart(user_id);
                if row.receiver_id == user_id && !row.is_read {
                    *unread.entry(other).or_default() += 1;
                }
                if !latest.iter().any(|l| l.counterpart(user_id) == other) {
                    latest.push(row);
                }
            }

            let others: Vec<i64> = latest.iter().map(|r| r.counterpart(user_id)).collect();
            let users = users_by_ids(conn, &others)?;
            let last_messages = hydrate_dms(conn, latest)?;

            Ok(last_messages
                .into_iter()
                .filter_map(|dm| {
                    let other = if dm.sender_id == user_id { dm.receiver_id } else { dm.sender_id };
                    let user = users.get(&other)?;
                    Some(Conversation {
                        user_id: user.id,
                        username: user.username.clone(),
                        profile_picture: user.profile_picture.clone(),
                        status: user.status.clone(),
                        unread_count: unread.get(&other).copied().unwrap_or(0),
                        last_message: Some(dm),
                    })
                })
                .collect())
        })
    }

    pub fn update_direct_message(
        &self,
        id: i64,
        content: &str,
        formatting: Option<&str>,
        mentions: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE direct_messages SET
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

    pub fn delete_direct_message(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM direct_messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn mark_direct_message_read(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE direct_messages SET is_read = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn add_dm_attachment(&self, direct_message_id: i64, file: &NewFile) -> Result<DmAttachment> {
        self.with_conn(|conn| {
            let id = insert_dm_attachment(conn, direct_message_id, file)?;
            Ok(conn.query_row("SELECT * FROM dm_attachments WHERE id = ?1", [id], dm_attachment_from_row)?)
        })
    }
}

pub(crate) fn query_dm_row(conn: &Connection, id: i64) -> Result<Option<DirectMessageRow>> {
    Ok(conn
        .query_row(
            "SELECT * FROM direct_messages WHERE id = ?1",
            [id],
            DirectMessageRow::from_row,
        )
        .optional()?)
}

fn insert_dm_attachment(conn: &Connection, direct_message_id: i64, file: &NewFile) -> Result<i64> {
    conn.execute(
        "INSERT INTO dm_attachments (direct_message_id, filename, file_path, file_type, file_size, mime_type, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            direct_message_id,
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

pub(crate) fn dm_attachment_from_row(row: &Row<'_>) -> rusqlite::Result<DmAttachment> {
    Ok(DmAttachment {
        id: row.get("id")?,
        direct_message_id: row.get("direct_message_id")?,
        filename: row.get("filename")?,
        file_path: row.get("file_path")?,
        file_type: row.get("file_type")?,
        file_size: row.get("file_size")?,
        mime_type: row.get("mime_type")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}

pub(crate) fn hydrate_dms(conn: &Connection, rows: Vec<DirectMessageRow>) -> Result<Vec<DirectMessage>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let sql = format!(
        "SELECT * FROM dm_attachments WHERE direct_message_id IN ({}) ORDER BY id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut files: HashMap<i64, Vec<DmAttachment>> = HashMap::new();
    for a in stmt
        .query_map(params_from_iter(ids.iter()), dm_attachment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
    {
        files.entry(a.direct_message_id).or_default().push(a);
    }

    Ok(rows
        .into_iter()
        .map(|row| DirectMessage {
            dm_attachments: files.remove(&row.id).unwrap_or_default(),
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            timestamp: row.timestamp,
            is_read: row.is_read,
            edited_at: row.edited_at,
            is_deleted: row.is_deleted,
            formatted_content: row.formatted_content,
            formatting: row.formatting,
            mentions: row.mentions,
        })
        .collect())
}
