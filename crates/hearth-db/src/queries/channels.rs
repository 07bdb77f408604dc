use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use hearth_types::models::{Channel, User};

use crate::models::{ChannelInvite, ChannelRow, NewActivity, NewNotification, UserRow};
use crate::queries::activities::insert_activity;
use crate::queries::notifications::insert_notification;
use crate::{Database, placeholders};

impl Database {
    /// Create a channel with the creator as first member. `members` ids that
    /// do not name an account are skipped.
    pub fn create_channel(
        &self,
        name: &str,
        description: Option<&str>,
        is_private: bool,
        created_by: i64,
        members: &[i64],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO channels (name, description, is_private, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, description, is_private, created_by, Utc::now()],
            )?;
            let channel_id = tx.last_insert_rowid();

            let mut add = tx.prepare(
                "INSERT OR IGNORE INTO channel_members (channel_id, user_id)
                 SELECT ?1, id FROM users WHERE id = ?2",
            )?;
            add.execute(params![channel_id, created_by])?;
            for member in members {
                add.execute(params![channel_id, member])?;
            }
            Ok(channel_id)
        })
    }

    pub fn get_channel(&self, id: i64) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    pub fn get_channel_by_name(&self, name: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM channels WHERE name = ?1", [name], ChannelRow::from_row)
                .optional()?)
        })
    }

    /// Channel with its member list.
    pub fn get_channel_full(&self, id: i64) -> Result<Option<Channel>> {
        self.with_conn(|conn| {
            let Some(row) = query_channel(conn, id)? else {
                return Ok(None);
            };
            Ok(hydrate_channels(conn, vec![row])?.pop())
        })
    }

    pub fn list_public_channels(&self) -> Result<Vec<Channel>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM channels WHERE is_private = 0 ORDER BY name")?;
            let rows = stmt
                .query_map([], ChannelRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_channels(conn, rows)
        })
    }

    /// Channels `user_id` belongs to, public and private.
    pub fn list_user_channels(&self, user_id: i64) -> Result<Vec<Channel>> {
        self.with_conn(|conn| {
            let rows = member_channel_rows(conn, user_id)?;
            hydrate_channels(conn, rows)
        })
    }

    pub fn channel_members(&self, channel_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.* FROM channel_members m JOIN users u ON u.id = m.user_id
                 WHERE m.channel_id = ?1 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([channel_id], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| is_member(conn, channel_id, user_id))
    }

    pub fn add_member(&self, channel_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channel_members (channel_id, user_id) VALUES (?1, ?2)",
                params![channel_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Adds the invitee and records the invite in one transaction. Returns
    /// the id of the system message.
    pub fn invite_member(&self, invite: &ChannelInvite<'_>) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO channel_members (channel_id, user_id) VALUES (?1, ?2)",
                params![invite.channel_id, invite.invitee_id],
            )?;
            tx.execute(
                "INSERT INTO messages (channel_id, user_id, content, is_system_message, timestamp)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![invite.channel_id, invite.inviter_id, invite.system_text, Utc::now()],
            )?;
            let message_id = tx.last_insert_rowid();

            insert_activity(
                tx,
                &NewActivity {
                    user_id: invite.invitee_id,
                    activity_type: "invitation",
                    description: invite.description,
                    target_type: Some("channel"),
                    target_id: Some(invite.channel_id),
                    metadata: Some(serde_json::json!({ "invited_by": invite.inviter_id }).to_string()),
                },
            )?;
            insert_notification(
                tx,
                &NewNotification {
                    user_id: invite.invitee_id,
                    notification_type: "invite",
                    title: "Channel invitation",
                    message: invite.description,
                    source_type: Some("channel"),
                    source_id: Some(invite.channel_id),
                    data: Some(serde_json::json!({ "message_id": message_id }).to_string()),
                },
            )?;
            Ok(message_id)
        })
    }

    /// Returns false when `user_id` was not a member.
    pub fn remove_member(&self, channel_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
                params![channel_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn update_channel(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_private: Option<bool>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE channels SET
                    name = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    is_private = COALESCE(?4, is_private)
                 WHERE id = ?1",
                params![id, name, description, is_private],
            )?;
            Ok(())
        })
    }

    pub fn delete_channel(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM channels WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Set topic and/or purpose. A new topic records who set it and when.
    pub fn set_topic(
        &self,
        id: i64,
        topic: Option<&str>,
        purpose: Option<&str>,
        set_by: i64,
    ) -> Result<()> {
        self.with_tx(|tx| {
            if let Some(topic) = topic {
                tx.execute(
                    "UPDATE channels SET topic = ?2, topic_set_by = ?3, topic_set_at = ?4 WHERE id = ?1",
                    params![id, topic, set_by, Utc::now()],
                )?;
            }
            if let Some(purpose) = purpose {
                tx.execute("UPDATE channels SET purpose = ?2 WHERE id = ?1", params![id, purpose])?;
            }
            Ok(())
        })
    }

    pub fn set_section(&self, id: i64, section: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE channels SET section = ?2 WHERE id = ?1", params![id, section])?;
            Ok(())
        })
    }
}

pub(crate) fn query_channel(conn: &Connection, id: i64) -> Result<Option<ChannelRow>> {
    Ok(conn
        .query_row("SELECT * FROM channels WHERE id = ?1", [id], ChannelRow::from_row)
        .optional()?)
}

pub(crate) fn is_member(conn: &Connection, channel_id: i64, user_id: i64) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
            params![channel_id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub(crate) fn member_channel_rows(conn: &Connection, user_id: i64) -> Result<Vec<ChannelRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.* FROM channels c JOIN channel_members m ON m.channel_id = c.id
         WHERE m.user_id = ?1 ORDER BY c.name",
    )?;
    let rows = stmt
        .query_map([user_id], ChannelRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Attach member lists to channel rows with one extra query.
fn hydrate_channels(conn: &Connection, rows: Vec<ChannelRow>) -> Result<Vec<Channel>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
    let sql = format!(
        "SELECT m.channel_id AS member_of, u.* FROM channel_members m JOIN users u ON u.id = m.user_id
         WHERE m.channel_id IN ({}) ORDER BY u.username",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut members: HashMap<i64, Vec<User>> = HashMap::new();
    let pairs = stmt
        .query_map(params_from_iter(ids.iter()), |row| {
            Ok((row.get::<_, i64>("member_of")?, UserRow::from_row(row)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (channel_id, user) in pairs {
        members.entry(channel_id).or_default().push(user.to_user());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let list = members.remove(&row.id).unwrap_or_default();
            row.into_channel(list)
        })
        .collect())
}
