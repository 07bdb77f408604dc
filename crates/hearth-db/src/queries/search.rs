//! Case-insensitive substring search. `instr` is used instead of `LIKE` so
//! that `%` and `_` in queries match literally.

use anyhow::Result;
use rusqlite::params;

use hearth_types::models::{DirectMessage, Message};

use crate::Database;
use crate::models::{ChannelRow, DirectMessageRow, MessageRow, UserRow};
use crate::queries::direct_messages::hydrate_dms;
use crate::queries::messages::hydrate_messages;

impl Database {
    /// Accounts whose username, email or display name contains `q`.
    pub fn search_users(&self, q: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM users
                 WHERE instr(lower(username), lower(?1)) > 0
                    OR instr(lower(email), lower(?1)) > 0
                    OR instr(lower(COALESCE(full_name, '')), lower(?1)) > 0
                    OR instr(lower(COALESCE(name, '')), lower(?1)) > 0
                 ORDER BY username",
            )?;
            let rows = stmt
                .query_map([q], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Public channels matching `q`, plus private ones `user_id` belongs to
    /// when `include_private` is set.
    pub fn search_channels(&self, user_id: i64, q: &str, include_private: bool) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM channels c
                 WHERE (instr(lower(c.name), lower(?2)) > 0
                        OR instr(lower(COALESCE(c.description, '')), lower(?2)) > 0
                        OR instr(lower(COALESCE(c.topic, '')), lower(?2)) > 0)
                   AND (c.is_private = 0
                        OR (?3 = 1 AND EXISTS (SELECT 1 FROM channel_members m
                                               WHERE m.channel_id = c.id AND m.user_id = ?1)))
                 ORDER BY c.name",
            )?;
            let rows = stmt
                .query_map(params![user_id, q, include_private], ChannelRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Non-deleted messages in channels `user_id` belongs to, newest first.
    pub fn search_messages(&self, user_id: i64, q: &str, channel_id: Option<i64>) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT msg.* FROM messages msg
                 JOIN channel_members m ON m.channel_id = msg.channel_id AND m.user_id = ?1
                 WHERE msg.is_deleted = 0
                   AND instr(lower(msg.content), lower(?2)) > 0
                   AND (?3 IS NULL OR msg.channel_id = ?3)
                 ORDER BY msg.timestamp DESC, msg.id DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id, q, channel_id], MessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_messages(conn, rows)
        })
    }

    /// Non-deleted DMs `user_id` sent or received, optionally with one
    /// counterpart, newest first.
    pub fn search_direct_messages(
        &self,
        user_id: i64,
        q: &str,
        other_id: Option<i64>,
    ) -> Result<Vec<DirectMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM direct_messages
                 WHERE is_deleted = 0
                   AND instr(lower(content), lower(?2)) > 0
                   AND ((sender_id = ?1 AND (?3 IS NULL OR receiver_id = ?3))
                        OR (receiver_id = ?1 AND (?3 IS NULL OR sender_id = ?3)))
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id, q, other_id], DirectMessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            hydrate_dms(conn, rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn message_search_only_covers_member_channels() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let general = fixtures::channel(&db, "general", false, alice);
        let secret = fixtures::channel(&db, "secret", true, alice);
        db.insert_message(general, alice, "Launch day", None, false).unwrap();
        db.insert_message(secret, alice, "launch codes", None, false).unwrap();

        assert_eq!(db.search_messages(alice, "LAUNCH", None).unwrap().len(), 2);
        assert_eq!(db.search_messages(alice, "launch", Some(general)).unwrap().len(), 1);
        assert!(db.search_messages(bob, "launch", None).unwrap().is_empty());
    }

    #[test]
    fn private_channels_need_membership_and_opt_in() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        fixtures::channel(&db, "team-a", false, alice);
        fixtures::channel(&db, "team-b", true, alice);

        assert_eq!(db.search_channels(alice, "team", true).unwrap().len(), 2);
        assert_eq!(db.search_channels(alice, "team", false).unwrap().len(), 1);
        assert_eq!(db.search_channels(bob, "team", true).unwrap().len(), 1);
    }

    #[test]
    fn wildcards_match_literally() {
        let db = fixtures::db();
        fixtures::user(&db, "a_b");
        fixtures::user(&db, "axb");
        let hits = db.search_users("a_").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "a_b");
    }

    #[test]
    fn dm_search_is_scoped_to_participant() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let carol = fixtures::user(&db, "carol");
        db.insert_direct_message(alice, bob, "lunch?", None, &[]).unwrap();
        db.insert_direct_message(carol, bob, "lunch at noon", None, &[]).unwrap();

        assert_eq!(db.search_direct_messages(bob, "lunch", None).unwrap().len(), 2);
        assert_eq!(db.search_direct_messages(bob, "lunch", Some(carol)).unwrap().len(), 1);
        assert_eq!(db.search_direct_messages(alice, "lunch", None).unwrap().len(), 1);
    }
}
