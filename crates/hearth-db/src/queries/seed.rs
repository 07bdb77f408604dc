//! Inserts with caller-chosen ids, used only by the bootstrap loader.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::Database;
use crate::models::NewUser;
use crate::queries::users::insert_user;

/// Writes inside the bootstrap transaction. Obtained from [`Database::seed`].
pub struct Seeder<'c> {
    conn: &'c Connection,
}

impl Database {
    /// Runs `f` in one transaction; any error rolls back every row it wrote,
    /// so a failed bootstrap leaves the database empty for the next start.
    pub fn seed<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Seeder<'_>) -> Result<()>,
    {
        self.with_tx(|tx| f(&Seeder { conn: tx }))
    }
}

impl Seeder<'_> {
    pub fn user(&self, user: &NewUser<'_>) -> Result<i64> {
        insert_user(self.conn, user)
    }

    pub fn channel(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        is_private: bool,
        created_by: i64,
        members: &[i64],
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO channels (id, name, description, is_private, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, description, is_private, created_by, Utc::now()],
        )?;
        let mut add = self.conn.prepare(
            "INSERT OR IGNORE INTO channel_members (channel_id, user_id)
             SELECT ?1, id FROM users WHERE id = ?2",
        )?;
        add.execute(params![id, created_by])?;
        for member in members {
            add.execute(params![id, member])?;
        }
        Ok(())
    }

    pub fn message(
        &self,
        id: i64,
        channel_id: i64,
        user_id: i64,
        content: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO messages (id, channel_id, user_id, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, channel_id, user_id, content, timestamp.unwrap_or_else(Utc::now)],
        )?;
        Ok(())
    }

    pub fn direct_message(
        &self,
        id: i64,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        is_read: bool,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO direct_messages (id, sender_id, receiver_id, content, is_read, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, sender_id, receiver_id, content, is_read, timestamp.unwrap_or_else(Utc::now)],
        )?;
        Ok(())
    }

    pub fn group(
        &self,
        id: i64,
        name: &str,
        handle: &str,
        description: Option<&str>,
        created_by: i64,
        members: &[i64],
    ) -> Result<()> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO user_groups (id, name, handle, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, handle, description, created_by, now],
        )?;
        let mut add = self.conn.prepare(
            "INSERT OR IGNORE INTO user_group_members (group_id, user_id, added_at)
             SELECT ?1, id, ?3 FROM users WHERE id = ?2",
        )?;
        for member in members {
            add.execute(params![id, member, now])?;
        }
        Ok(())
    }

    pub fn contact(&self, user_id: i64, contact_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO contacts (user_id, contact_id) VALUES (?1, ?2)",
            params![user_id, contact_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NewUser;
    use crate::queries::fixtures;

    fn john() -> NewUser<'static> {
        NewUser {
            id: Some(7),
            username: "john",
            email: "john@example.com",
            password_hash: "x",
            status: "offline",
            ..Default::default()
        }
    }

    #[test]
    fn seeded_ids_are_kept_verbatim() {
        let db = fixtures::db();
        db.seed(|s| {
            s.user(&john())?;
            s.channel(3, "general", None, false, 7, &[])?;
            s.message(11, 3, 7, "welcome", None)?;
            s.group(5, "Staff", "staff", None, 7, &[7])?;
            Ok(())
        })
        .unwrap();

        assert!(db.is_member(3, 7).unwrap());
        assert_eq!(db.get_message_row(11).unwrap().unwrap().content, "welcome");
        assert_eq!(db.get_group(5).unwrap().unwrap().member_count, 1);

        // AUTOINCREMENT continues after the seeded id
        let next = fixtures::user(&db, "jane");
        assert!(next > 7);
    }

    #[test]
    fn failed_seed_leaves_no_rows() {
        let db = fixtures::db();
        let result = db.seed(|s| {
            s.user(&john())?;
            // author 99 does not exist
            s.channel(3, "general", None, false, 7, &[])?;
            s.message(11, 3, 99, "orphan", None)?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(db.count_users().unwrap(), 0);
        assert!(db.get_channel(3).unwrap().is_none());
    }
}
