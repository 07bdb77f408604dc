use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::models::{NewUser, UserRow};
use crate::{Database, placeholders};

pub(crate) fn insert_user(conn: &Connection, user: &NewUser<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, status, full_name, name, profile_picture, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, ?8)",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.status,
            user.full_name,
            user.profile_picture,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    // -- Accounts --

    /// Insert an account and return its id.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<i64> {
        self.with_conn(|conn| insert_user(conn, user))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM users WHERE username = ?1",
                    [username],
                    UserRow::from_row,
                )
                .optional()?)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM users WHERE email = ?1", [email], UserRow::from_row)
                .optional()?)
        })
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| user_exists(conn, id))
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }

    /// All accounts, optionally filtered by a case-insensitive substring of
    /// username or email and by exact status.
    pub fn list_users(&self, search: Option<&str>, status: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM users
                 WHERE (?1 IS NULL OR instr(lower(username), lower(?1)) > 0 OR instr(lower(email), lower(?1)) > 0)
                   AND (?2 IS NULL OR status = ?2)
                 ORDER BY username",
            )?;
            let rows = stmt
                .query_map(params![search, status], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Directory listing: every account except `user_id`.
    pub fn list_directory(&self, user_id: i64, search: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM users
                 WHERE id != ?1
                   AND (?2 IS NULL
                        OR instr(lower(username), lower(?2)) > 0
                        OR instr(lower(email), lower(?2)) > 0
                        OR instr(lower(COALESCE(full_name, '')), lower(?2)) > 0)
                 ORDER BY username",
            )?;
            let rows = stmt
                .query_map(params![user_id, search], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch accounts keyed by id.
    pub fn users_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, UserRow>> {
        self.with_conn(|conn| users_by_ids(conn, ids))
    }

    // -- Account updates --

    /// Partial update of the account fields. `None` keeps the stored value.
    pub fn update_account(
        &self,
        id: i64,
        username: Option<&str>,
        email: Option<&str>,
        status: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    username = COALESCE(?2, username),
                    email = COALESCE(?3, email),
                    status = COALESCE(?4, status),
                    profile_picture = COALESCE(?5, profile_picture),
                    updated_at = ?6
                 WHERE id = ?1",
                params![id, username, email, status, profile_picture, Utc::now()],
            )?;
            Ok(())
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_profile(
        &self,
        id: i64,
        full_name: Option<&str>,
        job_title: Option<&str>,
        phone: Option<&str>,
        timezone: Option<&str>,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    full_name = COALESCE(?2, full_name),
                    name = COALESCE(?2, name),
                    job_title = COALESCE(?3, job_title),
                    phone = COALESCE(?4, phone),
                    timezone = COALESCE(?5, timezone),
                    bio = COALESCE(?6, bio),
                    profile_picture = COALESCE(?7, profile_picture),
                    updated_at = ?8
                 WHERE id = ?1",
                params![id, full_name, job_title, phone, timezone, bio, profile_picture, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn set_presence(&self, id: i64, presence: &str) -> Result<()> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "UPDATE users SET presence = ?2, last_activity_at = ?3, updated_at = ?3 WHERE id = ?1",
                params![id, presence, now],
            )?;
            Ok(())
        })
    }

    /// Replace the custom status triple wholesale (`None` clears a field).
    pub fn set_custom_status(
        &self,
        id: i64,
        text: Option<&str>,
        emoji: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET status_text = ?2, status_emoji = ?3, status_expires_at = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![id, text, emoji, expires_at, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn update_preferences(
        &self,
        id: i64,
        theme: Option<&str>,
        notification_sound: Option<bool>,
        email_notifications: Option<bool>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    theme = COALESCE(?2, theme),
                    notification_sound = COALESCE(?3, notification_sound),
                    email_notifications = COALESCE(?4, email_notifications),
                    updated_at = ?5
                 WHERE id = ?1",
                params![id, theme, notification_sound, email_notifications, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn set_status(&self, id: i64, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status, Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Mark an account offline on both the status and presence axes.
    pub fn set_offline(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET status = 'offline', presence = 'offline', updated_at = ?2 WHERE id = ?1",
                params![id, Utc::now()],
            )?;
            Ok(())
        })
    }

    // -- Contacts --

    pub fn add_contact(&self, user_id: i64, contact_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contacts (user_id, contact_id) VALUES (?1, ?2)",
                params![user_id, contact_id],
            )?;
            Ok(())
        })
    }

    pub fn is_contact(&self, user_id: i64, contact_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                    params![user_id, contact_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn list_contacts(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.* FROM contacts c JOIN users u ON u.id = c.contact_id
                 WHERE c.user_id = ?1 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Returns false when `contact_id` was not in the list.
    pub fn remove_contact(&self, user_id: i64, contact_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                params![user_id, contact_id],
            )?;
            Ok(n > 0)
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    Ok(conn
        .query_row("SELECT * FROM users WHERE id = ?1", [id], UserRow::from_row)
        .optional()?)
}

pub(crate) fn user_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn users_by_ids(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, UserRow>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!("SELECT * FROM users WHERE id IN ({})", placeholders(ids.len()));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), UserRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().map(|u| (u.id, u)).collect())
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn search_is_case_insensitive_substring() {
        let db = fixtures::db();
        fixtures::user(&db, "Alice");
        fixtures::user(&db, "bob");

        let hits = db.list_users(Some("ALI"), None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "Alice");

        let by_email = db.list_users(Some("example.com"), None).unwrap();
        assert_eq!(by_email.len(), 2);
    }

    #[test]
    fn partial_update_keeps_unset_fields() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");
        db.update_account(id, None, Some("new@example.com"), None, None).unwrap();
        let row = db.get_user(id).unwrap().unwrap();
        assert_eq!(row.username, "alice");
        assert_eq!(row.email, "new@example.com");
        assert_eq!(row.status, "online");
    }

    #[test]
    fn summary_name_falls_back_to_username() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");
        assert_eq!(db.get_user(id).unwrap().unwrap().to_summary().name, "alice");

        db.update_profile(id, Some("Alice Liddell"), None, None, None, None, None).unwrap();
        assert_eq!(db.get_user(id).unwrap().unwrap().to_summary().name, "Alice Liddell");
    }

    #[test]
    fn offline_resets_status_and_presence() {
        let db = fixtures::db();
        let id = fixtures::user(&db, "alice");
        db.set_presence(id, "dnd").unwrap();
        db.set_offline(id).unwrap();
        let row = db.get_user(id).unwrap().unwrap();
        assert_eq!(row.status, "offline");
        assert_eq!(row.presence, "offline");
        assert!(row.last_activity_at.is_some());
    }

    #[test]
    fn contacts_round_trip() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "alice");
        let b = fixtures::user(&db, "bob");
        db.add_contact(a, b).unwrap();
        assert!(db.is_contact(a, b).unwrap());
        assert!(!db.is_contact(b, a).unwrap());
        assert_eq!(db.list_contacts(a).unwrap()[0].id, b);
        assert!(db.remove_contact(a, b).unwrap());
        assert!(!db.remove_contact(a, b).unwrap());
    }
}
