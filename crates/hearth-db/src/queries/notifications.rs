use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use hearth_types::models::Notification;

use crate::Database;
use crate::models::NewNotification;

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        notification_type: row.get("notification_type")?,
        title: row.get("title")?,
        message: row.get("message")?,
        source_type: row.get("source_type")?,
        source_id: row.get("source_id")?,
        data: row.get("data")?,
        is_read: row.get("is_read")?,
        created_at: row.get("created_at")?,
        read_at: row.get("read_at")?,
    })
}

pub(crate) fn insert_notification(conn: &Connection, n: &NewNotification<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, notification_type, title, message, source_type, source_id, data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            n.user_id,
            n.notification_type,
            n.title,
            n.message,
            n.source_type,
            n.source_id,
            n.data,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub fn create_notification(&self, n: &NewNotification<'_>) -> Result<i64> {
        self.with_conn(|conn| insert_notification(conn, n))
    }

    /// Newest first.
    pub fn list_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM notifications
                 WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3 OFFSET ?4",
            )?;
            let rows = stmt
                .query_map(params![user_id, unread_only, limit, skip], notification_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |r| r.get(0),
            )?)
        })
    }

    /// Mark one of `user_id`'s notifications read. `None` if it is not theirs.
    pub fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<Option<Notification>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?3)
                 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id, Utc::now()],
            )?;
            Ok(conn
                .query_row(
                    "SELECT * FROM notifications WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                    notification_from_row,
                )
                .optional()?)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1, read_at = ?2 WHERE user_id = ?1 AND is_read = 0",
                params![user_id, Utc::now()],
            )?)
        })
    }

    pub fn delete_notification(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn clear_notifications(&self, user_id: i64) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])?))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NewNotification;
    use crate::queries::fixtures;

    fn notify(db: &crate::Database, user_id: i64, title: &str) -> i64 {
        db.create_notification(&NewNotification {
            user_id,
            notification_type: "dm",
            title,
            message: "body",
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn read_state_and_ownership() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let first = notify(&db, alice, "first");
        notify(&db, alice, "second");

        assert_eq!(db.unread_notification_count(alice).unwrap(), 2);
        assert!(db.mark_notification_read(first, bob).unwrap().is_none());

        let read = db.mark_notification_read(first, alice).unwrap().unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        let unread = db.list_notifications(alice, true, 0, 50).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "second");

        assert_eq!(db.mark_all_notifications_read(alice).unwrap(), 1);
        assert_eq!(db.unread_notification_count(alice).unwrap(), 0);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let id = notify(&db, alice, "x");
        assert!(!db.delete_notification(id, bob).unwrap());
        assert!(db.delete_notification(id, alice).unwrap());
        notify(&db, alice, "y");
        assert_eq!(db.clear_notifications(alice).unwrap(), 1);
    }
}
