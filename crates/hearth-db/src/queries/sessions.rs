use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::SessionRow;

impl Database {
    pub fn create_session(
        &self,
        token: &str,
        user_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, created_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// Exact-token lookup. Expiry is not checked here.
    pub fn get_session(&self, token: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM sessions WHERE token = ?1",
                    [token],
                    SessionRow::from_row,
                )
                .optional()?)
        })
    }

    /// Returns true if a row was removed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(n > 0)
        })
    }

    pub fn count_sessions(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
                [user_id],
                |r| r.get(0),
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::queries::fixtures;

    #[test]
    fn session_expiry_is_exclusive() {
        let db = fixtures::db();
        let now = Utc::now();
        db.create_session("tok", 42, now - Duration::hours(1), now).unwrap();

        let row = db.get_session("tok").unwrap().unwrap();
        assert_eq!(row.user_id, 42);
        assert!(row.is_expired(now));
        assert!(!row.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn sessions_accumulate_and_delete_individually() {
        let db = fixtures::db();
        let now = Utc::now();
        db.create_session("a", 1, now, now + Duration::hours(1)).unwrap();
        db.create_session("b", 1, now, now + Duration::hours(1)).unwrap();
        assert_eq!(db.count_sessions(1).unwrap(), 2);

        assert!(db.delete_session("a").unwrap());
        assert!(!db.delete_session("a").unwrap());
        assert!(db.get_session("b").unwrap().is_some());
    }
}
