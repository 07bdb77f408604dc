use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use hearth_types::models::{Activity, FeedActivity};

use crate::Database;
use crate::models::NewActivity;

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        activity_type: row.get("activity_type")?,
        description: row.get("description")?,
        target_type: row.get("target_type")?,
        target_id: row.get("target_id")?,
        metadata: row.get("metadata")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn insert_activity(conn: &Connection, a: &NewActivity<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO activities (user_id, activity_type, description, target_type, target_id, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            a.user_id,
            a.activity_type,
            a.description,
            a.target_type,
            a.target_id,
            a.metadata,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub fn create_activity(&self, a: &NewActivity<'_>) -> Result<i64> {
        self.with_conn(|conn| insert_activity(conn, a))
    }

    /// `user_id`'s activities created at or after `since`, newest first.
    pub fn list_activities(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Activity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM activities WHERE user_id = ?1 AND created_at >= ?2
                 ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4",
            )?;
            let rows = stmt
                .query_map(params![user_id, since, limit, skip], activity_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Workspace-wide feed with the owning account's username.
    pub fn activity_feed(&self, skip: i64, limit: i64) -> Result<Vec<FeedActivity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.*, u.username AS username FROM activities a JOIN users u ON u.id = a.user_id
                 ORDER BY a.created_at DESC, a.id DESC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit, skip], |row| {
                    Ok(FeedActivity {
                        activity: activity_from_row(row)?,
                        username: row.get("username")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::models::NewActivity;
    use crate::queries::fixtures;

    #[test]
    fn window_and_feed() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        db.create_activity(&NewActivity {
            user_id: alice,
            activity_type: "mention",
            description: "bob mentioned you",
            ..Default::default()
        })
        .unwrap();

        let week_ago = Utc::now() - Duration::days(7);
        assert_eq!(db.list_activities(alice, week_ago, 0, 50).unwrap().len(), 1);
        let future = Utc::now() + Duration::days(1);
        assert!(db.list_activities(alice, future, 0, 50).unwrap().is_empty());

        let feed = db.activity_feed(0, 50).unwrap();
        assert_eq!(feed[0].username, "alice");
        assert_eq!(feed[0].activity.activity_type, "mention");
    }
}
