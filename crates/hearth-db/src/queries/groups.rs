use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::UserGroup;

use crate::Database;
use crate::models::UserRow;

const GROUP_COLUMNS: &str = "g.*, (SELECT COUNT(*) FROM user_group_members m WHERE m.group_id = g.id) AS member_count";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<UserGroup> {
    Ok(UserGroup {
        id: row.get("id")?,
        name: row.get("name")?,
        handle: row.get("handle")?,
        description: row.get("description")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        member_count: row.get("member_count")?,
    })
}

impl Database {
    /// Create a group. Unknown `member_ids` are skipped.
    pub fn create_group(
        &self,
        name: &str,
        handle: &str,
        description: Option<&str>,
        created_by: i64,
        member_ids: &[i64],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            let now = Utc::now();
            tx.execute(
                "INSERT INTO user_groups (name, handle, description, created_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, handle, description, created_by, now],
            )?;
            let group_id = tx.last_insert_rowid();
            let mut add = tx.prepare(
                "INSERT OR IGNORE INTO user_group_members (group_id, user_id, added_at)
                 SELECT ?1, id, ?3 FROM users WHERE id = ?2",
            )?;
            for member in member_ids {
                add.execute(params![group_id, member, now])?;
            }
            Ok(group_id)
        })
    }

    /// True if another group already uses `name` or `handle`.
    pub fn group_name_taken(&self, name: &str, handle: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM user_groups WHERE name = ?1 OR handle = ?2",
                    params![name, handle],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<UserGroup>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM user_groups g WHERE g.id = ?1", GROUP_COLUMNS);
            Ok(conn.query_row(&sql, [id], group_from_row).optional()?)
        })
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<UserGroup>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM user_groups g WHERE g.name = ?1", GROUP_COLUMNS);
            Ok(conn.query_row(&sql, [name], group_from_row).optional()?)
        })
    }

    pub fn list_groups(&self, skip: i64, limit: i64) -> Result<Vec<UserGroup>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_groups g ORDER BY g.name LIMIT ?1 OFFSET ?2",
                GROUP_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, skip], group_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_group(&self, id: i64, name: Option<&str>, description: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE user_groups SET name = COALESCE(?2, name), description = COALESCE(?3, description) WHERE id = ?1",
                params![id, name, description],
            )?;
            Ok(())
        })
    }

    pub fn delete_group(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM user_groups WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_group_members (group_id, user_id, added_at) VALUES (?1, ?2, ?3)",
                params![group_id, user_id, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn is_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM user_group_members WHERE group_id = ?1 AND user_id = ?2",
                    params![group_id, user_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    pub fn remove_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM user_group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn group_members(&self, group_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.* FROM user_group_members m JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ?1 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([group_id], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn group_members_and_counts() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");

        let gid = db.create_group("Design", "design", None, alice, &[alice, bob, 404]).unwrap();
        assert_eq!(db.get_group(gid).unwrap().unwrap().member_count, 2);
        assert!(db.group_name_taken("Other", "design").unwrap());

        assert!(db.remove_group_member(gid, bob).unwrap());
        let names: Vec<String> = db.group_members(gid).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["alice"]);

        db.delete_group(gid).unwrap();
        assert!(db.get_group(gid).unwrap().is_none());
        assert!(!db.is_group_member(gid, alice).unwrap());
    }
}
