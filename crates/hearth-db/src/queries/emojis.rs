use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::CustomEmoji;

use crate::Database;

fn emoji_from_row(row: &Row<'_>) -> rusqlite::Result<CustomEmoji> {
    Ok(CustomEmoji {
        id: row.get("id")?,
        name: row.get("name")?,
        image_path: row.get("image_path")?,
        aliases: row.get("aliases")?,
        uploaded_by: row.get("uploaded_by")?,
        created_at: row.get("created_at")?,
        usage_count: row.get("usage_count")?,
    })
}

impl Database {
    pub fn create_emoji(
        &self,
        name: &str,
        image_path: &str,
        aliases: Option<&str>,
        uploaded_by: i64,
    ) -> Result<CustomEmoji> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO custom_emojis (name, image_path, aliases, uploaded_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, image_path, aliases, uploaded_by, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM custom_emojis WHERE id = ?1", [id], emoji_from_row)?)
        })
    }

    pub fn get_emoji(&self, id: i64) -> Result<Option<CustomEmoji>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM custom_emojis WHERE id = ?1", [id], emoji_from_row)
                .optional()?)
        })
    }

    pub fn list_emojis(&self, skip: i64, limit: i64) -> Result<Vec<CustomEmoji>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM custom_emojis ORDER BY name LIMIT ?1 OFFSET ?2")?;
            let rows = stmt
                .query_map(params![limit, skip], emoji_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Most used first.
    pub fn popular_emojis(&self, limit: i64) -> Result<Vec<CustomEmoji>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM custom_emojis ORDER BY usage_count DESC, name ASC LIMIT ?1")?;
            let rows = stmt
                .query_map([limit], emoji_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn delete_emoji(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM custom_emojis WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Bump the usage counter; returns the new value, `None` if unknown.
    pub fn use_emoji(&self, id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.execute("UPDATE custom_emojis SET usage_count = usage_count + 1 WHERE id = ?1", [id])?;
            Ok(conn
                .query_row("SELECT usage_count FROM custom_emojis WHERE id = ?1", [id], |r| r.get(0))
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;

    #[test]
    fn popularity_follows_usage() {
        let db = fixtures::db();
        let alice = fixtures::user(&db, "alice");
        let party = db.create_emoji("party", "emojis/a.png", None, alice).unwrap();
        db.create_emoji("cat", "emojis/b.png", Some("kitty"), alice).unwrap();

        assert_eq!(db.use_emoji(party.id).unwrap(), Some(1));
        assert_eq!(db.use_emoji(party.id).unwrap(), Some(2));
        assert_eq!(db.use_emoji(999).unwrap(), None);

        let popular = db.popular_emojis(1).unwrap();
        assert_eq!(popular[0].name, "party");
        assert_eq!(db.list_emojis(0, 10).unwrap()[0].name, "cat");
    }
}
