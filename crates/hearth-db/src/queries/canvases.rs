use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::models::Canvas;

use crate::Database;

fn canvas_from_row(row: &Row<'_>) -> rusqlite::Result<Canvas> {
    Ok(Canvas {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        channel_id: row.get("channel_id")?,
        owner_id: row.get("owner_id")?,
        is_public: row.get("is_public")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    pub fn create_canvas(
        &self,
        title: &str,
        content: &str,
        channel_id: Option<i64>,
        owner_id: i64,
        is_public: bool,
    ) -> Result<Canvas> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO canvases (title, content, channel_id, owner_id, is_public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![title, content, channel_id, owner_id, is_public, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM canvases WHERE id = ?1", [id], canvas_from_row)?)
        })
    }

    pub fn get_canvas(&self, id: i64) -> Result<Option<Canvas>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM canvases WHERE id = ?1", [id], canvas_from_row)
                .optional()?)
        })
    }

    /// Canvases `user_id` owns plus public ones, optionally for one channel.
    pub fn list_visible_canvases(
        &self,
        user_id: i64,
        channel_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Canvas>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM canvases
                 WHERE (owner_id = ?1 OR is_public = 1) AND (?2 IS NULL OR channel_id = ?2)
                 ORDER BY updated_at DESC, id DESC LIMIT ?3 OFFSET ?4",
            )?;
            let rows = stmt
                .query_map(params![user_id, channel_id, limit, skip], canvas_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_canvas(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
        channel_id: Option<i64>,
        is_public: Option<bool>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE canvases SET
                    title = COALESCE(?2, title),
                    content = COALESCE(?3, content),
                    channel_id = COALESCE(?4, channel_id),
                    is_public = COALESCE(?5, is_public),
                    updated_at = ?6
                 WHERE id = ?1",
                params![id, title, content, channel_id, is_public, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn delete_canvas(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM canvases WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}
