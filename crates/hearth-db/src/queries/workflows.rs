use anyhow::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use hearth_types::api::CreateWorkflowRequest;
use hearth_types::models::Workflow;

use crate::Database;

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        trigger_type: row.get("trigger_type")?,
        action_type: row.get("action_type")?,
        trigger_config: row.get("trigger_config")?,
        action_config: row.get("action_config")?,
        channel_id: row.get("channel_id")?,
        created_by: row.get("created_by")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    pub fn create_workflow(&self, req: &CreateWorkflowRequest, created_by: i64) -> Result<Workflow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflows
                    (name, description, trigger_type, action_type, trigger_config, action_config, channel_id, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    req.name,
                    req.description,
                    req.trigger_type,
                    req.action_type,
                    req.trigger_config,
                    req.action_config,
                    req.channel_id,
                    created_by,
                    Utc::now()
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(conn.query_row("SELECT * FROM workflows WHERE id = ?1", [id], workflow_from_row)?)
        })
    }

    pub fn get_workflow(&self, id: i64) -> Result<Option<Workflow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT * FROM workflows WHERE id = ?1", [id], workflow_from_row)
                .optional()?)
        })
    }

    /// `user_id`'s workflows, newest first, with optional channel/active filters.
    pub fn list_workflows(
        &self,
        user_id: i64,
        channel_id: Option<i64>,
        is_active: Option<bool>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Workflow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM workflows
                 WHERE created_by = ?1
                   AND (?2 IS NULL OR channel_id = ?2)
                   AND (?3 IS NULL OR is_active = ?3)
                 ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5",
            )?;
            let rows = stmt
                .query_map(params![user_id, channel_id, is_active, limit, skip], workflow_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_workflow(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workflows SET
                    name = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    is_active = COALESCE(?4, is_active)
                 WHERE id = ?1",
                params![id, name, description, is_active],
            )?;
            Ok(())
        })
    }

    pub fn toggle_workflow(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE workflows SET is_active = NOT is_active WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn delete_workflow(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM workflows WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}
