//! First-run bootstrap from a JSON fixture file.
//!
//! Runs only against an empty database. Ids in the file are kept so that
//! cross references between sections line up.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use hearth_db::Database;
use hearth_db::models::NewUser;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
    pub channels: Vec<SeedChannel>,
    pub messages: Vec<SeedMessage>,
    pub user_groups: Vec<SeedGroup>,
    pub direct_messages: Vec<SeedDirectMessage>,
    pub contacts: Vec<SeedContact>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedChannel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub created_by: i64,
    #[serde(default)]
    pub members: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SeedMessage {
    pub id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SeedGroup {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    pub created_by: i64,
    #[serde(default)]
    pub members: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SeedContact {
    pub user_id: i64,
    pub contact_id: i64,
}

/// Loads `path` into `db` if the database has no users yet. A missing file
/// is not an error.
pub fn bootstrap(db: &Database, path: &Path) -> anyhow::Result<()> {
    if db.count_users()? > 0 {
        return Ok(());
    }
    if !path.exists() {
        warn!("No users and no seed file at {}, starting empty", path.display());
        return Ok(());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;
    load(db, &seed)?;

    info!(
        "Seeded {} users, {} channels, {} messages from {}",
        seed.users.len(),
        seed.channels.len(),
        seed.messages.len(),
        path.display()
    );
    Ok(())
}

/// Writes every section in one transaction; an error leaves the database
/// untouched so the next start tries again.
pub fn load(db: &Database, seed: &SeedFile) -> anyhow::Result<()> {
    // hash before taking the write lock
    let hashes = seed
        .users
        .iter()
        .map(|u| hearth_api::auth::hash_password(&u.password))
        .collect::<anyhow::Result<Vec<_>>>()?;

    db.seed(|s| {
        for (user, hash) in seed.users.iter().zip(&hashes) {
            s.user(&NewUser {
                id: Some(user.id),
                username: &user.username,
                email: &user.email,
                password_hash: hash,
                status: user.status.as_deref().unwrap_or("offline"),
                full_name: user.full_name.as_deref(),
                profile_picture: None,
            })
            .with_context(|| format!("seeding user {}", user.username))?;
        }

        for c in &seed.channels {
            s.channel(
                c.id,
                &c.name,
                c.description.as_deref(),
                c.is_private,
                c.created_by,
                &c.members,
            )
            .with_context(|| format!("seeding channel {}", c.name))?;
        }

        for m in &seed.messages {
            s.message(m.id, m.channel_id, m.user_id, &m.content, m.timestamp)
                .with_context(|| format!("seeding message {}", m.id))?;
        }

        for g in &seed.user_groups {
            s.group(
                g.id,
                &g.name,
                g.handle.trim_start_matches('@'),
                g.description.as_deref(),
                g.created_by,
                &g.members,
            )
            .with_context(|| format!("seeding group {}", g.name))?;
        }

        for dm in &seed.direct_messages {
            s.direct_message(
                dm.id,
                dm.sender_id,
                dm.receiver_id,
                &dm.content,
                dm.is_read,
                dm.timestamp,
            )
            .with_context(|| format!("seeding direct message {}", dm.id))?;
        }

        for c in &seed.contacts {
            s.contact(c.user_id, c.contact_id)
                .with_context(|| format!("seeding contact {} -> {}", c.user_id, c.contact_id))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"{
        "users": [
            {"id": 1, "username": "john", "email": "john@example.com", "password": "password123"},
            {"id": 2, "username": "jane", "email": "jane@example.com", "password": "password123", "status": "away"}
        ],
        "channels": [
            {"id": 10, "name": "general", "is_private": false, "created_by": 1, "members": [1, 2]},
            {"id": 11, "name": "secret", "is_private": true, "created_by": 1, "members": [1]}
        ],
        "messages": [
            {"id": 100, "channel_id": 10, "user_id": 2, "content": "hello"}
        ],
        "user_groups": [
            {"id": 5, "name": "Design", "handle": "@design", "created_by": 1, "members": [1, 2]}
        ],
        "direct_messages": [
            {"id": 50, "sender_id": 1, "receiver_id": 2, "content": "hi jane"}
        ],
        "contacts": [{"user_id": 1, "contact_id": 2}]
    }"#;

    #[test]
    fn loads_every_section() {
        let db = Database::open_in_memory().unwrap();
        let seed: SeedFile = serde_json::from_str(SEED).unwrap();
        load(&db, &seed).unwrap();

        assert_eq!(db.count_users().unwrap(), 2);
        assert!(db.is_member(10, 2).unwrap());
        assert!(!db.is_member(11, 2).unwrap());
        assert_eq!(db.get_group(5).unwrap().unwrap().member_count, 2);

        let john = db.get_user(1).unwrap().unwrap();
        assert!(hearth_api::auth::verify_password(&john.password_hash, "password123"));
    }

    #[test]
    fn skips_populated_database_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let db = Database::open_in_memory().unwrap();

        // no file yet
        bootstrap(&db, &path).unwrap();
        assert_eq!(db.count_users().unwrap(), 0);

        std::fs::write(&path, SEED).unwrap();
        bootstrap(&db, &path).unwrap();
        assert_eq!(db.count_users().unwrap(), 2);

        // second run leaves the data alone
        bootstrap(&db, &path).unwrap();
        assert_eq!(db.count_users().unwrap(), 2);
    }

    #[test]
    fn broken_seed_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let db = Database::open_in_memory().unwrap();

        // the message names a channel that does not exist
        std::fs::write(
            &path,
            r#"{
                "users": [{"id": 1, "username": "john", "email": "john@example.com", "password": "password123"}],
                "messages": [{"id": 100, "channel_id": 42, "user_id": 1, "content": "lost"}]
            }"#,
        )
        .unwrap();
        assert!(bootstrap(&db, &path).is_err());
        assert_eq!(db.count_users().unwrap(), 0);

        std::fs::write(&path, SEED).unwrap();
        bootstrap(&db, &path).unwrap();
        assert_eq!(db.count_users().unwrap(), 2);
    }
}
