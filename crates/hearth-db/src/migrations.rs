use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const CURRENT_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, channels, messages)");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(V1)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    if version < 2 {
        info!("Running migration v2 (workspace features)");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(V2)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

const V1: &str = "
CREATE TABLE users (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    username            TEXT NOT NULL UNIQUE,
    email               TEXT NOT NULL UNIQUE,
    password_hash       TEXT NOT NULL,
    profile_picture     TEXT,
    status              TEXT NOT NULL DEFAULT 'offline',
    presence            TEXT NOT NULL DEFAULT 'offline',
    status_text         TEXT,
    status_emoji        TEXT,
    status_expires_at   TEXT,
    last_activity_at    TEXT,
    full_name           TEXT,
    job_title           TEXT,
    phone               TEXT,
    timezone            TEXT,
    bio                 TEXT,
    theme               TEXT NOT NULL DEFAULT 'light',
    notification_sound  INTEGER NOT NULL DEFAULT 1,
    email_notifications INTEGER NOT NULL DEFAULT 1,
    name                TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- no foreign key on user_id: a session row may outlive its account
CREATE TABLE sessions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    token       TEXT NOT NULL UNIQUE,
    user_id     INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE INDEX idx_sessions_user ON sessions(user_id);

CREATE TABLE channels (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE,
    description   TEXT,
    is_private    INTEGER NOT NULL DEFAULT 0,
    created_by    INTEGER REFERENCES users(id),
    created_at    TEXT NOT NULL,
    topic         TEXT,
    purpose       TEXT,
    topic_set_by  INTEGER REFERENCES users(id),
    topic_set_at  TEXT,
    section       TEXT
);

CREATE TABLE channel_members (
    channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (channel_id, user_id)
);

CREATE INDEX idx_channel_members_user ON channel_members(user_id);

CREATE TABLE contacts (
    user_id     INTEGER NOT NULL REFERENCES users(id),
    contact_id  INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (user_id, contact_id)
);

CREATE TABLE messages (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id         INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    content            TEXT NOT NULL,
    timestamp          TEXT NOT NULL,
    edited_at          TEXT,
    is_deleted         INTEGER NOT NULL DEFAULT 0,
    is_system_message  INTEGER NOT NULL DEFAULT 0,
    formatted_content  TEXT,
    formatting         TEXT,
    mentions           TEXT
);

CREATE INDEX idx_messages_channel ON messages(channel_id, timestamp);

CREATE TABLE direct_messages (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id          INTEGER NOT NULL REFERENCES users(id),
    receiver_id        INTEGER NOT NULL REFERENCES users(id),
    content            TEXT NOT NULL,
    timestamp          TEXT NOT NULL,
    is_read            INTEGER NOT NULL DEFAULT 0,
    edited_at          TEXT,
    is_deleted         INTEGER NOT NULL DEFAULT 0,
    formatted_content  TEXT,
    formatting         TEXT,
    mentions           TEXT
);

CREATE INDEX idx_dm_pair ON direct_messages(sender_id, receiver_id, timestamp);

CREATE TABLE threads (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    content            TEXT NOT NULL,
    timestamp          TEXT NOT NULL,
    edited_at          TEXT
);

CREATE INDEX idx_threads_parent ON threads(parent_message_id);

CREATE TABLE reactions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    emoji       TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    UNIQUE(message_id, user_id, emoji)
);

CREATE INDEX idx_reactions_message ON reactions(message_id);

CREATE TABLE attachments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id   INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    filename     TEXT NOT NULL,
    file_path    TEXT NOT NULL,
    file_type    TEXT NOT NULL,
    file_size    INTEGER NOT NULL,
    mime_type    TEXT,
    uploaded_at  TEXT NOT NULL
);

CREATE INDEX idx_attachments_message ON attachments(message_id);

CREATE TABLE dm_attachments (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    direct_message_id  INTEGER NOT NULL REFERENCES direct_messages(id) ON DELETE CASCADE,
    filename           TEXT NOT NULL,
    file_path          TEXT NOT NULL,
    file_type          TEXT NOT NULL,
    file_size          INTEGER NOT NULL,
    mime_type          TEXT,
    uploaded_at        TEXT NOT NULL
);

CREATE INDEX idx_dm_attachments_dm ON dm_attachments(direct_message_id);
";

const V2: &str = "
CREATE TABLE notifications (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    notification_type  TEXT NOT NULL,
    title              TEXT NOT NULL,
    message            TEXT NOT NULL,
    source_type        TEXT,
    source_id          INTEGER,
    data               TEXT,
    is_read            INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    read_at            TEXT
);

CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

CREATE TABLE pinned_messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    pinned_by   INTEGER NOT NULL REFERENCES users(id),
    pinned_at   TEXT NOT NULL,
    UNIQUE(message_id, channel_id)
);

CREATE TABLE bookmarks (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    message_id         INTEGER REFERENCES messages(id) ON DELETE CASCADE,
    direct_message_id  INTEGER REFERENCES direct_messages(id) ON DELETE CASCADE,
    note               TEXT,
    created_at         TEXT NOT NULL
);

CREATE INDEX idx_bookmarks_user ON bookmarks(user_id);

CREATE TABLE drafts (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(id),
    channel_id   INTEGER REFERENCES channels(id) ON DELETE CASCADE,
    receiver_id  INTEGER REFERENCES users(id),
    content      TEXT NOT NULL,
    formatting   TEXT,
    mentions     TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE scheduled_messages (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id),
    channel_id     INTEGER REFERENCES channels(id) ON DELETE CASCADE,
    receiver_id    INTEGER REFERENCES users(id),
    content        TEXT NOT NULL,
    formatting     TEXT,
    mentions       TEXT,
    scheduled_for  TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending',
    created_at     TEXT NOT NULL,
    sent_at        TEXT
);

CREATE TABLE user_groups (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL UNIQUE,
    handle       TEXT NOT NULL UNIQUE,
    description  TEXT,
    created_by   INTEGER NOT NULL REFERENCES users(id),
    created_at   TEXT NOT NULL
);

CREATE TABLE user_group_members (
    group_id  INTEGER NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
    user_id   INTEGER NOT NULL REFERENCES users(id),
    added_at  TEXT NOT NULL,
    PRIMARY KEY (group_id, user_id)
);

CREATE TABLE custom_emojis (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL UNIQUE,
    image_path   TEXT NOT NULL,
    aliases      TEXT,
    uploaded_by  INTEGER NOT NULL REFERENCES users(id),
    created_at   TEXT NOT NULL,
    usage_count  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE canvases (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    channel_id  INTEGER REFERENCES channels(id) ON DELETE SET NULL,
    owner_id    INTEGER NOT NULL REFERENCES users(id),
    is_public   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE workflows (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    description     TEXT,
    trigger_type    TEXT NOT NULL,
    action_type     TEXT NOT NULL,
    trigger_config  TEXT,
    action_config   TEXT,
    channel_id      INTEGER REFERENCES channels(id) ON DELETE CASCADE,
    created_by      INTEGER NOT NULL REFERENCES users(id),
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL
);

CREATE TABLE activities (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id),
    activity_type  TEXT NOT NULL,
    description    TEXT NOT NULL,
    target_type    TEXT,
    target_id      INTEGER,
    metadata       TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX idx_activities_user ON activities(user_id, created_at);

CREATE TABLE permalinks (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id         INTEGER REFERENCES messages(id) ON DELETE CASCADE,
    direct_message_id  INTEGER REFERENCES direct_messages(id) ON DELETE CASCADE,
    permalink          TEXT NOT NULL UNIQUE,
    created_at         TEXT NOT NULL
);

CREATE TABLE calls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id  INTEGER REFERENCES channels(id) ON DELETE CASCADE,
    dm_user_id  INTEGER REFERENCES users(id),
    call_type   TEXT NOT NULL,
    started_by  INTEGER NOT NULL REFERENCES users(id),
    started_at  TEXT NOT NULL,
    ended_at    TEXT,
    status      TEXT NOT NULL DEFAULT 'active',
    call_url    TEXT NOT NULL
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, CURRENT_VERSION);
    }
}
