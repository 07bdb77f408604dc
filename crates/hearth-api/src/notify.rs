//! Notifications and activity records written as side effects of other routes.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde_json::json;

use hearth_db::Database;
use hearth_db::models::{NewActivity, NewNotification};

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-user-id="(\d+)""#).expect("mention pattern is valid"));

/// User ids referenced by mention spans in formatted HTML, first-seen order.
pub fn mentioned_user_ids(html: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for cap in MENTION.captures_iter(html) {
        if let Ok(id) = cap[1].parse::<i64>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// A `mention` notification and activity for every existing account named in
/// `html`, except the sender.
pub fn mentions(
    db: &Database,
    html: &str,
    sender_id: i64,
    sender_name: &str,
    source_type: &str,
    source_id: i64,
) -> Result<usize> {
    let mut notified = 0;
    for user_id in mentioned_user_ids(html) {
        if user_id == sender_id || !db.user_exists(user_id)? {
            continue;
        }
        let message = format!("{} mentioned you", sender_name);
        db.create_notification(&NewNotification {
            user_id,
            notification_type: "mention",
            title: "New mention",
            message: &message,
            source_type: Some(source_type),
            source_id: Some(source_id),
            data: Some(json!({ "sender_id": sender_id }).to_string()),
        })?;
        db.create_activity(&NewActivity {
            user_id,
            activity_type: "mention",
            description: &message,
            target_type: Some(source_type),
            target_id: Some(source_id),
            metadata: Some(json!({ "mentioned_by": sender_id }).to_string()),
        })?;
        notified += 1;
    }
    Ok(notified)
}

/// Single notification to `user_id` unless they caused it themselves.
pub fn notify(
    db: &Database,
    user_id: i64,
    actor_id: i64,
    notification_type: &str,
    title: &str,
    message: &str,
    source: (&str, i64),
) -> Result<()> {
    if user_id == actor_id {
        return Ok(());
    }
    db.create_notification(&NewNotification {
        user_id,
        notification_type,
        title,
        message,
        source_type: Some(source.0),
        source_id: Some(source.1),
        data: None,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_db::models::NewUser;

    #[test]
    fn extracts_unique_ids_in_order() {
        let html = r#"<span data-user-id="7">@a</span> <span data-user-id="3">@b</span> <span data-user-id="7">@a</span>"#;
        assert_eq!(mentioned_user_ids(html), vec![7, 3]);
        assert!(mentioned_user_ids("plain text").is_empty());
        assert!(mentioned_user_ids(r#"data-user-id="abc""#).is_empty());
    }

    #[test]
    fn mentions_skip_sender_and_unknown_accounts() {
        let db = Database::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let email = format!("{}@example.com", name);
            ids.push(
                db.create_user(&NewUser {
                    username: name,
                    email: &email,
                    password_hash: "x",
                    status: "online",
                    ..Default::default()
                })
                .unwrap(),
            );
        }
        let (alice, bob) = (ids[0], ids[1]);
        let html = format!(
            r#"<span data-user-id="{alice}"></span><span data-user-id="{bob}"></span><span data-user-id="999"></span>"#
        );

        let n = mentions(&db, &html, alice, "alice", "message", 1).unwrap();
        assert_eq!(n, 1);
        assert_eq!(db.unread_notification_count(bob).unwrap(), 1);
        assert_eq!(db.unread_notification_count(alice).unwrap(), 0);
    }

    #[test]
    fn self_caused_notifications_are_dropped() {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .create_user(&NewUser {
                username: "alice",
                email: "alice@example.com",
                password_hash: "x",
                status: "online",
                ..Default::default()
            })
            .unwrap();
        notify(&db, alice, alice, "reaction", "t", "m", ("message", 1)).unwrap();
        assert_eq!(db.unread_notification_count(alice).unwrap(), 0);
    }
}
