//! Database row types. These map directly to SQLite rows and stay distinct
//! from the hearth-types API models; conversions live here too.

use chrono::{DateTime, Utc};
use rusqlite::Row;

use hearth_types::models::{Channel, ChannelSummary, Preferences, Presence, User, UserProfile, UserSummary};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub status: String,
    pub presence: String,
    pub status_text: Option<String>,
    pub status_emoji: Option<String>,
    pub status_expires_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub theme: String,
    pub notification_sound: bool,
    pub email_notifications: bool,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            profile_picture: row.get("profile_picture")?,
            status: row.get("status")?,
            presence: row.get("presence")?,
            status_text: row.get("status_text")?,
            status_emoji: row.get("status_emoji")?,
            status_expires_at: row.get("status_expires_at")?,
            last_activity_at: row.get("last_activity_at")?,
            full_name: row.get("full_name")?,
            job_title: row.get("job_title")?,
            phone: row.get("phone")?,
            timezone: row.get("timezone")?,
            bio: row.get("bio")?,
            theme: row.get("theme")?,
            notification_sound: row.get("notification_sound")?,
            email_notifications: row.get("email_notifications")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            status: self.status.clone(),
            profile_picture: self.profile_picture.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            name: self
                .full_name
                .clone()
                .unwrap_or_else(|| self.username.clone()),
            profile_picture: self.profile_picture.clone(),
        }
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            user: self.to_user(),
            presence: self.presence.clone(),
            status_text: self.status_text.clone(),
            status_emoji: self.status_emoji.clone(),
            status_expires_at: self.status_expires_at,
            last_activity_at: self.last_activity_at,
            full_name: self.full_name.clone(),
            job_title: self.job_title.clone(),
            phone: self.phone.clone(),
            timezone: self.timezone.clone(),
            bio: self.bio.clone(),
        }
    }

    pub fn to_presence(&self) -> Presence {
        Presence {
            user_id: self.id,
            presence: self.presence.clone(),
            status_text: self.status_text.clone(),
            status_emoji: self.status_emoji.clone(),
            status_expires_at: self.status_expires_at,
            last_activity_at: self.last_activity_at,
        }
    }

    pub fn to_preferences(&self) -> Preferences {
        Preferences {
            theme: self.theme.clone(),
            notification_sound: self.notification_sound,
            email_notifications: self.email_notifications,
        }
    }
}

/// Insert payload for an account. `id` is only set by the bootstrap loader.
#[derive(Debug, Default)]
pub struct NewUser<'a> {
    pub id: Option<i64>,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub status: &'a str,
    pub full_name: Option<&'a str>,
    pub profile_picture: Option<&'a str>,
}

pub struct SessionRow {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            token: row.get("token")?,
            user_id: row.get("user_id")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct ChannelRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub purpose: Option<String>,
    pub topic_set_by: Option<i64>,
    pub topic_set_at: Option<DateTime<Utc>>,
    pub section: Option<String>,
}

impl ChannelRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            is_private: row.get("is_private")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            topic: row.get("topic")?,
            purpose: row.get("purpose")?,
            topic_set_by: row.get("topic_set_by")?,
            topic_set_at: row.get("topic_set_at")?,
            section: row.get("section")?,
        })
    }

    pub fn into_channel(self, members: Vec<User>) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            description: self.description,
            is_private: self.is_private,
            created_by: self.created_by,
            created_at: self.created_at,
            topic: self.topic,
            purpose: self.purpose,
            topic_set_by: self.topic_set_by,
            topic_set_at: self.topic_set_at,
            section: self.section,
            members,
        }
    }

    pub fn to_summary(&self) -> ChannelSummary {
        ChannelSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            is_private: self.is_private,
            created_by: self.created_by,
            created_at: self.created_at,
            topic: self.topic.clone(),
        }
    }
}

pub struct MessageRow {
    pub id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub is_system_message: bool,
    pub formatted_content: Option<String>,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            channel_id: row.get("channel_id")?,
            user_id: row.get("user_id")?,
            content: row.get("content")?,
            timestamp: row.get("timestamp")?,
            edited_at: row.get("edited_at")?,
            is_deleted: row.get("is_deleted")?,
            is_system_message: row.get("is_system_message")?,
            formatted_content: row.get("formatted_content")?,
            formatting: row.get("formatting")?,
            mentions: row.get("mentions")?,
        })
    }
}

pub struct DirectMessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub formatted_content: Option<String>,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
}

impl DirectMessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            sender_id: row.get("sender_id")?,
            receiver_id: row.get("receiver_id")?,
            content: row.get("content")?,
            timestamp: row.get("timestamp")?,
            is_read: row.get("is_read")?,
            edited_at: row.get("edited_at")?,
            is_deleted: row.get("is_deleted")?,
            formatted_content: row.get("formatted_content")?,
            formatting: row.get("formatting")?,
            mentions: row.get("mentions")?,
        })
    }

    /// The other side of the conversation as seen by `user_id`.
    pub fn counterpart(&self, user_id: i64) -> i64 {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

pub struct ThreadRow {
    pub id: i64,
    pub parent_message_id: i64,
    pub user_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl ThreadRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            parent_message_id: row.get("parent_message_id")?,
            user_id: row.get("user_id")?,
            content: row.get("content")?,
            timestamp: row.get("timestamp")?,
            edited_at: row.get("edited_at")?,
        })
    }
}

/// Metadata for a file already written to disk, ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
}

/// Insert payload for a notification.
#[derive(Debug, Default)]
pub struct NewNotification<'a> {
    pub user_id: i64,
    pub notification_type: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub source_type: Option<&'a str>,
    pub source_id: Option<i64>,
    pub data: Option<String>,
}

/// Everything an invite writes: the membership, a system message in the
/// channel, and the invitee's activity entry and notification.
#[derive(Debug)]
pub struct ChannelInvite<'a> {
    pub channel_id: i64,
    pub inviter_id: i64,
    pub invitee_id: i64,
    pub system_text: &'a str,
    pub description: &'a str,
}

/// Insert payload for an activity-feed entry.
#[derive(Debug, Default)]
pub struct NewActivity<'a> {
    pub user_id: i64,
    pub activity_type: &'a str,
    pub description: &'a str,
    pub target_type: Option<&'a str>,
    pub target_id: Option<i64>,
    pub metadata: Option<String>,
}
