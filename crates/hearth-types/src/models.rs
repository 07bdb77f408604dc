//! Response bodies returned by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Users --

/// Public account projection, used wherever a user appears in full.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub status: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account plus profile, presence and custom status fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
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
}

/// Compact author info embedded in messages, threads and DM listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    /// `full_name` when set, otherwise the username.
    pub name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: i64,
    pub presence: String,
    pub status_text: Option<String>,
    pub status_emoji: Option<String>,
    pub status_expires_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub notification_sound: bool,
    pub email_notifications: bool,
}

// -- Channels --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
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
    pub members: Vec<User>,
}

/// Channel without its member list (search results).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub topic: Option<String>,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
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
    /// JSON-encoded list of mentioned user ids.
    pub mentions: Option<String>,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<ReactionGroup>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub parent_message_id: i64,
    pub user_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub timestamp: DateTime<Utc>,
}

/// Reactions on one message collapsed by emoji.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmAttachment {
    pub id: i64,
    pub direct_message_id: i64,
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Either kind of attachment, tagged by the table it lives in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "attachment_type", rename_all = "snake_case")]
pub enum AnyAttachment {
    Message(Attachment),
    Dm(DmAttachment),
}

// -- Direct messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
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
    pub dm_attachments: Vec<DmAttachment>,
}

/// One row of the DM inbox: the counterpart and the latest exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub user_id: i64,
    pub username: String,
    pub profile_picture: Option<String>,
    pub status: String,
    pub last_message: Option<DirectMessage>,
    pub unread_count: i64,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub source_type: Option<String>,
    pub source_id: Option<i64>,
    pub data: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

// -- Pins, bookmarks, drafts, scheduled --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedMessage {
    pub id: i64,
    pub message_id: i64,
    pub channel_id: i64,
    pub pinned_by: i64,
    pub pinned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub message_id: Option<i64>,
    pub direct_message_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: i64,
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub content: String,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: i64,
    pub user_id: i64,
    pub channel_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub content: String,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    /// `pending`, `sent` or `cancelled`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

// -- Groups, emoji, canvas, workflows --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomEmoji {
    pub id: i64,
    pub name: String,
    pub image_path: String,
    pub aliases: Option<String>,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub channel_id: Option<i64>,
    pub owner_id: i64,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub action_type: String,
    pub trigger_config: Option<String>,
    pub action_config: Option<String>,
    pub channel_id: Option<i64>,
    pub created_by: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// -- Activity, permalinks, calls --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: String,
    pub description: String,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Workspace feed entry: an activity plus the name of the account it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedActivity {
    #[serde(flatten)]
    pub activity: Activity,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permalink {
    pub id: i64,
    pub message_id: Option<i64>,
    pub direct_message_id: Option<i64>,
    pub permalink: String,
    pub created_at: DateTime<Utc>,
}

/// What a permalink slug resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermalinkTarget {
    Message { message: Message },
    DirectMessage { direct_message: DirectMessage },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: i64,
    pub channel_id: Option<i64>,
    pub dm_user_id: Option<i64>,
    pub call_type: String,
    pub started_by: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// `active` or `ended`.
    pub status: String,
    pub call_url: String,
}

// -- Search --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result_type", rename_all = "snake_case")]
pub enum SearchHit {
    User(User),
    Channel(ChannelSummary),
    Message(Message),
    DirectMessage(DirectMessage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    /// Number of matches before truncation to the requested limit.
    pub total_count: usize,
}
