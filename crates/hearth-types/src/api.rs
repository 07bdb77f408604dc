//! Request bodies and small envelope responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::User;

// -- Auth --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthCheck {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<i64>,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceUpdate {
    pub presence: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status_text: Option<String>,
    pub status_emoji: Option<String>,
    pub status_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreferencesUpdate {
    pub theme: Option<String>,
    pub notification_sound: Option<bool>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AddContactRequest {
    pub contact_id: i64,
}

// -- Channels --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    /// Initial members besides the creator. Unknown ids are skipped.
    #[serde(default)]
    pub members: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TopicUpdate {
    pub topic: Option<String>,
    pub purpose: Option<String>,
}

// -- Messages, threads, reactions --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMessageRequest {
    pub content: String,
    pub formatting: Option<String>,
    pub mentions: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateThreadRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateThreadRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateReactionRequest {
    pub emoji: String,
}

// -- Bookmarks, drafts, scheduled --

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookmarkRequest {
    pub message_id: Option<i64>,
    pub direct_message_id: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDraftRequest {
    pub channel_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub content: String,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDraftRequest {
    pub content: Option<String>,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateScheduledRequest {
    pub channel_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub content: String,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
    #[serde(deserialize_with = "utc_or_naive::required")]
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateScheduledRequest {
    pub content: Option<String>,
    pub formatting: Option<String>,
    pub mentions: Option<String>,
    #[serde(default, deserialize_with = "utc_or_naive::optional")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Timestamps with an offset are converted to UTC; timestamps without one
/// (`2024-05-01T09:30:00`) are taken to already be UTC.
mod utc_or_naive {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        raw.parse::<DateTime<Utc>>()
            .ok()
            .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|n| n.and_utc()))
    }

    pub fn required<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}

// -- Groups, canvas, workflows --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCanvasRequest {
    pub title: String,
    pub content: String,
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCanvasRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub channel_id: Option<i64>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub action_type: String,
    pub trigger_config: Option<String>,
    pub action_config: Option<String>,
    pub channel_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateWorkflowRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

// -- Permalinks, calls --

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePermalinkRequest {
    pub message_id: Option<i64>,
    pub direct_message_id: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StartCallRequest {
    pub channel_id: Option<i64>,
    pub dm_user_id: Option<i64>,
    pub call_type: String,
}

// -- Counters --

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveCalls {
    pub active_calls: Vec<crate::models::Call>,
}
