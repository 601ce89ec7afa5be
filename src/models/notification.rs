use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ContactRequest,
    SavedSearchMatch,
    PropertyModeration,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<NotificationKind>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NotificationItem {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Response of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCount {
    #[serde(default)]
    pub count: u32,
}

/// Body of `PATCH /notifications/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct MarkRead {
    pub read: bool,
}

/// Partial echo of the patched notification; only `readAt` is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPatchResponse {
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}
