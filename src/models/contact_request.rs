use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PropertySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactRequestType {
    Interest,
    Visit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactRequestStatus {
    New,
    Contacted,
    Closed,
}

/// A participant as embedded by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A contact request ("chat"): a lead on one property with an attached thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContactRequestType,
    pub status: ContactRequestStatus,
    #[serde(default)]
    pub requester: Option<Participant>,
    #[serde(default)]
    pub owner: Option<Participant>,
    #[serde(default)]
    pub agency: Option<Participant>,
    #[serde(default)]
    pub property: Option<PropertySnapshot>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sender_user: Option<Participant>,
}

/// Body of `POST /contact-requests` sent from a property page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequestDraft {
    pub property_id: String,
    #[serde(rename = "type")]
    pub kind: ContactRequestType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<DateTime<Utc>>,
}
