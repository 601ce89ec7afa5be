use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Property, PropertyFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub query: PropertyFilter,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub query: PropertyFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertCount {
    pub id: String,
    #[serde(default)]
    pub count: u32,
}

/// Response of `GET /saved-searches/alerts-summary`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsSummary {
    #[serde(default)]
    pub items: Vec<AlertCount>,
}

/// Response of `GET /saved-searches/{id}/alerts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchAlerts {
    #[serde(default)]
    pub items: Vec<Property>,
    #[serde(default)]
    pub new_count: u32,
}
