use crate::error::Result;
use crate::models::{NewSavedSearch, SavedSearch, SavedSearchAlerts};
use crate::services::alert_service::AlertBanner;
use crate::state::AppState;

pub async fn list_saved_searches(state: &AppState) -> Result<Vec<SavedSearch>> {
    state.alerts.list_saved_searches().await
}

pub async fn create_saved_search(state: &AppState, search: &NewSavedSearch) -> Result<SavedSearch> {
    state.alerts.create_saved_search(search).await
}

pub async fn delete_saved_search(state: &AppState, search_id: &str) -> Result<()> {
    state.alerts.delete_saved_search(search_id).await
}

/// New matches of one saved search.
pub async fn get_saved_search_alerts(state: &AppState, search_id: &str) -> Result<SavedSearchAlerts> {
    state.alerts.load_matches(search_id).await
}

/// Re-reads the alert summary; `None` when nothing is new.
pub async fn refresh_alert_banner(state: &AppState) -> Option<AlertBanner> {
    state.alerts.load_summary().await;
    state.alerts.banner()
}
