use crate::services::alert_service::AlertBanner;
use crate::state::AppState;

/// What the home page header and banner need.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeSnapshot {
    pub greeting_name: Option<String>,
    pub alert_banner: Option<AlertBanner>,
    pub unread_notifications: u32,
}

/// Refreshes the alert summary and the unread badge for `route` concurrently.
/// Both degrade to empty values on failure, so this never errors.
pub async fn home_snapshot(state: &AppState, route: &str) -> HomeSnapshot {
    let (_, unread_notifications) = tokio::join!(
        state.alerts.load_summary(),
        state.notifications.on_route_change(route)
    );

    HomeSnapshot {
        greeting_name: state.session.user().map(|u| u.display_name().to_string()),
        alert_banner: state.alerts.banner(),
        unread_notifications,
    }
}
