use crate::error::Result;
use crate::models::NotificationItem;
use crate::services::notification_service::Destination;
use crate::state::AppState;

/// Called on every navigation; returns the badge count.
pub async fn on_route_change(state: &AppState, route: &str) -> u32 {
    state.notifications.on_route_change(route).await
}

pub fn get_unread_count(state: &AppState) -> u32 {
    state.notifications.unread_count()
}

pub async fn list_notifications(state: &AppState) -> Result<Vec<NotificationItem>> {
    state.notifications.load_notifications().await?;
    Ok(state.notifications.items())
}

pub async fn mark_notification_read(state: &AppState, notification_id: &str) -> Result<()> {
    state.notifications.mark_as_read(notification_id).await
}

pub async fn open_notification(state: &AppState, notification_id: &str) -> Result<Destination> {
    state.notifications.open_notification(notification_id).await
}
