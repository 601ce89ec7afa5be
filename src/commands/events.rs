use tokio::sync::broadcast;

use crate::services::events::AppEvent;
use crate::state::AppState;

/// Change notifications for the renderer, e.g. `chat-updated` after a poll.
pub fn subscribe_events(state: &AppState) -> broadcast::Receiver<AppEvent> {
    state.events.subscribe()
}
