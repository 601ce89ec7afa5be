//! Change notifications for whatever renders the views.
//!
//! Components emit after every state change they make, including changes that
//! originate in background work such as the chat poll. Emitting with no
//! subscriber is fine.

use serde::Serialize;
use tokio::sync::broadcast;

use super::chat_service::PanelStatus;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AppEvent {
    SessionChanged {
        authenticated: bool,
    },
    AlertsUpdated {
        #[serde(rename = "totalNew")]
        total_new: u32,
    },
    ChatUpdated {
        status: PanelStatus,
        #[serde(rename = "scrollTo")]
        scroll_to: Option<String>,
    },
    BadgeUpdated {
        #[serde(rename = "unreadCount")]
        unread_count: u32,
    },
    NotificationsUpdated,
    MapUpdated {
        markers: usize,
    },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::SessionChanged { .. } => "session-changed",
            AppEvent::AlertsUpdated { .. } => "alerts-updated",
            AppEvent::ChatUpdated { .. } => "chat-updated",
            AppEvent::BadgeUpdated { .. } => "badge-updated",
            AppEvent::NotificationsUpdated => "notifications-updated",
            AppEvent::MapUpdated { .. } => "map-updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: AppEvent) {
        tracing::trace!(event = event.name(), "Emitting");
        let _ = self.tx.send(event);
    }

    /// A lagging subscriber skips the oldest events; views re-read their
    /// snapshot on the next one.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
