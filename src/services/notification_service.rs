use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::api_client::{resource_path, ApiClient};
use super::events::{AppEvent, EventBus};
use super::session_service::SessionContext;
use crate::error::{ClientError, Result};
use crate::models::{
    Listing, MarkRead, NotificationItem, NotificationKind, NotificationPatchResponse, Role,
    UnreadCount,
};

const NOTIFICATIONS_PATH: &str = "/notifications";
const UNREAD_COUNT_PATH: &str = "/notifications/unread-count";

pub const MARK_READ_FAILED: &str = "No se pudo marcar la notificación como leída.";

/// Where opening a notification takes the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Visitors continue the conversation in the chat panel.
    ChatPanel { contact_request_id: Option<String> },
    /// Owners, agencies and admins land on the requests dashboard.
    ContactRequests { contact_request_id: Option<String> },
    Link(String),
    Stay,
}

#[derive(Default)]
struct NotificationState {
    items: Vec<NotificationItem>,
    unread_count: u32,
    count_seq: u64,
    list_seq: u64,
    error: Option<String>,
}

/// Header badge plus the notification list behind it.
pub struct NotificationCenter {
    api: ApiClient,
    session: Arc<SessionContext>,
    state: Mutex<NotificationState>,
    events: EventBus,
}

impl NotificationCenter {
    pub fn new(api: ApiClient, session: Arc<SessionContext>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(NotificationState::default()),
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    fn emit_badge(&self, unread_count: u32) {
        self.events.emit(AppEvent::BadgeUpdated { unread_count });
    }

    fn lock(&self) -> MutexGuard<'_, NotificationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refreshes the badge after navigation. Without a session the badge is 0
    /// and nothing is requested.
    pub async fn on_route_change(&self, route: &str) -> u32 {
        tracing::debug!(route, "Route changed");
        self.refresh_unread_count().await
    }

    pub async fn refresh_unread_count(&self) -> u32 {
        let seq = {
            let mut state = self.lock();
            state.count_seq += 1;
            state.count_seq
        };

        let result = match self.session.token() {
            Some(token) => self.api.get::<UnreadCount>(UNREAD_COUNT_PATH, Some(&token)).await,
            None => Err(ClientError::MissingAuth),
        };

        let mut state = self.lock();
        if state.count_seq != seq {
            return state.unread_count;
        }
        match result {
            Ok(unread) => state.unread_count = unread.count,
            Err(ClientError::MissingAuth) => state.unread_count = 0,
            Err(e) => tracing::warn!("Unread count unavailable: {}", e),
        }
        self.emit_badge(state.unread_count);
        state.unread_count
    }

    pub async fn load_notifications(&self) -> Result<usize> {
        let token = self.session.require_token()?;
        let seq = {
            let mut state = self.lock();
            state.list_seq += 1;
            state.list_seq
        };
        let result = self
            .api
            .get::<Listing<NotificationItem>>(NOTIFICATIONS_PATH, Some(&token))
            .await;

        let mut state = self.lock();
        if state.list_seq != seq {
            tracing::debug!(seq, "Discarding stale notification list");
            return Ok(state.items.len());
        }
        let outcome = match result {
            Ok(listing) => {
                state.items = listing.into_items();
                state.error = None;
                Ok(state.items.len())
            }
            Err(e) => {
                state.error = Some(e.user_message());
                Err(e)
            }
        };
        self.events.emit(AppEvent::NotificationsUpdated);
        outcome
    }

    /// Marks one notification read. Only that item's `read_at` changes, and
    /// only after the server accepted the PATCH. Already-read items are left
    /// alone without a request.
    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        let token = self.session.require_token()?;
        {
            let state = self.lock();
            let item = state
                .items
                .iter()
                .find(|item| item.id == id)
                .ok_or_else(|| ClientError::not_found("notification", id))?;
            if item.is_read() {
                return Ok(());
            }
        }

        let result = self
            .api
            .patch::<Option<NotificationPatchResponse>, _>(
                &resource_path(NOTIFICATIONS_PATH, id, ""),
                Some(&token),
                &MarkRead { read: true },
            )
            .await;

        let mut state = self.lock();
        match result {
            Ok(response) => {
                let read_at = response
                    .and_then(|r| r.read_at)
                    .unwrap_or_else(Utc::now);
                let mut was_unread = false;
                if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
                    was_unread = item.read_at.is_none();
                    item.read_at = Some(read_at);
                }
                if was_unread {
                    state.unread_count = state.unread_count.saturating_sub(1);
                    self.emit_badge(state.unread_count);
                }
                state.error = None;
                self.events.emit(AppEvent::NotificationsUpdated);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(notification_id = id, "Mark as read failed: {}", e);
                state.error = Some(e.user_message_or(MARK_READ_FAILED));
                self.events.emit(AppEvent::NotificationsUpdated);
                Err(e)
            }
        }
    }

    /// Whether the "mark as read" action should be offered for `id`.
    pub fn can_mark_read(&self, id: &str) -> bool {
        self.lock()
            .items
            .iter()
            .any(|item| item.id == id && !item.is_read())
    }

    /// Resolves where a notification leads. Contact-request notifications go
    /// to the chat or requests view and are marked read on the way.
    pub async fn open_notification(&self, id: &str) -> Result<Destination> {
        let item = self
            .lock()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("notification", id))?;

        if item.kind != Some(NotificationKind::ContactRequest) {
            return Ok(match item.link {
                Some(link) if !link.trim().is_empty() => Destination::Link(link),
                _ => Destination::Stay,
            });
        }

        if !item.is_read() {
            if let Err(e) = self.mark_as_read(id).await {
                tracing::debug!(notification_id = id, "Navigating without marking read: {}", e);
            }
        }

        let contact_request_id = item.resource_id;
        Ok(match self.session.role() {
            Some(role) if role != Role::Visitor => Destination::ContactRequests { contact_request_id },
            _ => Destination::ChatPanel { contact_request_id },
        })
    }

    pub fn items(&self) -> Vec<NotificationItem> {
        self.lock().items.clone()
    }

    pub fn unread_count(&self) -> u32 {
        self.lock().unread_count
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        let (count_seq, list_seq) = (state.count_seq + 1, state.list_seq + 1);
        *state = NotificationState {
            count_seq,
            list_seq,
            ..NotificationState::default()
        };
        self.emit_badge(0);
        self.events.emit(AppEvent::NotificationsUpdated);
    }
}
