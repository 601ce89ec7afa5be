use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::services::alert_service::AlertAggregator;
use crate::services::api_client::{ApiClient, HttpTransport, Transport};
use crate::services::chat_service::ChatPanel;
use crate::services::config_service::EffectiveConfig;
use crate::services::events::{AppEvent, EventBus};
use crate::services::http_cache::HttpCache;
use crate::services::map_search::MapSearch;
use crate::services::notification_service::NotificationCenter;
use crate::models::Session;
use crate::services::session_service::{FileSessionStorage, SessionContext, SessionStorage};

/// Application state shared across commands and views.
pub struct AppState {
    pub config: EffectiveConfig,
    pub events: EventBus,
    pub cache: Arc<HttpCache>,
    pub api: ApiClient,
    pub session: Arc<SessionContext>,
    pub alerts: Arc<AlertAggregator>,
    pub chat: Arc<ChatPanel>,
    pub notifications: Arc<NotificationCenter>,
    pub map: Arc<MapSearch>,
    session_listener: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(
        config: EffectiveConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let cache = Arc::new(HttpCache::new());
        let api = ApiClient::new(transport, cache.clone());
        let session = Arc::new(SessionContext::new(storage));
        let events = EventBus::new();

        Self {
            alerts: Arc::new(
                AlertAggregator::new(api.clone(), session.clone()).with_events(events.clone()),
            ),
            chat: Arc::new(
                ChatPanel::new(api.clone(), session.clone(), config.chat_poll_interval)
                    .with_events(events.clone()),
            ),
            notifications: Arc::new(
                NotificationCenter::new(api.clone(), session.clone()).with_events(events.clone()),
            ),
            map: Arc::new(MapSearch::new(api.clone()).with_events(events.clone())),
            events,
            config,
            cache,
            api,
            session,
            session_listener: Mutex::new(None),
        }
    }

    /// Wires the real HTTP transport and the on-disk session.
    pub fn from_config(config: EffectiveConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.api_base_url.clone(), config.http_timeout)?;
        let storage = FileSessionStorage::in_app_data_dir()?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(storage)))
    }

    /// Keeps the session-derived views in step with the session.
    ///
    /// Any change of user or token first drops everything derived from the
    /// previous session (chat, notifications, alerts, cached responses). A
    /// sign-out followed quickly by a sign-in can reach the listener as a single
    /// change, so identity is compared rather than waiting to observe `None`.
    /// A live session is then re-derived: alert counts and the unread badge.
    pub fn spawn_session_listener(&self) {
        let mut rx = self.session.subscribe();
        let alerts = self.alerts.clone();
        let chat = self.chat.clone();
        let notifications = self.notifications.clone();
        let cache = self.cache.clone();
        let events = self.events.clone();
        let mut last = session_identity(&rx.borrow());

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let current = session_identity(&rx.borrow_and_update());
                if current == last {
                    continue;
                }
                let previous = std::mem::replace(&mut last, current.clone());

                if previous.is_some() {
                    tracing::debug!("Session ended or switched; clearing user views");
                    chat.reset();
                    notifications.reset();
                    alerts.reset();
                    cache.clear();
                }
                events.emit(AppEvent::SessionChanged {
                    authenticated: current.is_some(),
                });

                if current.is_some() {
                    tracing::debug!("Session started; refreshing alerts and badge");
                    tokio::join!(alerts.load_summary(), notifications.refresh_unread_count());
                }
            }
        });

        let mut listener = self.session_listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = listener.replace(handle) {
            previous.abort();
        }
    }
}

/// User id and token; profile edits keep the identity.
fn session_identity(session: &Option<Session>) -> Option<(String, String)> {
    session
        .as_ref()
        .map(|s| (s.user.id.clone(), s.token.clone()))
}

impl Drop for AppState {
    fn drop(&mut self) {
        let listener = self
            .session_listener
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = listener.take() {
            handle.abort();
        }
        self.chat.close();
        self.map.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserProfile};
    use crate::test_support::{
        chat_json, message_json, notification_json, profile, test_state, FakeTransport,
    };
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_rederives_alerts_and_badge() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::GET,
            "/saved-searches/alerts-summary",
            json!({"items": [{"id": "s1", "count": 2}]}),
        );
        transport.respond(Method::GET, "/notifications/unread-count", json!({"count": 5}));
        let state = test_state(&transport);
        state.spawn_session_listener();

        state
            .session
            .sign_in(Session {
                token: "tok".to_string(),
                user: profile(Role::Visitor),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(state.alerts.total_new(), 2);
        assert_eq!(state.notifications.unread_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_closes_chat_and_clears_views() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::GET,
            "/saved-searches/alerts-summary",
            json!({"items": [{"id": "s1", "count": 2}]}),
        );
        transport.respond(Method::GET, "/notifications/unread-count", json!({"count": 1}));
        transport.respond(Method::GET, "/contact-requests/mine", json!([]));
        let state = test_state(&transport);
        state.spawn_session_listener();

        state
            .session
            .sign_in(Session {
                token: "tok".to_string(),
                user: profile(Role::Visitor),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        state.chat.open().await.unwrap();
        assert!(state.chat.is_polling());

        state.session.sign_out().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!state.chat.is_open());
        assert!(!state.chat.is_polling());
        assert_eq!(state.alerts.total_new(), 0);
        assert_eq!(state.notifications.unread_count(), 0);

        let polls = transport.call_count(&Method::GET, "/contact-requests/mine");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.call_count(&Method::GET, "/contact-requests/mine"), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_user_drops_previous_users_data() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::GET,
            "/saved-searches/alerts-summary",
            json!({"items": [{"id": "s1", "count": 2}]}),
        );
        transport.respond(Method::GET, "/notifications/unread-count", json!({"count": 1}));
        transport.respond(Method::GET, "/contact-requests/mine", json!([chat_json("a-chat")]));
        transport.respond(
            Method::GET,
            "/contact-requests/a-chat/messages",
            json!([message_json("a-secret", "solo para A")]),
        );
        transport.respond(
            Method::GET,
            "/notifications",
            json!([notification_json("nA", "CONTACT_REQUEST", false)]),
        );
        let state = test_state(&transport);
        state.spawn_session_listener();
        let mut events = state.events.subscribe();

        state
            .session
            .sign_in(Session {
                token: "tok-a".to_string(),
                user: profile(Role::Visitor),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        state.chat.open().await.unwrap();
        state.notifications.load_notifications().await.unwrap();
        state
            .cache
            .set("properties:active", json!([]), Duration::from_secs(60));
        assert_eq!(state.chat.view().messages.len(), 1);

        // Both changes reach the listener as one.
        state.session.sign_out().unwrap();
        state
            .session
            .sign_in(Session {
                token: "tok-b".to_string(),
                user: UserProfile {
                    id: "u2".to_string(),
                    email: "beto@example.com".to_string(),
                    ..profile(Role::Visitor)
                },
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!state.chat.is_open());
        assert!(!state.chat.is_polling());
        let view = state.chat.view();
        assert!(view.selected.is_none());
        assert!(view.chats.is_empty());
        assert!(view.messages.is_empty());
        assert!(state.notifications.items().is_empty());
        assert!(state.cache.is_empty());
        assert_eq!(state.alerts.total_new(), 2);

        let mut session_events = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AppEvent::SessionChanged { authenticated } = event {
                session_events.push(authenticated);
            }
        }
        assert_eq!(session_events, vec![true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_edit_keeps_user_views() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, "/contact-requests/mine", json!([chat_json("c1")]));
        transport.respond(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("m1", "Hola")]),
        );
        let state = test_state(&transport);
        state
            .session
            .sign_in(Session {
                token: "tok".to_string(),
                user: profile(Role::Visitor),
            })
            .unwrap();
        state.spawn_session_listener();
        state.chat.open().await.unwrap();

        state
            .session
            .update_user(UserProfile {
                name: Some("Ana María".to_string()),
                ..profile(Role::Visitor)
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(state.chat.is_open());
        assert_eq!(state.chat.view().messages.len(), 1);
        state.chat.close();
    }
}
