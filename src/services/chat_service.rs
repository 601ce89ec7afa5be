//! Contact-request chat panel.
//!
//! The panel is a floating overlay: while open it polls the conversation list
//! on a fixed interval and keeps the message history of the selected
//! conversation. The poll task is owned by the panel and aborted the moment the
//! panel closes or is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::api_client::{resource_path, ApiClient};
use super::events::{AppEvent, EventBus};
use super::session_service::SessionContext;
use crate::error::{ClientError, Result};
use crate::models::{
    ChatMessage, ContactRequest, ContactRequestDraft, ContactRequestStatus, Listing,
};

pub const MIN_MESSAGE_CHARS: usize = 3;

pub const SIGN_IN_TO_CHAT: &str = "Inicia sesión para ver tus mensajes.";
pub const NO_CONVERSATIONS: &str = "Sin conversaciones.";
pub const MESSAGE_TOO_SHORT: &str = "El mensaje debe tener al menos 3 caracteres.";
pub const NO_CONVERSATION_SELECTED: &str = "Selecciona una conversación.";
pub const REPLY_FAILED: &str = "No se pudo enviar el mensaje.";
pub const LOAD_CHATS_FAILED: &str = "No se pudieron cargar las conversaciones.";
pub const LOAD_MESSAGES_FAILED: &str = "No se pudieron cargar los mensajes.";

const CONTACT_REQUESTS_PATH: &str = "/contact-requests";
const MY_CONTACT_REQUESTS_PATH: &str = "/contact-requests/mine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelStatus {
    Closed,
    /// Open, first conversation list in flight.
    Loading,
    ListReady,
    LoadingMessages,
    ConversationReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
}

/// Render snapshot of the panel.
#[derive(Debug, Clone)]
pub struct ChatPanelView {
    pub status: PanelStatus,
    pub chats: Vec<ContactRequest>,
    pub selected: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub draft: String,
    pub sending: bool,
    pub error: Option<String>,
    /// Id of the message the view should scroll to.
    pub scroll_to: Option<String>,
    pub empty_text: Option<&'static str>,
}

struct ChatState {
    status: PanelStatus,
    chats: Vec<ContactRequest>,
    selected: Option<String>,
    messages: HashMap<String, Vec<ChatMessage>>,
    chats_seq: u64,
    message_seq: HashMap<String, u64>,
    next_message_seq: u64,
    draft: String,
    sending: bool,
    error: Option<String>,
    scroll_to: Option<String>,
    toast: Option<Toast>,
}

impl ChatState {
    fn new() -> Self {
        Self {
            status: PanelStatus::Closed,
            chats: Vec::new(),
            selected: None,
            messages: HashMap::new(),
            chats_seq: 0,
            message_seq: HashMap::new(),
            next_message_seq: 0,
            draft: String::new(),
            sending: false,
            error: None,
            scroll_to: None,
            toast: None,
        }
    }

    fn is_open(&self) -> bool {
        self.status != PanelStatus::Closed
    }

    /// Status changes only apply while open; a closed panel stays closed.
    fn advance(&mut self, to: PanelStatus) {
        if self.is_open() {
            self.status = to;
        }
    }

    fn refresh_scroll(&mut self) {
        if !self.is_open() {
            return;
        }
        self.scroll_to = self
            .selected
            .as_ref()
            .and_then(|id| self.messages.get(id))
            .and_then(|messages| messages.last())
            .map(|message| message.id.clone());
    }
}

#[derive(Serialize)]
struct ReplyBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: ContactRequestStatus,
}

pub struct ChatPanel {
    api: ApiClient,
    session: Arc<SessionContext>,
    poll_interval: Duration,
    state: Mutex<ChatState>,
    poller: Mutex<Option<JoinHandle<()>>>,
    events: EventBus,
}

impl ChatPanel {
    pub fn new(api: ApiClient, session: Arc<SessionContext>, poll_interval: Duration) -> Self {
        Self {
            api,
            session,
            poll_interval,
            state: Mutex::new(ChatState::new()),
            poller: Mutex::new(None),
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    fn emit_changed(&self, state: &ChatState) {
        self.events.emit(AppEvent::ChatUpdated {
            status: state.status,
            scroll_to: state.scroll_to.clone(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens the panel, loads the conversation list and starts polling it.
    ///
    /// Without a session the panel stays closed and a warning toast is queued.
    pub async fn open(self: &Arc<Self>) -> Result<()> {
        if !self.session.is_authenticated() {
            let mut state = self.lock();
            state.toast = Some(Toast {
                level: ToastLevel::Warning,
                text: SIGN_IN_TO_CHAT.to_string(),
            });
            self.emit_changed(&state);
            return Err(ClientError::MissingAuth);
        }

        {
            let mut state = self.lock();
            if state.is_open() {
                return Ok(());
            }
            state.status = PanelStatus::Loading;
            state.error = None;
            self.emit_changed(&state);
        }
        tracing::debug!("Chat panel opened");

        if let Err(e) = self.load_chats().await {
            tracing::debug!("Initial conversation load failed: {}", e);
        }
        self.start_polling();
        Ok(())
    }

    /// Closes the panel and stops polling. Loaded data is kept for reopening.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.status = PanelStatus::Closed;
            state.scroll_to = None;
            self.emit_changed(&state);
        }
        if let Some(handle) = self.lock_poller().take() {
            handle.abort();
            tracing::debug!("Chat polling stopped");
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn start_polling(self: &Arc<Self>) {
        let mut poller = self.lock_poller();
        // close() may have run while the first load was in flight.
        if !self.lock().is_open() {
            return;
        }
        if let Some(previous) = poller.take() {
            previous.abort();
        }

        let panel = Arc::downgrade(self);
        let period = self.poll_interval;
        *poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(panel) = panel.upgrade() else {
                    break;
                };
                tracing::debug!("Polling contact requests");
                if let Err(e) = panel.load_chats().await {
                    tracing::debug!("Conversation poll failed: {}", e);
                }
            }
        }));
    }

    /// Replaces the conversation list. Selects the first conversation (and
    /// loads its messages) when nothing is selected yet.
    pub async fn load_chats(&self) -> Result<usize> {
        let token = self.session.require_token()?;
        let path = match self.session.role() {
            Some(role) if role.manages_contact_requests() => CONTACT_REQUESTS_PATH,
            _ => MY_CONTACT_REQUESTS_PATH,
        };

        let seq = {
            let mut state = self.lock();
            state.chats_seq += 1;
            state.chats_seq
        };

        let result = self.api.get::<Listing<ContactRequest>>(path, Some(&token)).await;

        let (count, auto_selected) = {
            let mut state = self.lock();
            if state.chats_seq != seq {
                tracing::debug!(seq, "Discarding stale conversation list");
                return Ok(state.chats.len());
            }
            match result {
                Ok(listing) => {
                    state.chats = listing.into_items();
                    state.error = None;
                    let auto_selected = match state.selected {
                        None => state.chats.first().map(|chat| chat.id.clone()),
                        Some(_) => None,
                    };
                    if auto_selected.is_some() {
                        state.selected = auto_selected.clone();
                    }
                    if state.status == PanelStatus::Loading {
                        state.advance(PanelStatus::ListReady);
                    }
                    self.emit_changed(&state);
                    (state.chats.len(), auto_selected)
                }
                Err(e) => {
                    state.error = Some(e.user_message_or(LOAD_CHATS_FAILED));
                    if state.status == PanelStatus::Loading {
                        state.advance(PanelStatus::ListReady);
                    }
                    self.emit_changed(&state);
                    return Err(e);
                }
            }
        };

        if let Some(chat_id) = auto_selected {
            if let Err(e) = self.load_messages(&chat_id).await {
                tracing::debug!(chat_id, "Loading messages of first conversation failed: {}", e);
            }
        }
        Ok(count)
    }

    /// Selects a conversation; its history is loaded when the selection changes.
    pub async fn select(&self, chat_id: &str) -> Result<usize> {
        {
            let mut state = self.lock();
            if state.selected.as_deref() == Some(chat_id) && state.messages.contains_key(chat_id) {
                return Ok(state.messages[chat_id].len());
            }
            state.selected = Some(chat_id.to_string());
            state.scroll_to = None;
        }
        self.load_messages(chat_id).await
    }

    /// Replaces the message history of one conversation.
    ///
    /// Responses are tagged per conversation; an older response that resolves
    /// after a newer request for the same conversation is dropped.
    pub async fn load_messages(&self, chat_id: &str) -> Result<usize> {
        let token = self.session.require_token()?;
        let seq = {
            let mut state = self.lock();
            state.next_message_seq += 1;
            let seq = state.next_message_seq;
            state.message_seq.insert(chat_id.to_string(), seq);
            if state.selected.as_deref() == Some(chat_id) {
                state.advance(PanelStatus::LoadingMessages);
            }
            seq
        };

        let path = resource_path(CONTACT_REQUESTS_PATH, chat_id, "/messages");
        let result = self.api.get::<Listing<ChatMessage>>(&path, Some(&token)).await;

        let mut state = self.lock();
        if state.message_seq.get(chat_id) != Some(&seq) {
            tracing::debug!(chat_id, seq, "Discarding stale message history");
            return Ok(state.messages.get(chat_id).map_or(0, Vec::len));
        }

        let is_selected = state.selected.as_deref() == Some(chat_id);
        match result {
            Ok(listing) => {
                let messages = listing.into_items();
                let count = messages.len();
                state.messages.insert(chat_id.to_string(), messages);
                if is_selected {
                    state.error = None;
                    state.advance(PanelStatus::ConversationReady);
                    state.refresh_scroll();
                }
                self.emit_changed(&state);
                Ok(count)
            }
            Err(e) => {
                if is_selected {
                    state.error = Some(e.user_message_or(LOAD_MESSAGES_FAILED));
                    state.advance(PanelStatus::ConversationReady);
                }
                self.emit_changed(&state);
                Err(e)
            }
        }
    }

    pub fn set_draft(&self, text: &str) {
        self.lock().draft = text.to_string();
    }

    /// Sends a reply to the selected conversation.
    ///
    /// Messages shorter than three characters (after trimming) are rejected
    /// locally. On success the message returned by the server is appended and
    /// the draft cleared; on failure the draft is kept for a retry.
    pub async fn send_reply(&self, text: &str) -> Result<ChatMessage> {
        let trimmed = text.trim();
        let chat_id = {
            let mut state = self.lock();
            state.draft = text.to_string();
            if trimmed.chars().count() < MIN_MESSAGE_CHARS {
                state.error = Some(MESSAGE_TOO_SHORT.to_string());
                return Err(ClientError::validation(MESSAGE_TOO_SHORT));
            }
            let Some(chat_id) = state.selected.clone() else {
                state.error = Some(NO_CONVERSATION_SELECTED.to_string());
                return Err(ClientError::validation(NO_CONVERSATION_SELECTED));
            };
            state.sending = true;
            chat_id
        };

        let result = match self.session.token() {
            Some(token) => {
                let path = resource_path(CONTACT_REQUESTS_PATH, &chat_id, "/reply");
                self.api
                    .post::<ChatMessage, _>(&path, Some(&token), &ReplyBody { message: trimmed })
                    .await
            }
            None => Err(ClientError::MissingAuth),
        };

        let mut state = self.lock();
        state.sending = false;
        match result {
            Ok(message) => {
                state
                    .messages
                    .entry(chat_id)
                    .or_default()
                    .push(message.clone());
                state.draft.clear();
                state.error = None;
                state.refresh_scroll();
                self.emit_changed(&state);
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(chat_id, "Reply failed: {}", e);
                state.error = Some(e.user_message_or(REPLY_FAILED));
                self.emit_changed(&state);
                Err(e)
            }
        }
    }

    /// Changes a contact request's status; the local row is patched only after
    /// the server accepted the change.
    pub async fn update_status(&self, chat_id: &str, status: ContactRequestStatus) -> Result<()> {
        let token = self.session.require_token()?;
        let path = resource_path(CONTACT_REQUESTS_PATH, chat_id, "");
        let result = self
            .api
            .patch::<serde_json::Value, _>(&path, Some(&token), &StatusBody { status })
            .await;

        let mut state = self.lock();
        match result {
            Ok(_) => {
                if let Some(chat) = state.chats.iter_mut().find(|chat| chat.id == chat_id) {
                    chat.status = status;
                }
                self.emit_changed(&state);
                Ok(())
            }
            Err(e) => {
                state.error = Some(e.user_message());
                self.emit_changed(&state);
                Err(e)
            }
        }
    }

    /// Takes the pending toast, if any.
    pub fn take_toast(&self) -> Option<Toast> {
        self.lock().toast.take()
    }

    pub fn view(&self) -> ChatPanelView {
        let state = self.lock();
        let messages = state
            .selected
            .as_ref()
            .and_then(|id| state.messages.get(id))
            .cloned()
            .unwrap_or_default();
        let list_loaded = matches!(
            state.status,
            PanelStatus::ListReady | PanelStatus::LoadingMessages | PanelStatus::ConversationReady
        );
        let empty_text = (list_loaded && state.chats.is_empty() && state.error.is_none())
            .then_some(NO_CONVERSATIONS);

        ChatPanelView {
            status: state.status,
            chats: state.chats.clone(),
            selected: state.selected.clone(),
            messages,
            draft: state.draft.clone(),
            sending: state.sending,
            error: state.error.clone(),
            scroll_to: state.scroll_to.clone(),
            empty_text,
        }
    }

    /// Closes the panel and forgets every conversation, e.g. after sign-out.
    pub fn reset(&self) {
        self.close();
        let mut state = self.lock();
        let fresh = ChatState {
            chats_seq: state.chats_seq + 1,
            next_message_seq: state.next_message_seq,
            toast: state.toast.take(),
            ..ChatState::new()
        };
        *state = fresh;
        self.emit_changed(&state);
    }
}

impl Drop for ChatPanel {
    fn drop(&mut self) {
        let poller = self.poller.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = poller.take() {
            handle.abort();
        }
    }
}

/// Sends the interest/visit form of a property page.
pub async fn submit_contact_request(
    api: &ApiClient,
    session: &SessionContext,
    draft: &ContactRequestDraft,
) -> Result<ContactRequest> {
    if draft.property_id.trim().is_empty() {
        return Err(ClientError::validation("Falta la propiedad."));
    }
    if draft.message.trim().chars().count() < MIN_MESSAGE_CHARS {
        return Err(ClientError::validation(MESSAGE_TOO_SHORT));
    }
    let token = session.require_token()?;
    api.post(CONTACT_REQUESTS_PATH, Some(&token), draft).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactRequestType, Role};
    use crate::test_support::{
        api_with, chat_json, message_json, signed_in, signed_out, FakeTransport,
    };
    use reqwest::Method;
    use serde_json::json;

    const POLL: Duration = Duration::from_secs(20);

    fn panel(transport: &Arc<FakeTransport>, session: Arc<SessionContext>) -> Arc<ChatPanel> {
        Arc::new(ChatPanel::new(api_with(transport), session, POLL))
    }

    fn with_two_chats(transport: &FakeTransport) {
        transport.respond(
            Method::GET,
            MY_CONTACT_REQUESTS_PATH,
            json!([chat_json("c1"), chat_json("c2")]),
        );
        transport.respond(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("m1", "Hola"), message_json("m2", "¿Sigue disponible?")]),
        );
        transport.respond(
            Method::GET,
            "/contact-requests/c2/messages",
            json!([message_json("m9", "Buenas")]),
        );
    }

    #[tokio::test]
    async fn test_open_without_session_warns_and_stays_closed() {
        let transport = Arc::new(FakeTransport::new());
        let chat = panel(&transport, signed_out());

        assert_eq!(chat.open().await, Err(ClientError::MissingAuth));
        assert!(!chat.is_open());
        assert!(!chat.is_polling());
        assert_eq!(transport.total_calls(), 0);

        let toast = chat.take_toast().unwrap();
        assert_eq!(toast.level, ToastLevel::Warning);
        assert!(toast.text.starts_with("Inicia sesión"));
    }

    #[tokio::test]
    async fn test_open_with_no_conversations_shows_empty_text() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, MY_CONTACT_REQUESTS_PATH, json!([]));
        let chat = panel(&transport, signed_in(Role::Visitor));

        chat.open().await.unwrap();
        let view = chat.view();
        assert_eq!(view.status, PanelStatus::ListReady);
        assert_eq!(view.empty_text, Some("Sin conversaciones."));
        assert!(view.selected.is_none());
        chat.close();
    }

    #[tokio::test]
    async fn test_management_roles_use_management_endpoint() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, CONTACT_REQUESTS_PATH, json!({"items": []}));
        let chat = panel(&transport, signed_in(Role::Agency));

        chat.load_chats().await.unwrap();
        assert_eq!(transport.call_count(&Method::GET, CONTACT_REQUESTS_PATH), 1);
        assert_eq!(transport.call_count(&Method::GET, MY_CONTACT_REQUESTS_PATH), 0);
    }

    #[tokio::test]
    async fn test_first_chat_is_auto_selected_and_scrolled() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        let chat = panel(&transport, signed_in(Role::Visitor));

        chat.open().await.unwrap();
        let view = chat.view();
        assert_eq!(view.status, PanelStatus::ConversationReady);
        assert_eq!(view.selected.as_deref(), Some("c1"));
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.scroll_to.as_deref(), Some("m2"));
        chat.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_every_interval_and_stops_on_close() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, MY_CONTACT_REQUESTS_PATH, json!([]));
        let chat = panel(&transport, signed_in(Role::Visitor));

        chat.open().await.unwrap();
        assert_eq!(transport.call_count(&Method::GET, MY_CONTACT_REQUESTS_PATH), 1);

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(transport.call_count(&Method::GET, MY_CONTACT_REQUESTS_PATH), 3);

        chat.close();
        assert!(!chat.is_polling());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.call_count(&Method::GET, MY_CONTACT_REQUESTS_PATH), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_tick_notifies_renderer() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, MY_CONTACT_REQUESTS_PATH, json!([]));
        transport.respond(
            Method::GET,
            MY_CONTACT_REQUESTS_PATH,
            json!([chat_json("c1")]),
        );
        transport.respond(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("m1", "Hola")]),
        );
        let events = EventBus::new();
        let chat = Arc::new(
            ChatPanel::new(api_with(&transport), signed_in(Role::Visitor), POLL)
                .with_events(events.clone()),
        );
        chat.open().await.unwrap();

        let mut rx = events.subscribe();
        tokio::time::sleep(POLL + Duration::from_secs(1)).await;

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(AppEvent::ChatUpdated {
                status: PanelStatus::ConversationReady,
                scroll_to: Some("m1".to_string()),
            })
        );
        chat.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_panel_stops_polling() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, MY_CONTACT_REQUESTS_PATH, json!([]));
        let chat = panel(&transport, signed_in(Role::Visitor));

        chat.open().await.unwrap();
        drop(chat);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.call_count(&Method::GET, MY_CONTACT_REQUESTS_PATH), 1);
    }

    #[tokio::test]
    async fn test_short_reply_makes_no_request() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        let chat = panel(&transport, signed_in(Role::Visitor));
        chat.load_chats().await.unwrap();
        let before = transport.total_calls();

        let result = chat.send_reply("  ab  ").await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(transport.total_calls(), before);
        assert_eq!(chat.view().error.as_deref(), Some(MESSAGE_TOO_SHORT));
    }

    #[tokio::test]
    async fn test_reply_appends_server_message() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        transport.respond(
            Method::POST,
            "/contact-requests/c1/reply",
            json!(message_json("m3", "abc")),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));
        chat.open().await.unwrap();

        let sent = chat.send_reply("abc").await.unwrap();
        assert_eq!(sent.id, "m3");
        assert_eq!(transport.call_count(&Method::POST, "/contact-requests/c1/reply"), 1);
        assert_eq!(
            transport.calls().last().unwrap().body,
            Some(json!({"message": "abc"}))
        );

        let view = chat.view();
        let ids: Vec<&str> = view.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(view.scroll_to.as_deref(), Some("m3"));
        assert!(view.draft.is_empty());
        chat.close();
    }

    #[tokio::test]
    async fn test_failed_reply_keeps_draft() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        transport.fail(
            Method::POST,
            "/contact-requests/c1/reply",
            ClientError::from_response(403, r#"{"message":"La consulta está cerrada"}"#),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));
        chat.load_chats().await.unwrap();

        assert!(chat.send_reply("hola de nuevo").await.is_err());
        let view = chat.view();
        assert_eq!(view.draft, "hola de nuevo");
        assert_eq!(view.error.as_deref(), Some("La consulta está cerrada"));
        assert_eq!(view.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reply_without_server_text_uses_fallback() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        transport.fail(
            Method::POST,
            "/contact-requests/c1/reply",
            ClientError::Network("connection reset".into()),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));
        chat.load_chats().await.unwrap();

        assert!(chat.send_reply("hola").await.is_err());
        assert_eq!(chat.view().error.as_deref(), Some(REPLY_FAILED));
    }

    #[tokio::test]
    async fn test_list_failure_keeps_loaded_data() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        transport.fail(
            Method::GET,
            MY_CONTACT_REQUESTS_PATH,
            ClientError::Network("offline".into()),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));

        chat.load_chats().await.unwrap();
        assert!(chat.load_chats().await.is_err());

        let view = chat.view();
        assert_eq!(view.chats.len(), 2);
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.error.as_deref(), Some(LOAD_CHATS_FAILED));
    }

    #[tokio::test]
    async fn test_select_loads_only_that_conversation() {
        let transport = Arc::new(FakeTransport::new());
        with_two_chats(&transport);
        let chat = panel(&transport, signed_in(Role::Visitor));
        chat.open().await.unwrap();

        assert_eq!(chat.select("c2").await.unwrap(), 1);
        let view = chat.view();
        assert_eq!(view.selected.as_deref(), Some("c2"));
        assert_eq!(view.messages[0].id, "m9");
        assert_eq!(view.scroll_to.as_deref(), Some("m9"));

        // Re-selecting the loaded conversation does not refetch.
        chat.select("c2").await.unwrap();
        assert_eq!(transport.call_count(&Method::GET, "/contact-requests/c2/messages"), 1);
        chat.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_history_for_same_conversation_is_dropped() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_after(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("old", "viejo")]),
            Duration::from_secs(5),
        );
        transport.respond(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("new", "nuevo")]),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));

        let (slow, fast) = tokio::join!(chat.select("c1"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            chat.load_messages("c1").await
        });
        assert_eq!(fast.unwrap(), 1);
        assert_eq!(slow.unwrap(), 1);
        assert_eq!(chat.view().messages[0].id, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_conversation_list_is_dropped() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_after(
            Method::GET,
            MY_CONTACT_REQUESTS_PATH,
            json!([chat_json("old-1"), chat_json("old-2")]),
            Duration::from_secs(5),
        );
        transport.respond(Method::GET, MY_CONTACT_REQUESTS_PATH, json!([chat_json("c1")]));
        transport.respond(
            Method::GET,
            "/contact-requests/c1/messages",
            json!([message_json("m1", "Hola")]),
        );
        let chat = panel(&transport, signed_in(Role::Visitor));

        let (slow, fast) = tokio::join!(chat.load_chats(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            chat.load_chats().await
        });
        assert_eq!(fast.unwrap(), 1);
        assert_eq!(slow.unwrap(), 1);

        let view = chat.view();
        let ids: Vec<&str> = view.chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
        assert_eq!(view.selected.as_deref(), Some("c1"));
        assert_eq!(transport.call_count(&Method::GET, "/contact-requests/old-1/messages"), 0);
    }

    #[tokio::test]
    async fn test_update_status_patches_after_success() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, CONTACT_REQUESTS_PATH, json!([chat_json("c1")]));
        transport.respond(Method::GET, "/contact-requests/c1/messages", json!([]));
        transport.respond(Method::PATCH, "/contact-requests/c1", json!({"id": "c1"}));
        let chat = panel(&transport, signed_in(Role::Owner));
        chat.load_chats().await.unwrap();

        chat.update_status("c1", ContactRequestStatus::Contacted)
            .await
            .unwrap();
        assert_eq!(chat.view().chats[0].status, ContactRequestStatus::Contacted);
    }

    #[tokio::test]
    async fn test_update_status_failure_leaves_row() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, CONTACT_REQUESTS_PATH, json!([chat_json("c1")]));
        transport.respond(Method::GET, "/contact-requests/c1/messages", json!([]));
        let chat = panel(&transport, signed_in(Role::Owner));
        chat.load_chats().await.unwrap();

        assert!(chat
            .update_status("c1", ContactRequestStatus::Closed)
            .await
            .is_err());
        assert_eq!(chat.view().chats[0].status, ContactRequestStatus::New);
    }

    #[tokio::test]
    async fn test_submit_contact_request_validates_message() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::POST, CONTACT_REQUESTS_PATH, chat_json("c7"));
        let api = api_with(&transport);
        let session = signed_in(Role::Visitor);

        let mut draft = ContactRequestDraft {
            property_id: "p1".to_string(),
            kind: ContactRequestType::Visit,
            message: "ok".to_string(),
            preferred_date: None,
        };
        assert!(submit_contact_request(&api, &session, &draft).await.is_err());
        assert_eq!(transport.total_calls(), 0);

        draft.message = "Quisiera visitarla el sábado".to_string();
        let created = submit_contact_request(&api, &session, &draft).await.unwrap();
        assert_eq!(created.id, "c7");
        assert_eq!(transport.calls()[0].body.as_ref().unwrap()["type"], "VISIT");
    }
}
