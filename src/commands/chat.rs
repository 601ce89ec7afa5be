use crate::error::Result;
use crate::models::{ChatMessage, ContactRequest, ContactRequestDraft, ContactRequestStatus};
use crate::services::chat_service::{self, ChatPanelView, Toast};
use crate::state::AppState;

pub async fn open_chat(state: &AppState) -> Result<ChatPanelView> {
    state.chat.open().await?;
    Ok(state.chat.view())
}

pub fn close_chat(state: &AppState) {
    state.chat.close();
}

pub fn get_chat_view(state: &AppState) -> ChatPanelView {
    state.chat.view()
}

pub async fn refresh_chats(state: &AppState) -> Result<usize> {
    state.chat.load_chats().await
}

pub async fn select_chat(state: &AppState, chat_id: &str) -> Result<ChatPanelView> {
    state.chat.select(chat_id).await?;
    Ok(state.chat.view())
}

pub fn set_chat_draft(state: &AppState, text: &str) {
    state.chat.set_draft(text);
}

pub async fn send_chat_reply(state: &AppState, text: &str) -> Result<ChatMessage> {
    state.chat.send_reply(text).await
}

pub async fn update_contact_request_status(
    state: &AppState,
    chat_id: &str,
    status: ContactRequestStatus,
) -> Result<()> {
    state.chat.update_status(chat_id, status).await
}

pub fn take_chat_toast(state: &AppState) -> Option<Toast> {
    state.chat.take_toast()
}

/// Sends the interest/visit form of a property page.
pub async fn submit_contact_request(
    state: &AppState,
    draft: &ContactRequestDraft,
) -> Result<ContactRequest> {
    chat_service::submit_contact_request(&state.api, &state.session, draft).await
}
