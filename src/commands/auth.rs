use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::models::{ProfileUpdate, Role, UserProfile};
use crate::services::session_service;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<Role>,
}

/// Signs in with email and password and stores the session.
pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<AuthStatus> {
    let session = session_service::login(&state.api, email, password).await?;
    state.session.sign_in(session)?;
    Ok(check_auth_status(state))
}

/// Sign out - clears the stored session and notifies every view.
pub fn sign_out(state: &AppState) -> Result<()> {
    state.session.sign_out()
}

pub fn check_auth_status(state: &AppState) -> AuthStatus {
    match state.session.user() {
        Some(user) => AuthStatus {
            is_authenticated: true,
            email: Some(user.email),
            user_id: Some(user.id),
            role: Some(user.role),
        },
        None => AuthStatus {
            is_authenticated: false,
            email: None,
            user_id: None,
            role: None,
        },
    }
}

/// Re-reads the profile from the server. An expired token (401) ends the
/// session.
pub async fn refresh_profile(state: &AppState) -> Result<UserProfile> {
    let token = state.session.require_token()?;
    match session_service::fetch_profile(&state.api, &token).await {
        Ok(profile) => {
            state.session.update_user(profile.clone())?;
            Ok(profile)
        }
        Err(ClientError::Http { status: 401, .. }) => {
            tracing::info!("Token expired; signing out");
            state.session.sign_out()?;
            Err(ClientError::MissingAuth)
        }
        Err(e) => Err(e),
    }
}

pub async fn update_profile(state: &AppState, update: &ProfileUpdate) -> Result<UserProfile> {
    let token = state.session.require_token()?;
    let profile = session_service::update_profile(&state.api, &token, update).await?;
    state.session.update_user(profile.clone())?;
    Ok(profile)
}
