use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

use super::api_client::ApiClient;
use super::file_service::{get_app_data_dir, read_json, remove_file_if_exists, write_json};
use crate::error::{ClientError, Result};
use crate::models::{LoginResponse, ProfileUpdate, Role, Session, UserProfile};

// ============================================================================
// SESSION PERSISTENCE
// ============================================================================

/// Where the signed-in session survives restarts.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Session persisted as `session.json` in the app data directory.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_app_data_dir() -> Result<Self> {
        Ok(Self::new(get_app_data_dir()?.join("session.json")))
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<Session>> {
        read_json(&self.path)
    }

    fn save(&self, session: &Session) -> Result<()> {
        write_json(&self.path, session)
    }

    fn clear(&self) -> Result<()> {
        remove_file_if_exists(&self.path)
    }
}

#[derive(Default)]
pub struct MemorySessionStorage {
    session: Mutex<Option<Session>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

// ============================================================================
// SESSION CONTEXT
// ============================================================================

/// Injected owner of the current session.
///
/// Components read the token through typed accessors instead of touching
/// storage, and [`subscribe`](Self::subscribe) to learn about sign-in, profile
/// edits and sign-out.
pub struct SessionContext {
    storage: Arc<dyn SessionStorage>,
    tx: watch::Sender<Option<Session>>,
}

impl SessionContext {
    /// Restores the persisted session, if any. An unreadable session file is
    /// treated as signed out.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let initial = storage.load().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable session: {}", e);
            None
        });
        let (tx, _) = watch::channel(initial);
        Self { storage, tx }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.tx.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.tx.borrow().as_ref().map(|s| s.user.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Token or [`ClientError::MissingAuth`].
    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(ClientError::MissingAuth)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, session: Session) -> Result<()> {
        self.storage.save(&session)?;
        tracing::info!(user_id = %session.user.id, role = ?session.user.role, "Signed in");
        self.tx.send_replace(Some(session));
        Ok(())
    }

    /// Replaces the profile of the current session and writes it back.
    pub fn update_user(&self, user: UserProfile) -> Result<()> {
        let mut session = self.current().ok_or(ClientError::MissingAuth)?;
        session.user = user;
        self.storage.save(&session)?;
        self.tx.send_replace(Some(session));
        Ok(())
    }

    /// Clears the persisted session and notifies every subscriber.
    pub fn sign_out(&self) -> Result<()> {
        let cleared = self.storage.clear();
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
        cleared
    }
}

// ============================================================================
// REMOTE AUTH
// ============================================================================

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<Session> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ClientError::validation("Ingresa tu email y contraseña."));
    }
    let response: LoginResponse = api
        .post(
            "/auth/login",
            None,
            &Credentials {
                email: email.trim(),
                password,
            },
        )
        .await?;
    Ok(response.into())
}

pub async fn fetch_profile(api: &ApiClient, token: &str) -> Result<UserProfile> {
    api.get("/users/me", Some(token)).await
}

pub async fn update_profile(api: &ApiClient, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
    api.patch("/users/me", Some(token), update).await
}
