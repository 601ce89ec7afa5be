//! Error types shared by every client component.

use thiserror::Error;

/// Generic text shown when a failed request carries no usable server message.
pub const GENERIC_FAILURE: &str = "Ocurrió un error. Inténtalo de nuevo.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// No bearer token in the session. Components treat this as an empty state.
    #[error("Not authenticated")]
    MissingAuth,

    /// Local validation failed before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {entity} '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// The in-flight request was superseded or its owner went away.
    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Builds an HTTP error from a status and the raw response body.
    ///
    /// The body is searched for a `message` (string or list of strings) or an
    /// `error` field, which is what the API returns on failures.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            message: extract_server_message(body).unwrap_or_else(|| format!("HTTP {}", status)),
        }
    }

    /// Text suitable for component-local error state.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingAuth => "Inicia sesión para continuar.".to_string(),
            Self::Validation(message) => message.clone(),
            Self::Http { message, .. } if !message.starts_with("HTTP ") => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    /// Like [`user_message`](Self::user_message) but with a caller-chosen fallback
    /// for errors that carry no server text.
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Http { message, .. } if !message.starts_with("HTTP ") => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_missing_auth(&self) -> bool {
        matches!(self, Self::MissingAuth)
    }
}

fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let field = value.get("message").or_else(|| value.get("error"))?;
    match field {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|item| item.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
