//! Scripted in-memory transport used by the component tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{ClientError, Result};
use crate::models::{Role, Session, UserProfile, UserStatus};
use crate::services::api_client::{ApiClient, ApiRequest, Transport};
use crate::services::config_service::{resolve, Config};
use crate::services::http_cache::{Clock, HttpCache};
use crate::services::session_service::{MemorySessionStorage, SessionContext};
use crate::state::AppState;

#[derive(Clone)]
struct Scripted {
    result: Result<Value>,
    delay: Duration,
}

/// Responses are scripted per `(method, path)`. Queued responses are consumed in
/// order; the last one stays in place for every later call.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, method: Method, path: &str, value: Value) {
        self.push(method, path, Scripted { result: Ok(value), delay: Duration::ZERO });
    }

    pub fn respond_after(&self, method: Method, path: &str, value: Value, delay: Duration) {
        self.push(method, path, Scripted { result: Ok(value), delay });
    }

    pub fn fail(&self, method: Method, path: &str, error: ClientError) {
        self.push(method, path, Scripted { result: Err(error), delay: Duration::ZERO });
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.method == method && c.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        self.calls.lock().unwrap().push(request.clone());

        let scripted = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&(request.method.clone(), request.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match scripted {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.result
            }
            None => Err(ClientError::from_response(404, r#"{"message":"Not Found"}"#)),
        }
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

pub fn api_with(transport: &Arc<FakeTransport>) -> ApiClient {
    ApiClient::new(transport.clone(), Arc::new(HttpCache::new()))
}

/// App state over the fake transport with an in-memory, signed-out session.
pub fn test_state(transport: &Arc<FakeTransport>) -> AppState {
    let config = resolve(&Config::default(), |_| None).unwrap();
    AppState::new(
        config,
        transport.clone(),
        Arc::new(MemorySessionStorage::default()),
    )
}

pub fn profile(role: Role) -> UserProfile {
    UserProfile {
        id: "u1".to_string(),
        email: "ana@example.com".to_string(),
        name: Some("Ana".to_string()),
        role,
        status: UserStatus::Active,
        agency_id: None,
    }
}

pub fn signed_in(role: Role) -> Arc<SessionContext> {
    let session = SessionContext::new(Arc::new(MemorySessionStorage::default()));
    session
        .sign_in(Session {
            token: "tok".to_string(),
            user: profile(role),
        })
        .unwrap();
    Arc::new(session)
}

pub fn signed_out() -> Arc<SessionContext> {
    Arc::new(SessionContext::new(Arc::new(MemorySessionStorage::default())))
}

pub fn chat_json(id: &str) -> Value {
    json!({
        "id": id,
        "type": "INTEREST",
        "status": "NEW",
        "property": {"id": "p1", "title": "Depto 2 amb"},
        "message": "Hola"
    })
}

pub fn message_json(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "message": text,
        "createdAt": "2026-10-01T12:00:00Z",
        "senderUser": {"id": "u1", "name": "Ana"}
    })
}

pub fn notification_json(id: &str, kind: &str, read: bool) -> Value {
    json!({
        "id": id,
        "title": "Nueva consulta",
        "type": kind,
        "resourceId": "cr1",
        "link": "/propiedades/p1",
        "readAt": if read { json!("2026-10-01T12:00:00Z") } else { Value::Null },
        "createdAt": "2026-10-01T10:00:00Z"
    })
}
