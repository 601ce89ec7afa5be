use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::http_cache::HttpCache;
use crate::error::{ClientError, Result};

/// A single call against the marketplace REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/notifications`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub token: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            token: None,
            body: None,
        }
    }

    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Executes API requests. Implemented over HTTP by [`HttpTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the decoded JSON body, or `Value::Null` for empty bodies.
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// `reqwest`-backed transport for the marketplace API.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let request_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&request.path);
        tracing::debug!(method = %request.method, path = %request.path, %request_id, "API request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("X-Request-Id", &request_id);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(%status, path = %request.path, %request_id, "API error response");
            return Err(ClientError::from_response(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Typed façade over a [`Transport`] plus the shared [`HttpCache`].
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: Arc<HttpCache>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<HttpCache>) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &Arc<HttpCache> {
        &self.cache
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let value = self.transport.execute(request).await?;
        decode(value)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        self.send(ApiRequest::new(Method::GET, path).bearer(token))
            .await
    }

    /// GET through the cache: a live entry under `cache_key` is served without
    /// touching the network, otherwise the response is stored for `ttl`.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cache_key: &str,
        ttl: Duration,
    ) -> Result<T> {
        if let Some(value) = self.cache.get(cache_key) {
            tracing::debug!(cache_key, "cache hit");
            return decode(value);
        }
        tracing::debug!(cache_key, "cache miss");
        let value = self.transport.execute(request).await?;
        self.cache.set(cache_key, value.clone(), ttl);
        decode(value)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T> {
        self.send(ApiRequest::new(Method::POST, path).bearer(token).json(body)?)
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T> {
        self.send(ApiRequest::new(Method::PATCH, path).bearer(token).json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<()> {
        self.transport
            .execute(ApiRequest::new(Method::DELETE, path).bearer(token))
            .await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Builds an API path with one percent-encoded id segment, e.g.
/// `resource_path("/notifications", "a/b", "")` → `/notifications/a%2Fb`.
pub fn resource_path(prefix: &str, id: &str, suffix: &str) -> String {
    format!("{}/{}{}", prefix, urlencoding::encode(id), suffix)
}
