//! Base JSON-RPC 2.0 HTTP client.
//!
//! Provides `call()` for node JSON-RPC methods (POST to the endpoint root) and
//! `post()` for plain JSON endpoints such as the GraphQL indexer.
//! Supports Basic auth, extra headers, configurable timeout, and retry with
//! exponential backoff.

use crate::error::RpcError;
use base64::Engine;
use log::warn;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// `error` member of a failed response; `data` carries the node's detail.
#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Node or indexer endpoint settings.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Base URL; a node's HTTP port or the indexer's GraphQL endpoint.
    pub url: String,
    /// Basic auth credentials, sent only when both are set.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
    /// Delay before the first retry; doubled for each following one.
    pub retry_delay: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9933".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Async HTTP client for JSON-RPC and plain JSON endpoints.
pub struct RpcClient {
    client: reqwest::Client,
    config: RpcConfig,
    headers: HeaderMap,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        Self::with_config(RpcConfig {
            url: url.to_string(),
            ..Default::default()
        })
    }

    /// Build a client; a trailing `/` on the URL is dropped.
    pub fn with_config(mut config: RpcConfig) -> Self {
        config.url = config.url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|e| {
                warn!("falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            config,
            headers: HeaderMap::new(),
            request_id: AtomicU64::new(0),
        }
    }

    /// Send an extra header with every request. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!("ignoring invalid header {}", name),
        }
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn auth_header(&self) -> Option<HeaderValue> {
        match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                let creds = format!("{}:{}", user, pass);
                let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
                HeaderValue::from_str(&format!("Basic {}", encoded)).ok()
            }
            _ => None,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = self.auth_header() {
            headers.insert(AUTHORIZATION, auth);
        }
        headers
    }

    /// Run `op` up to `retries + 1` times, backing off between transient failures.
    async fn retrying<F, Fut>(&self, context: &str, mut op: F) -> Result<Value, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, RpcError>>,
    {
        let attempts = self.config.retries + 1;
        let mut last_err = RpcError::NoResult {
            context: context.to_string(),
        };

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.config.retry_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(val) => return Ok(val),
                Err(e) => {
                    let should_retry = e.is_transient() && attempt + 1 < attempts;
                    if !should_retry {
                        return Err(e);
                    }
                    warn!("{} failed (attempt {}/{}): {}", context, attempt + 1, attempts, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    /// Call a JSON-RPC 2.0 method.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };
        self.retrying(method, || self.do_call(&req, method)).await
    }

    async fn do_call(&self, req: &JsonRpcRequest<'_>, method: &str) -> Result<Value, RpcError> {
        let url = self.config.url.as_str();
        let resp = self.send(url, method, req).await?;

        let body: JsonRpcResponse = resp.json().await.map_err(|e| RpcError::Http {
            method: method.to_string(),
            url: url.to_string(),
            source: e,
        })?;

        if let Some(err) = body.error {
            let message = match err.data {
                Some(Value::String(data)) => format!("{}: {}", err.message, data),
                _ => err.message,
            };
            return Err(RpcError::Rpc {
                code: err.code,
                message,
                method: method.to_string(),
            });
        }

        // `null` is a legitimate result (e.g. unknown block hash).
        Ok(body.result.unwrap_or(Value::Null))
    }

    /// POST JSON to a path relative to the base URL (not JSON-RPC).
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, RpcError> {
        let url = format!("{}{}", self.config.url, endpoint);
        let context = if endpoint.is_empty() { "/" } else { endpoint };
        self.retrying(context, || self.do_post(&url, body, context)).await
    }

    async fn do_post(&self, url: &str, body: &Value, endpoint: &str) -> Result<Value, RpcError> {
        let resp = self.send(url, endpoint, body).await?;
        resp.json().await.map_err(|e| RpcError::Http {
            method: endpoint.to_string(),
            url: url.to_string(),
            source: e,
        })
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        url: &str,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, RpcError> {
        let resp = self
            .client
            .post(url)
            .headers(self.build_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::Http {
                method: method.to_string(),
                url: url.to_string(),
                source: e,
            })?;

        let status = resp.status().as_u16();

        if status == 401 {
            return Err(RpcError::AuthFailed {
                url: url.to_string(),
            });
        }

        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::HttpStatus {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }

        Ok(resp)
    }

    /// Simple connectivity check (`system_health`).
    pub async fn is_connected(&self) -> bool {
        self.call("system_health", serde_json::json!([])).await.is_ok()
    }
}
