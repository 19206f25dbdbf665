//! GraphQL indexer ("middleware") client.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::client::{RpcClient, RpcConfig};
use crate::error::RpcError;

/// Query sent to the indexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub variables: Value,
}

impl GraphQlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Null,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    /// Highest block the indexer has processed.
    pub fn latest_block() -> Self {
        Self::new("query { blocks(first: 1, orderBy: [BLOCK_ID_DESC]) { nodes { blockId } } }")
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Indexer capability: arbitrary queries plus the latest processed block.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run a query and return its `data` object.
    async fn query(&self, query: &GraphQlQuery) -> Result<Value, RpcError>;

    async fn latest_block(&self) -> Result<u64, RpcError> {
        let data = self.query(&GraphQlQuery::latest_block()).await?;
        parse_latest_block(&data)
    }
}

/// Extract `blocks.nodes[0].blockId` from a latest-block response.
pub fn parse_latest_block(data: &Value) -> Result<u64, RpcError> {
    let block_id = data
        .pointer("/blocks/nodes/0/blockId")
        .ok_or(RpcError::NoResult {
            context: "latest indexed block".into(),
        })?;
    block_id
        .as_u64()
        .or_else(|| block_id.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| RpcError::Other(format!("invalid blockId: {}", block_id)))
}

/// Configuration for the indexer client.
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// GraphQL endpoint URL.
    pub url: String,
    /// Sent as `x-api-key` when present.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// GraphQL-over-HTTP indexer client.
pub struct MiddlewareRpc {
    client: RpcClient,
}

impl MiddlewareRpc {
    pub fn new(url: &str) -> Self {
        Self::with_config(MiddlewareConfig {
            url: url.to_string(),
            ..Default::default()
        })
    }

    pub fn with_config(config: MiddlewareConfig) -> Self {
        let client = RpcClient::with_config(RpcConfig {
            url: config.url,
            timeout: config.timeout,
            ..Default::default()
        });
        let client = match &config.api_key {
            Some(key) => client.with_header("x-api-key", key),
            None => client,
        };
        Self { client }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl Middleware for MiddlewareRpc {
    async fn query(&self, query: &GraphQlQuery) -> Result<Value, RpcError> {
        debug!("indexer query: {}", query.query);
        let body = serde_json::to_value(query)?;
        let val = self.client.post("", &body).await?;
        let resp: GraphQlResponse = serde_json::from_value(val)?;
        if !resp.errors.is_empty() {
            let messages: Vec<_> = resp.errors.into_iter().map(|e| e.message).collect();
            return Err(RpcError::GraphQl(messages.join("; ")));
        }
        if resp.data.is_null() {
            return Err(RpcError::NoResult {
                context: "GraphQL query".into(),
            });
        }
        Ok(resp.data)
    }
}
