//! RPC error types.

use thiserror::Error;

/// JSON-RPC 2.0 standard error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Transaction pool rejections returned by `author_submitExtrinsic`.
    pub const POOL_INVALID_TX: i64 = 1010;
    pub const POOL_UNKNOWN_VALIDITY: i64 = 1011;
    pub const POOL_TEMPORARILY_BANNED: i64 = 1012;
    pub const POOL_ALREADY_IMPORTED: i64 = 1013;
    pub const POOL_TOO_LOW_PRIORITY: i64 = 1014;
    pub const POOL_CYCLE_DETECTED: i64 = 1015;
    pub const POOL_IMMEDIATELY_DROPPED: i64 = 1016;
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error calling {method} at {url}: {source}")]
    Http {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} calling {method} at {url}: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("authentication failed for {url}")]
    AuthFailed { url: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error {code} from {method}: {message}")]
    Rpc {
        code: i64,
        message: String,
        method: String,
    },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("no result in response to {context}")]
    NoResult { context: String },

    #[error("{0}")]
    Other(String),
}

impl RpcError {
    /// Errors worth retrying: connection failures, request timeouts and 5xx/429 responses.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            RpcError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The node's transaction pool refused the extrinsic.
    pub fn is_pool_rejection(&self) -> bool {
        matches!(
            self,
            RpcError::Rpc { code, .. } if (codes::POOL_INVALID_TX..=codes::POOL_IMMEDIATELY_DROPPED).contains(code)
        )
    }
}
