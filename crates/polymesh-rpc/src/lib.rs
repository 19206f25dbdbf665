//! Polymesh node and indexer clients.
//!
//! Defines the capabilities the transaction engine consumes (`ChainClient`,
//! `Middleware`) together with the chain data types they exchange, and
//! provides async HTTP clients for the raw node JSON-RPC surface and the
//! GraphQL indexer.
//!
//! # Example
//!
//! ```ignore
//! use polymesh_rpc::NodeRpc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let node = NodeRpc::new("http://localhost:9933");
//!     let head = node.finalized_head().await.unwrap();
//!     let header = node.header(Some(&head)).await.unwrap();
//!     println!("Finalized: #{}", header.number);
//! }
//! ```

pub mod chain;
pub mod client;
pub mod error;
pub mod middleware;
pub mod node;
pub mod types;

pub use chain::ChainClient;
pub use client::{RpcClient, RpcConfig};
pub use error::RpcError;
pub use middleware::{GraphQlQuery, Middleware, MiddlewareConfig, MiddlewareRpc};
pub use node::NodeRpc;
pub use types::{
    AccountBalance, Block, Call, CallArg, DispatchError, EventRecord, Header, ModuleError, Phase,
    ProtocolFee, RuntimeEvent, RuntimeVersion, SignedExtrinsic, SignerPayload, SignerPayloadRaw,
    StatusSubscription, StatusUpdate, Subsidy,
};
