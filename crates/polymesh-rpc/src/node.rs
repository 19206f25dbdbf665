//! Substrate node RPC client.
//!
//! Typed async methods for the raw node endpoints a chain client needs:
//! blocks, headers, runtime version, nonces, submission and fee estimation.

use crate::client::{RpcClient, RpcConfig};
use crate::error::RpcError;
use crate::types::{Block, Header, RuntimeDispatchInfo, RuntimeVersion, SystemHealth};
use polymesh_types::{blake2_256, Address, Hash};
use serde::Deserialize;
use serde_json::{json, Value};

/// `chain_getBlock` response.
#[derive(Debug, Clone, Deserialize)]
struct SignedBlock {
    block: RawBlock,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBlock {
    header: Header,
    #[serde(default)]
    extrinsics: Vec<String>,
}

/// Async RPC client for a Polymesh node.
pub struct NodeRpc {
    client: RpcClient,
}

impl NodeRpc {
    /// Create a node RPC client connected to the given URL.
    pub fn new(url: &str) -> Self {
        Self {
            client: RpcClient::new(url),
        }
    }

    /// Create with full configuration.
    pub fn with_config(config: RpcConfig) -> Self {
        Self {
            client: RpcClient::with_config(config),
        }
    }

    /// Get the underlying RPC client for custom calls.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    // =========================================================================
    // Chain
    // =========================================================================

    pub async fn finalized_head(&self) -> Result<Hash, RpcError> {
        let val = self.client.call("chain_getFinalizedHead", json!([])).await?;
        parse_hash(val, "chain_getFinalizedHead")
    }

    /// Header of `hash`, or of the best block.
    pub async fn header(&self, hash: Option<&Hash>) -> Result<Header, RpcError> {
        let params = match hash {
            Some(hash) => json!([hash]),
            None => json!([]),
        };
        let val = self.client.call("chain_getHeader", params).await?;
        if val.is_null() {
            return Err(RpcError::NoResult {
                context: format!("chain_getHeader({:?})", hash),
            });
        }
        Ok(serde_json::from_value(val)?)
    }

    /// Block with its extrinsic hashes (blake2b-256 of each encoded extrinsic).
    pub async fn block(&self, hash: &Hash) -> Result<Block, RpcError> {
        let val = self.client.call("chain_getBlock", json!([hash])).await?;
        if val.is_null() {
            return Err(RpcError::NoResult {
                context: format!("chain_getBlock({})", hash),
            });
        }
        let signed: SignedBlock = serde_json::from_value(val)?;
        let extrinsic_hashes = signed
            .block
            .extrinsics
            .iter()
            .map(|xt| decode_hex(xt).map(|bytes| blake2_256(&bytes)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block {
            hash: *hash,
            header: signed.block.header,
            extrinsic_hashes,
        })
    }

    /// Hash of the block at `number`, if it exists.
    pub async fn block_hash(&self, number: u64) -> Result<Option<Hash>, RpcError> {
        let val = self.client.call("chain_getBlockHash", json!([number])).await?;
        if val.is_null() {
            return Ok(None);
        }
        parse_hash(val, "chain_getBlockHash").map(Some)
    }

    pub async fn genesis_hash(&self) -> Result<Hash, RpcError> {
        self.block_hash(0).await?.ok_or(RpcError::NoResult {
            context: "genesis hash".into(),
        })
    }

    // =========================================================================
    // State and system
    // =========================================================================

    pub async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError> {
        let val = self.client.call("state_getRuntimeVersion", json!([])).await?;
        Ok(serde_json::from_value(val)?)
    }

    pub async fn account_next_index(&self, address: &Address) -> Result<u32, RpcError> {
        let val = self
            .client
            .call("system_accountNextIndex", json!([address]))
            .await?;
        val.as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(RpcError::NoResult {
                context: "system_accountNextIndex".into(),
            })
    }

    pub async fn health(&self) -> Result<SystemHealth, RpcError> {
        let val = self.client.call("system_health", json!([])).await?;
        Ok(serde_json::from_value(val)?)
    }

    // =========================================================================
    // Author and payment
    // =========================================================================

    /// Submit an encoded extrinsic; returns its hash.
    pub async fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<Hash, RpcError> {
        let val = self
            .client
            .call("author_submitExtrinsic", json!([to_hex(extrinsic)]))
            .await?;
        parse_hash(val, "author_submitExtrinsic")
    }

    /// Fee estimate for an encoded extrinsic, optionally at a given block.
    pub async fn query_info(
        &self,
        extrinsic: &[u8],
        at: Option<&Hash>,
    ) -> Result<RuntimeDispatchInfo, RpcError> {
        let params = match at {
            Some(at) => json!([to_hex(extrinsic), at]),
            None => json!([to_hex(extrinsic)]),
        };
        let val = self.client.call("payment_queryInfo", params).await?;
        Ok(serde_json::from_value(val)?)
    }
}

fn parse_hash(val: Value, context: &str) -> Result<Hash, RpcError> {
    let text = val.as_str().ok_or(RpcError::NoResult {
        context: context.to_string(),
    })?;
    text.parse()
        .map_err(|e| RpcError::Other(format!("{} returned an invalid hash: {}", context, e)))
}

fn decode_hex(text: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(text.strip_prefix("0x").unwrap_or(text))
        .map_err(|e| RpcError::Other(format!("invalid extrinsic hex: {}", e)))
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_rpc_creation() {
        let node = NodeRpc::new("http://localhost:9933");
        assert_eq!(node.client().url(), "http://localhost:9933");
    }

    #[test]
    fn test_signed_block_deserialize() {
        let json = json!({
            "block": {
                "header": {
                    "parentHash": format!("0x{}", "11".repeat(32)),
                    "number": "0x10",
                    "stateRoot": "0x00",
                    "extrinsicsRoot": "0x00",
                    "digest": { "logs": [] }
                },
                "extrinsics": ["0x280402000b", "0x"]
            },
            "justifications": null
        });
        let signed: SignedBlock = serde_json::from_value(json).unwrap();
        assert_eq!(signed.block.header.number, 16);
        assert_eq!(signed.block.extrinsics.len(), 2);
        assert_eq!(blake2_256(&decode_hex(&signed.block.extrinsics[1]).unwrap()), blake2_256(&[]));
    }

    #[test]
    fn test_parse_hash() {
        let hash = Hash([0xcd; 32]);
        assert_eq!(parse_hash(json!(hash.to_hex()), "test").unwrap(), hash);
        assert!(parse_hash(json!(null), "test").is_err());
        assert!(parse_hash(json!("0x12"), "test").is_err());
    }
}
