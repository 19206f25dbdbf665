//! The chain client capability consumed by the transaction engine.
//!
//! Implementations own the runtime metadata and SCALE codec; the engine only
//! sees typed values. [`crate::NodeRpc`] covers the raw RPC half of an
//! implementation.

use async_trait::async_trait;
use polymesh_types::{Address, Balance, Hash, IdentityId, TxTag};

use crate::error::RpcError;
use crate::types::{
    AccountBalance, Block, Call, EventRecord, Header, ProtocolFee, RuntimeVersion, SignedExtrinsic,
    SignerPayload, StatusSubscription, Subsidy,
};

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether the transport can push extrinsic status updates (websocket).
    fn supports_subscription(&self) -> bool;

    async fn genesis_hash(&self) -> Result<Hash, RpcError>;

    async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError>;

    async fn finalized_head(&self) -> Result<Hash, RpcError>;

    /// Header of `hash`, or of the best block when `None`.
    async fn header(&self, hash: Option<&Hash>) -> Result<Header, RpcError>;

    async fn block(&self, hash: &Hash) -> Result<Block, RpcError>;

    /// Hash of the canonical block at `number`, if it exists.
    async fn block_hash(&self, number: u64) -> Result<Option<Hash>, RpcError>;

    /// All events emitted in a block.
    async fn events(&self, block_hash: &Hash) -> Result<Vec<EventRecord>, RpcError>;

    /// Next usable nonce for `address`, pending pool included.
    async fn account_next_index(&self, address: &Address) -> Result<u32, RpcError>;

    /// SCALE-encoded call.
    async fn encode_call(&self, call: &Call) -> Result<Vec<u8>, RpcError>;

    /// Bytes a signer must sign for `payload`.
    async fn encode_payload(&self, payload: &SignerPayload) -> Result<Vec<u8>, RpcError>;

    /// Submit without a subscription; returns the extrinsic hash.
    async fn submit(&self, extrinsic: &SignedExtrinsic) -> Result<Hash, RpcError>;

    async fn submit_and_watch(&self, extrinsic: &SignedExtrinsic) -> Result<StatusSubscription, RpcError>;

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), RpcError>;

    /// Protocol fee per tag. Tags without a fee may be omitted.
    async fn protocol_fees(&self, tags: &[TxTag]) -> Result<Vec<ProtocolFee>, RpcError>;

    /// Estimated weight fee for `call` signed by `signer`.
    async fn partial_fee(&self, call: &Call, signer: &Address) -> Result<Balance, RpcError>;

    async fn account_balance(&self, address: &Address) -> Result<AccountBalance, RpcError>;

    /// Active subsidy for `beneficiary`, if any.
    async fn subsidy(&self, beneficiary: &Address) -> Result<Option<Subsidy>, RpcError>;

    async fn primary_account(&self, identity: &IdentityId) -> Result<Address, RpcError>;

    /// Identity configured to pay for the multisig's transactions, if any.
    async fn multi_sig_payer(&self, multi_sig: &Address) -> Result<Option<IdentityId>, RpcError>;
}
