//! Signing seams: the wallet-side signer and the manager exposing accounts.

use async_trait::async_trait;
use polymesh_rpc::{SignerPayload, SignerPayloadRaw};
use polymesh_types::Address;
use std::sync::Arc;
use thiserror::Error;

use crate::error::TxError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("signature request rejected")]
    Rejected,

    #[error("signing failed: {0}")]
    Failed(String),
}

impl From<SignError> for TxError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Rejected => TxError::UserCancellation,
            SignError::Failed(msg) => TxError::Infrastructure(format!("signing failed: {}", msg)),
        }
    }
}

/// Produces signatures for signer payloads (wallet extension, keyring, HSM...).
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `raw.data` on behalf of `payload.address`.
    async fn sign_payload(&self, payload: &SignerPayload, raw: &SignerPayloadRaw) -> Result<Vec<u8>, SignError>;
}

/// Session-level holder of signing accounts.
#[async_trait]
pub trait SigningManager: Send + Sync {
    /// Addresses this manager can sign for.
    async fn accounts(&self) -> Result<Vec<Address>, SignError>;

    fn external_signer(&self) -> Arc<dyn Signer>;
}
