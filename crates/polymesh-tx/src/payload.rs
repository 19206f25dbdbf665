//! Unsigned, externally signable payloads.

use polymesh_rpc::{Call, SignerPayload, SignerPayloadRaw};
use polymesh_types::constants::{EXTRINSIC_VERSION, SIGNED_EXTENSIONS};
use polymesh_types::{Address, Balance, Mortality};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::TxError;

/// Everything an offline signer needs, plus caller-supplied metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignablePayload {
    pub payload: SignerPayload,
    pub raw_payload: SignerPayloadRaw,
    /// Hex-encoded call.
    pub method: String,
    pub metadata: BTreeMap<String, String>,
    /// Multisig whose proposal this payload creates, if wrapped.
    pub multi_sig: Option<Address>,
}

/// Build the signer payload for `call`, anchored at the finalized head.
///
/// Immortal payloads reference the genesis block; mortal ones reference the
/// anchor block. A missing nonce is fetched from the node.
pub async fn build_signer_payload(
    ctx: &Context,
    call: &Call,
    signer: &Address,
    nonce: Option<u32>,
    mortality: Mortality,
) -> Result<SignerPayload, TxError> {
    let chain = ctx.chain();

    let genesis_hash = chain.genesis_hash().await?;
    let runtime = chain.runtime_version().await?;
    let head_hash = chain.finalized_head().await?;
    let head = chain.header(Some(&head_hash)).await?;

    let era = mortality.era_at(head.number, ctx.config().default_lifetime);
    let block_hash = if era.is_immortal() { genesis_hash } else { head_hash };

    let nonce = match nonce {
        Some(nonce) => nonce,
        None => chain.account_next_index(signer).await?,
    };
    let method = format!("0x{}", hex::encode(chain.encode_call(call).await?));

    Ok(SignerPayload {
        address: signer.clone(),
        block_hash,
        block_number: head.number,
        era,
        genesis_hash,
        method,
        nonce: nonce as u64,
        spec_version: runtime.spec_version as u64,
        tip: Balance::ZERO,
        transaction_version: runtime.transaction_version as u64,
        signed_extensions: SIGNED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        version: EXTRINSIC_VERSION,
    })
}

/// Raw bytes to sign for `payload`, as produced by the chain's codec.
pub async fn raw_payload(ctx: &Context, payload: &SignerPayload) -> Result<SignerPayloadRaw, TxError> {
    let bytes = ctx.chain().encode_payload(payload).await?;
    Ok(SignerPayloadRaw::new(payload.address.clone(), &bytes))
}

pub(crate) async fn build_signable_payload(
    ctx: &Context,
    call: &Call,
    signer: &Address,
    nonce: Option<u32>,
    mortality: Mortality,
    metadata: BTreeMap<String, String>,
    multi_sig: Option<Address>,
) -> Result<SignablePayload, TxError> {
    let payload = build_signer_payload(ctx, call, signer, nonce, mortality).await?;
    let raw_payload = raw_payload(ctx, &payload).await?;
    Ok(SignablePayload {
        method: payload.method.clone(),
        payload,
        raw_payload,
        metadata,
        multi_sig,
    })
}
