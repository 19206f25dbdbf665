//! Multisig proposal wrapping and proposal id extraction.

use log::info;
use polymesh_rpc::{Call, CallArg};
use polymesh_types::tags::{self, events};
use polymesh_types::{MultiSig, MultiSigProposal};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TxError;
use crate::submit::TransactionReceipt;

/// Wrap `call` in `multiSig.createProposal`, with an optional expiry in
/// milliseconds since the epoch.
pub fn wrap_as_proposal(multi_sig: &MultiSig, call: Call, expiry: Option<SystemTime>) -> Call {
    let expiry = expiry
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|since_epoch| Value::from(since_epoch.as_millis() as u64))
        .unwrap_or(Value::Null);

    Call::with_args(
        tags::MULTI_SIG_CREATE_PROPOSAL,
        vec![
            CallArg::Value(Value::String(multi_sig.address.to_string())),
            call.into(),
            CallArg::Value(expiry),
        ],
    )
}

/// Read the new proposal's id from the last `multiSig.ProposalAdded` event.
pub fn proposal_from_receipt(
    multi_sig: &MultiSig,
    receipt: &TransactionReceipt,
) -> Result<MultiSigProposal, TxError> {
    let event = receipt
        .filter_events(events::MULTI_SIG, events::PROPOSAL_ADDED)
        .last()
        .ok_or_else(|| TxError::UnexpectedEvent("no ProposalAdded event in the receipt".into()))?;

    let id = event
        .event
        .data
        .last()
        .and_then(|value| value.as_u64().or_else(|| value.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| TxError::UnexpectedEvent(format!("malformed ProposalAdded data: {:?}", event.event.data)))?;

    let proposal = MultiSigProposal::new(multi_sig.address.clone(), id);
    info!("created proposal {}", proposal);
    Ok(proposal)
}
