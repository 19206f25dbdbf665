//! Transaction tags (`pallet.call`) and the tags the engine treats specially.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Identifies a chain call as `pallet.call`, e.g. `asset.registerUniqueTicker`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxTag(Cow<'static, str>);

impl TxTag {
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(pallet: &str, call: &str) -> Self {
        Self(Cow::Owned(format!("{}.{}", pallet, call)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn pallet(&self) -> &str {
        self.as_str().split_once('.').map_or(self.as_str(), |(pallet, _)| pallet)
    }

    pub fn call(&self) -> &str {
        self.as_str().split_once('.').map_or("", |(_, call)| call)
    }

    /// Multisig approval/rejection calls, the only calls a multisig signer
    /// submits directly instead of through a proposal.
    pub fn is_multi_sig_vote(&self) -> bool {
        MULTI_SIG_VOTES.contains(self)
    }
}

impl fmt::Display for TxTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxTag {
    fn from(tag: &str) -> Self {
        Self(Cow::Owned(tag.to_string()))
    }
}

impl Serialize for TxTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TxTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(Cow::Owned(String::deserialize(deserializer)?)))
    }
}

pub const UTILITY_BATCH_ALL: TxTag = TxTag::from_static("utility.batchAll");

pub const MULTI_SIG_CREATE_PROPOSAL: TxTag = TxTag::from_static("multiSig.createProposal");
pub const MULTI_SIG_APPROVE: TxTag = TxTag::from_static("multiSig.approve");
pub const MULTI_SIG_REJECT: TxTag = TxTag::from_static("multiSig.reject");
pub const MULTI_SIG_APPROVE_AS_KEY: TxTag = TxTag::from_static("multiSig.approveAsKey");
pub const MULTI_SIG_REJECT_AS_KEY: TxTag = TxTag::from_static("multiSig.rejectAsKey");
pub const MULTI_SIG_APPROVE_AS_IDENTITY: TxTag = TxTag::from_static("multiSig.approveAsIdentity");
pub const MULTI_SIG_REJECT_AS_IDENTITY: TxTag = TxTag::from_static("multiSig.rejectAsIdentity");

pub const MULTI_SIG_VOTES: &[TxTag] = &[
    MULTI_SIG_APPROVE,
    MULTI_SIG_REJECT,
    MULTI_SIG_APPROVE_AS_KEY,
    MULTI_SIG_REJECT_AS_KEY,
    MULTI_SIG_APPROVE_AS_IDENTITY,
    MULTI_SIG_REJECT_AS_IDENTITY,
];

pub const STAKING_BOND: TxTag = TxTag::from_static("staking.bond");
pub const STAKING_BOND_EXTRA: TxTag = TxTag::from_static("staking.bondExtra");
pub const STAKING_REBOND: TxTag = TxTag::from_static("staking.rebond");

pub const BALANCES_TRANSFER: TxTag = TxTag::from_static("balances.transfer");
pub const ASSET_REGISTER_UNIQUE_TICKER: TxTag = TxTag::from_static("asset.registerUniqueTicker");
pub const ASSET_CREATE_ASSET: TxTag = TxTag::from_static("asset.createAsset");

/// Event names the engine inspects.
pub mod events {
    pub const SYSTEM: &str = "system";
    pub const EXTRINSIC_SUCCESS: &str = "ExtrinsicSuccess";
    pub const EXTRINSIC_FAILED: &str = "ExtrinsicFailed";
    pub const MULTI_SIG: &str = "multiSig";
    pub const PROPOSAL_ADDED: &str = "ProposalAdded";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parts() {
        let tag = TxTag::new("asset", "registerUniqueTicker");
        assert_eq!(tag, ASSET_REGISTER_UNIQUE_TICKER);
        assert_eq!(tag.pallet(), "asset");
        assert_eq!(tag.call(), "registerUniqueTicker");
    }

    #[test]
    fn test_multi_sig_votes() {
        assert!(MULTI_SIG_APPROVE.is_multi_sig_vote());
        assert!(TxTag::from("multiSig.rejectAsKey").is_multi_sig_vote());
        assert!(!MULTI_SIG_CREATE_PROPOSAL.is_multi_sig_vote());
        assert!(!BALANCES_TRANSFER.is_multi_sig_vote());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&UTILITY_BATCH_ALL).unwrap();
        assert_eq!(json, "\"utility.batchAll\"");
        let tag: TxTag = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, UTILITY_BATCH_ALL);
    }
}
