//! Plain projections of the chain entities the transaction engine touches.
//!
//! These carry identifiers only; balances, permissions and the like are
//! queried live through the chain client when needed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::hash::IdentityId;

/// A key-holding account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}

/// An on-chain identity (DID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub did: IdentityId,
}

impl Identity {
    pub fn new(did: IdentityId) -> Self {
        Self { did }
    }
}

/// A multi-signature account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiSig {
    pub address: Address,
}

impl MultiSig {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

/// A proposal created on a multi-signature account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSigProposal {
    pub multi_sig: Address,
    pub id: u64,
}

impl MultiSigProposal {
    pub fn new(multi_sig: Address, id: u64) -> Self {
        Self { multi_sig, id }
    }
}

impl fmt::Display for MultiSigProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.multi_sig, self.id)
    }
}
