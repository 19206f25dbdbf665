//! Chain primitives for the Polymesh client.
//!
//! This crate provides the foundational types shared by the RPC layer and the
//! transaction engine: SS58 addresses, 32-byte hashes and identity ids, POLYX
//! balances, transaction tags, mortality/era encoding, and plain entity
//! projections.

pub mod address;
pub mod balance;
pub mod constants;
pub mod entities;
pub mod era;
pub mod hash;
pub mod tags;

pub use address::{Address, AddressError};
pub use balance::Balance;
pub use entities::{Account, Identity, MultiSig, MultiSigProposal};
pub use era::{Era, EraError, Mortality};
pub use hash::{blake2_256, Hash, HexError, IdentityId};
pub use tags::TxTag;
