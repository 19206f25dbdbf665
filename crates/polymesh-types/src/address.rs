//! SS58 address parsing, validation, and creation.
//!
//! Addresses are kept in their SS58 text form; the public key and network
//! prefix are recovered on demand. The checksum is the first two bytes of
//! `blake2b-512("SS58PRE" || prefix || public key)`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::PUBLIC_KEY_SIZE;

const SS58_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be a non-empty string")]
    Empty,

    #[error("base58 decode error: {0}")]
    Base58(String),

    #[error("invalid address length ({0})")]
    InvalidLength(usize),

    #[error("reserved or unsupported SS58 prefix byte 0x{0:02x}")]
    UnsupportedPrefix(u8),

    #[error("SS58 format {0} is out of range")]
    FormatOutOfRange(u16),

    #[error("invalid checksum")]
    InvalidChecksum,
}

/// An SS58-encoded account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Parse and validate an SS58 address string.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        decode_ss58(address)?;
        Ok(Self(address.to_string()))
    }

    /// Encode a 32-byte public key under the given SS58 format.
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_SIZE], format: u16) -> Result<Self, AddressError> {
        encode_ss58(public_key, format).map(Self)
    }

    /// Public key and SS58 format encoded in this address.
    pub fn decode(&self) -> ([u8; PUBLIC_KEY_SIZE], u16) {
        // Constructors validate the encoding, so decoding cannot fail here.
        decode_ss58(&self.0).unwrap_or(([0u8; PUBLIC_KEY_SIZE], 0))
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.decode().0
    }

    pub fn format(&self) -> u16 {
        self.decode().1
    }

    /// Re-encode the same public key under another SS58 format.
    pub fn with_format(&self, format: u16) -> Result<Self, AddressError> {
        Self::from_public_key(&self.public_key(), format)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Validate an SS58 address string, optionally pinning its format.
pub fn is_valid_address(address: &str, expected_format: Option<u16>) -> bool {
    match decode_ss58(address) {
        Ok((_, format)) => expected_format.map_or(true, |expected| expected == format),
        Err(_) => false,
    }
}

/// Encode a public key to its SS58 representation.
pub fn encode_ss58(public_key: &[u8; PUBLIC_KEY_SIZE], format: u16) -> Result<String, AddressError> {
    let mut payload = encode_format(format)?;
    payload.extend_from_slice(public_key);

    let checksum = ss58_checksum(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_SIZE]);

    Ok(bs58::encode(payload).into_string())
}

/// Decode an SS58 address into its public key and format.
pub fn decode_ss58(address: &str) -> Result<([u8; PUBLIC_KEY_SIZE], u16), AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;

    let (format, prefix_len) = decode_format(&data)?;

    if data.len() != prefix_len + PUBLIC_KEY_SIZE + CHECKSUM_SIZE {
        return Err(AddressError::InvalidLength(data.len()));
    }

    let body_end = data.len() - CHECKSUM_SIZE;
    let checksum = ss58_checksum(&data[..body_end]);
    if data[body_end..] != checksum[..CHECKSUM_SIZE] {
        return Err(AddressError::InvalidChecksum);
    }

    let mut public_key = [0u8; PUBLIC_KEY_SIZE];
    public_key.copy_from_slice(&data[prefix_len..body_end]);
    Ok((public_key, format))
}

fn encode_format(format: u16) -> Result<Vec<u8>, AddressError> {
    match format {
        0..=63 => Ok(vec![format as u8]),
        64..=16383 => {
            let first = ((format & 0b0000_0000_1111_1100) as u8) >> 2 | 0b0100_0000;
            let second = ((format >> 8) as u8) | (((format & 0b0000_0000_0000_0011) as u8) << 6);
            Ok(vec![first, second])
        }
        _ => Err(AddressError::FormatOutOfRange(format)),
    }
}

fn decode_format(data: &[u8]) -> Result<(u16, usize), AddressError> {
    let first = *data.first().ok_or(AddressError::InvalidLength(0))?;
    match first {
        0..=63 => Ok((first as u16, 1)),
        64..=127 => {
            let second = *data.get(1).ok_or(AddressError::InvalidLength(data.len()))?;
            let lower = (first << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            Ok(((lower as u16) | ((upper as u16) << 8), 2))
        }
        other => Err(AddressError::UnsupportedPrefix(other)),
    }
}

fn ss58_checksum(payload: &[u8]) -> [u8; 64] {
    let hash = blake2b_simd::Params::new()
        .hash_length(64)
        .to_state()
        .update(SS58_PREFIX)
        .update(payload)
        .finalize();
    let mut out = [0u8; 64];
    out.copy_from_slice(hash.as_bytes());
    out
}
