//! Transaction mortality and its on-chain era encoding.
//!
//! A mortal era is a `(period, phase)` pair: `period` is the lifetime rounded
//! up to a power of two within `[4, 65536]`, and `phase` is the anchor block
//! modulo `period`, quantized so it fits the two-byte encoding. An immortal
//! era encodes as the single byte `0x00`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::{MAX_ERA_PERIOD, MIN_ERA_PERIOD};
use crate::hash::to_prefixed_hex;

/// How long a signed payload stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mortality {
    /// Never expires.
    Immortal,
    /// Expires after `lifetime` blocks (or the configured default).
    Mortal { lifetime: Option<u64> },
}

impl Default for Mortality {
    fn default() -> Self {
        Mortality::Mortal { lifetime: None }
    }
}

impl Mortality {
    pub fn is_immortal(&self) -> bool {
        matches!(self, Mortality::Immortal)
    }

    /// Era anchored at `current_block`, using `default_lifetime` when no
    /// explicit lifetime was given.
    pub fn era_at(&self, current_block: u64, default_lifetime: u64) -> Era {
        match self {
            Mortality::Immortal => Era::Immortal,
            Mortality::Mortal { lifetime } => {
                Era::mortal(lifetime.unwrap_or(default_lifetime), current_block)
            }
        }
    }
}

/// Era of an extrinsic as the runtime sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Era {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EraError {
    #[error("empty era encoding")]
    Empty,

    #[error("truncated mortal era")]
    Truncated,

    #[error("invalid era hex: {0}")]
    Hex(String),
}

impl Era {
    /// Mortal era for a lifetime of `lifetime` blocks starting at `current`.
    pub fn mortal(lifetime: u64, current: u64) -> Self {
        let period = lifetime
            .checked_next_power_of_two()
            .unwrap_or(MAX_ERA_PERIOD)
            .clamp(MIN_ERA_PERIOD, MAX_ERA_PERIOD);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;
        Era::Mortal {
            period,
            phase: quantized_phase,
        }
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    /// First block at which an extrinsic with this era is valid, given a
    /// block `current` at or after its anchor.
    pub fn birth(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => (current.max(phase) - phase) / period * period + phase,
        }
    }

    /// First block at which the extrinsic is no longer valid.
    pub fn death(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current) + period,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Era::Immortal => vec![0x00],
            Era::Mortal { period, phase } => {
                let quantize_factor = (period >> 12).max(1);
                let low = (period.trailing_zeros().saturating_sub(1)).clamp(1, 15) as u16;
                let high = ((phase / quantize_factor) as u16) << 4;
                (low | high).to_le_bytes().to_vec()
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EraError> {
        let first = *bytes.first().ok_or(EraError::Empty)?;
        if first == 0 {
            return Ok(Era::Immortal);
        }
        let second = *bytes.get(1).ok_or(EraError::Truncated)?;
        let encoded = u16::from_le_bytes([first, second]) as u64;
        let period = 2u64 << (encoded % (1 << 4));
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        Ok(Era::Mortal { period, phase })
    }

    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.encode())
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::Immortal => write!(f, "immortal"),
            Era::Mortal { period, phase } => write!(f, "mortal(period={}, phase={})", period, phase),
        }
    }
}

impl Serialize for Era {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Era {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(|e| serde::de::Error::custom(EraError::Hex(e.to_string())))?;
        Era::decode(&bytes).map_err(serde::de::Error::custom)
    }
}
