//! POLYX amounts in base units.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::constants::{POLYX_DECIMALS, POLYX_UNIT};

/// An amount of POLYX expressed in base units (10^-6 POLYX).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balance(pub u128);

impl Balance {
    pub const ZERO: Balance = Balance(0);

    /// Whole POLYX to base units.
    pub fn from_polyx(polyx: u64) -> Self {
        Self(polyx as u128 * POLYX_UNIT)
    }

    pub fn base_units(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Balance) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Balance) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_mul(self, factor: u32) -> Self {
        Self(self.0.saturating_mul(factor as u128))
    }
}

impl Add for Balance {
    type Output = Balance;

    fn add(self, rhs: Balance) -> Balance {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Balance) {
        *self = *self + rhs;
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Balance>>(iter: I) -> Self {
        iter.fold(Balance::ZERO, Add::add)
    }
}

impl From<u128> for Balance {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / POLYX_UNIT;
        let frac = self.0 % POLYX_UNIT;
        write!(f, "{}.{:0width$} POLYX", whole, frac, width = POLYX_DECIMALS as usize)
    }
}

// Chain RPCs return balances either as JSON numbers or as decimal/hex strings.
impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BalanceVisitor;

        impl serde::de::Visitor<'_> for BalanceVisitor {
            type Value = Balance;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a balance as number, decimal string, or hex string")
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Balance, E> {
                Ok(Balance(value as u128))
            }

            fn visit_u128<E: serde::de::Error>(self, value: u128) -> Result<Balance, E> {
                Ok(Balance(value))
            }

            fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Balance, E> {
                u128::try_from(value)
                    .map(Balance)
                    .map_err(|_| E::custom("negative balance"))
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Balance, E> {
                parse_balance(value).ok_or_else(|| E::custom(format!("invalid balance: {}", value)))
            }
        }

        deserializer.deserialize_any(BalanceVisitor)
    }
}

fn parse_balance(value: &str) -> Option<Balance> {
    match value.strip_prefix("0x") {
        Some(hex) => u128::from_str_radix(hex, 16).ok().map(Balance),
        None => value.parse().ok().map(Balance),
    }
}
