//! Polymesh network constants.

/// Decimal places of the POLYX token.
pub const POLYX_DECIMALS: u32 = 6;

/// Base units per whole POLYX.
pub const POLYX_UNIT: u128 = 1_000_000;

/// SS58 format registered for Polymesh mainnet and testnet.
pub const POLYMESH_SS58_FORMAT: u16 = 12;

/// Generic substrate SS58 format (dev chains).
pub const SUBSTRATE_SS58_FORMAT: u16 = 42;

/// Account public key size (sr25519/ed25519).
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Default lifetime, in blocks, of a mortal transaction.
pub const DEFAULT_LIFETIME: u64 = 64;

/// Era period bounds enforced by the runtime.
pub const MIN_ERA_PERIOD: u64 = 4;
pub const MAX_ERA_PERIOD: u64 = 1 << 16;

/// Extrinsic format version used in signer payloads.
pub const EXTRINSIC_VERSION: u8 = 4;

/// Signed extensions carried by Polymesh extrinsics, in encoding order.
pub const SIGNED_EXTENSIONS: &[&str] = &[
    "CheckSpecVersion",
    "CheckTxVersion",
    "CheckGenesis",
    "CheckMortality",
    "CheckNonce",
    "CheckWeight",
    "ChargeTransactionPayment",
];
