//! Chain data shapes exchanged with the node.
//!
//! Calls are kept as `(tag, args)` trees; turning them into SCALE bytes is the
//! chain client's job (`ChainClient::encode_call`).

use polymesh_types::{Address, Balance, Era, Hash, TxTag};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

// =============================================================================
// Calls
// =============================================================================

/// A chain call with its bound arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub tag: TxTag,
    #[serde(default)]
    pub args: Vec<CallArg>,
}

/// One argument of a [`Call`]. Nested calls appear in batch and proposal wrappers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallArg {
    Call(Box<Call>),
    Calls(Vec<Call>),
    Value(Value),
}

impl Call {
    pub fn new(tag: TxTag, args: Vec<Value>) -> Self {
        Self {
            tag,
            args: args.into_iter().map(CallArg::Value).collect(),
        }
    }

    pub fn with_args(tag: TxTag, args: Vec<CallArg>) -> Self {
        Self { tag, args }
    }

    /// Calls nested directly inside this one, in argument order.
    pub fn inner_calls(&self) -> Vec<&Call> {
        self.args
            .iter()
            .flat_map(|arg| match arg {
                CallArg::Call(call) => vec![call.as_ref()],
                CallArg::Calls(calls) => calls.iter().collect(),
                CallArg::Value(_) => vec![],
            })
            .collect()
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        CallArg::Value(value)
    }
}

impl From<Call> for CallArg {
    fn from(call: Call) -> Self {
        CallArg::Call(Box::new(call))
    }
}

impl From<Vec<Call>> for CallArg {
    fn from(calls: Vec<Call>) -> Self {
        CallArg::Calls(calls)
    }
}

// =============================================================================
// Blocks and events
// =============================================================================

/// Block header as returned by `chain_getHeader`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: Hash,
    #[serde(deserialize_with = "de_block_number")]
    pub number: u64,
}

/// A block with the hashes of its extrinsics, in block order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub hash: Hash,
    pub header: Header,
    pub extrinsic_hashes: Vec<Hash>,
}

impl Block {
    /// Position of an extrinsic inside this block.
    pub fn index_of(&self, tx_hash: &Hash) -> Option<u32> {
        self.extrinsic_hashes
            .iter()
            .position(|hash| hash == tx_hash)
            .map(|index| index as u32)
    }
}

/// Block numbers arrive as hex strings from the node, as plain numbers from mocks.
fn de_block_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("block number out of range")),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse(),
            };
            parsed.map_err(|_| serde::de::Error::custom(format!("invalid block number: {}", s)))
        }
        other => Err(serde::de::Error::custom(format!("invalid block number: {}", other))),
    }
}

/// Where in block execution an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    ApplyExtrinsic(u32),
    Finalization,
    Initialization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub section: String,
    pub method: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub phase: Phase,
    pub event: RuntimeEvent,
}

impl EventRecord {
    pub fn new(phase: Phase, section: &str, method: &str, data: Vec<Value>) -> Self {
        Self {
            phase,
            event: RuntimeEvent {
                section: section.to_string(),
                method: method.to_string(),
                data,
            },
        }
    }

    pub fn is(&self, section: &str, method: &str) -> bool {
        self.event.section == section && self.event.method == method
    }

    /// Whether the event was emitted while applying the extrinsic at `index`.
    pub fn applies_to(&self, index: u32) -> bool {
        self.phase == Phase::ApplyExtrinsic(index)
    }
}

// =============================================================================
// Dispatch outcome
// =============================================================================

/// Resolved module error: pallet, error name and documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleError {
    pub section: String,
    pub name: String,
    #[serde(default)]
    pub docs: String,
}

/// Why an included extrinsic failed to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchError {
    BadOrigin,
    CannotLookup,
    Module(ModuleError),
    Other(String),
}

impl DispatchError {
    /// Parse the first datum of a `system.ExtrinsicFailed` event.
    pub fn from_event_data(data: &[Value]) -> Self {
        match data.first() {
            Some(value) => serde_json::from_value(value.clone())
                .unwrap_or_else(|_| DispatchError::Other(value.to_string())),
            None => DispatchError::Other("no dispatch error in event".to_string()),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::BadOrigin => write!(f, "Bad origin"),
            DispatchError::CannotLookup => {
                write!(f, "Could not lookup information required to validate the transaction")
            }
            DispatchError::Module(err) if err.docs.is_empty() => {
                write!(f, "{}.{}", err.section, err.name)
            }
            DispatchError::Module(err) => write!(f, "{}.{}: {}", err.section, err.name, err.docs),
            DispatchError::Other(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

// =============================================================================
// Subscription updates
// =============================================================================

/// One push from an extrinsic status subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Future,
    Ready,
    Broadcast(Vec<String>),
    InBlock { block_hash: Hash, events: Vec<EventRecord> },
    Retracted(Hash),
    FinalityTimeout(Hash),
    Finalized { block_hash: Hash, events: Vec<EventRecord> },
    Usurped(Hash),
    Dropped,
    Invalid,
}

impl StatusUpdate {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StatusUpdate::Future => "future",
            StatusUpdate::Ready => "ready",
            StatusUpdate::Broadcast(_) => "broadcast",
            StatusUpdate::InBlock { .. } => "inBlock",
            StatusUpdate::Retracted(_) => "retracted",
            StatusUpdate::FinalityTimeout(_) => "finalityTimeout",
            StatusUpdate::Finalized { .. } => "finalized",
            StatusUpdate::Usurped(_) => "usurped",
            StatusUpdate::Dropped => "dropped",
            StatusUpdate::Invalid => "invalid",
        }
    }
}

/// A live extrinsic status subscription.
#[derive(Debug)]
pub struct StatusSubscription {
    pub id: String,
    pub tx_hash: Hash,
    pub updates: mpsc::UnboundedReceiver<StatusUpdate>,
}

// =============================================================================
// Signing
// =============================================================================

/// Unsigned payload handed to external signers, in the polkadot-js layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerPayload {
    pub address: Address,
    pub block_hash: Hash,
    #[serde(with = "hex_number")]
    pub block_number: u64,
    pub era: Era,
    pub genesis_hash: Hash,
    /// Hex-encoded call.
    pub method: String,
    #[serde(with = "hex_number")]
    pub nonce: u64,
    #[serde(with = "hex_number")]
    pub spec_version: u64,
    pub tip: Balance,
    #[serde(with = "hex_number")]
    pub transaction_version: u64,
    pub signed_extensions: Vec<String>,
    pub version: u8,
}

/// Raw bytes to sign for a [`SignerPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPayloadRaw {
    pub address: Address,
    /// Hex-encoded payload bytes.
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SignerPayloadRaw {
    pub fn new(address: Address, bytes: &[u8]) -> Self {
        Self {
            address,
            data: format!("0x{}", hex::encode(bytes)),
            kind: "payload".to_string(),
        }
    }
}

/// A payload together with its signature, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedExtrinsic {
    pub payload: SignerPayload,
    pub signature: Vec<u8>,
}

mod hex_number {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:08x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(s.strip_prefix("0x").unwrap_or(&s), 16).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Runtime and account state
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    #[serde(default)]
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountBalance {
    pub free: Balance,
    pub locked: Balance,
    pub total: Balance,
}

/// A subsidy relationship: `paying_account` covers fees up to `allowance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsidy {
    pub paying_account: Address,
    pub allowance: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFee {
    pub tag: TxTag,
    pub fee: Balance,
}

/// `payment_queryInfo` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDispatchInfo {
    #[serde(default)]
    pub weight: Value,
    #[serde(default)]
    pub class: String,
    pub partial_fee: Balance,
}

/// `system_health` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub peers: u64,
    pub is_syncing: bool,
    #[serde(default)]
    pub should_have_peers: bool,
}

impl Serialize for SignedExtrinsic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SignedExtrinsic", 2)?;
        state.serialize_field("payload", &self.payload)?;
        state.serialize_field("signature", &format!("0x{}", hex::encode(&self.signature)))?;
        state.end()
    }
}
