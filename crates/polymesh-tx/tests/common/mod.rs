//! In-memory chain, indexer and wallet shared by the engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use polymesh_rpc::error::codes;
use polymesh_rpc::{
    AccountBalance, Block, Call, ChainClient, DispatchError, EventRecord, GraphQlQuery, Header, Middleware, Phase,
    ProtocolFee, RpcError, RuntimeVersion, SignedExtrinsic, SignerPayload, SignerPayloadRaw, StatusSubscription,
    StatusUpdate, Subsidy,
};
use polymesh_tx::{Clock, Context, EngineConfig, SignError, Signer, SigningManager};
use polymesh_types::tags::events;
use polymesh_types::{blake2_256, tags, Address, Balance, Hash, IdentityId, TxTag};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const START_HEIGHT: u64 = 1000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn address(seed: u8) -> Address {
    Address::from_public_key(&[seed; 32], 12).unwrap()
}

pub fn identity(seed: u8) -> IdentityId {
    IdentityId([seed; 32])
}

pub fn block_hash(number: u64) -> Hash {
    blake2_256(&number.to_le_bytes())
}

/// What happens to the next submitted extrinsic.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Failed(DispatchError),
    Dropped,
    Invalid,
    Usurped,
    FinalityTimeout,
    /// Included, but only a `Finalized` update is pushed, without events.
    FinalizedOnly,
    /// A fork block holding the extrinsic is retracted before it lands.
    RetractedFirst,
    /// The node refuses the extrinsic outright.
    PoolRejection,
}

impl Outcome {
    fn is_included(&self) -> bool {
        matches!(
            self,
            Outcome::Success | Outcome::Failed(_) | Outcome::FinalizedOnly | Outcome::RetractedFirst
        )
    }
}

#[derive(Default)]
pub struct ChainState {
    pub head: u64,
    pub blocks: HashMap<Hash, Block>,
    pub events: HashMap<Hash, Vec<EventRecord>>,
    pub submitted: Vec<SignedExtrinsic>,
    pub unsubscribed: Vec<String>,
    pub estimated: Vec<TxTag>,
    pub finalized_head_calls: usize,
}

pub struct MockChain {
    pub subscription: bool,
    pub protocol_fees: HashMap<TxTag, Balance>,
    pub partial_fees: HashMap<TxTag, Balance>,
    pub balances: HashMap<Address, Balance>,
    pub subsidies: HashMap<Address, Subsidy>,
    pub multi_sig_payers: HashMap<Address, IdentityId>,
    pub primary_accounts: HashMap<IdentityId, Address>,
    pub next_index: u32,
    pub outcome: Outcome,
    /// Events emitted by the extrinsic besides the success/failure marker.
    pub extra_events: Vec<(String, String, Vec<Value>)>,
    pub fail_unsubscribe: bool,
    /// Empty blocks finalized right before the including block (polling).
    pub blocks_before_inclusion: u64,
    /// Empty blocks finalized right after the including block (polling).
    pub blocks_after_inclusion: u64,
    /// Finalize a new empty block on every finalized-head query.
    pub auto_advance: bool,
    pub state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        let mut state = ChainState {
            head: START_HEIGHT,
            ..Default::default()
        };
        for number in [0, START_HEIGHT] {
            state.blocks.insert(block_hash(number), empty_block(number));
        }

        let mut partial_fees = HashMap::new();
        partial_fees.insert(tags::UTILITY_BATCH_ALL, Balance(10));

        Self {
            subscription: true,
            protocol_fees: HashMap::new(),
            partial_fees,
            balances: HashMap::new(),
            subsidies: HashMap::new(),
            multi_sig_payers: HashMap::new(),
            primary_accounts: HashMap::new(),
            next_index: 7,
            outcome: Outcome::Success,
            extra_events: Vec::new(),
            fail_unsubscribe: false,
            blocks_before_inclusion: 0,
            blocks_after_inclusion: 0,
            auto_advance: false,
            state: Mutex::new(state),
        }
    }

    pub fn polling() -> Self {
        Self {
            subscription: false,
            ..Self::new()
        }
    }

    pub fn with_balance(mut self, address: Address, balance: u128) -> Self {
        self.balances.insert(address, Balance(balance));
        self
    }

    pub fn with_protocol_fee(mut self, tag: TxTag, fee: u128) -> Self {
        self.protocol_fees.insert(tag, Balance(fee));
        self
    }

    pub fn submitted(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn last_submitted(&self) -> Option<SignedExtrinsic> {
        self.state.lock().unwrap().submitted.last().cloned()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.state.lock().unwrap().unsubscribed.clone()
    }

    pub fn estimated(&self) -> Vec<TxTag> {
        self.state.lock().unwrap().estimated.clone()
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    fn push_block(&self, state: &mut ChainState, extrinsics: Vec<Hash>, records: Vec<EventRecord>) -> Hash {
        let number = state.head + 1;
        let mut block = empty_block(number);
        block.extrinsic_hashes.extend(extrinsics);
        let hash = block.hash;
        state.blocks.insert(hash, block);
        state.events.insert(hash, records);
        state.head = number;
        hash
    }

    /// Include `tx_hash` at index 1, after a timestamp extrinsic.
    fn include(&self, state: &mut ChainState, tx_hash: Hash) -> (Hash, Vec<EventRecord>) {
        let mut records = vec![EventRecord::new(
            Phase::ApplyExtrinsic(0),
            events::SYSTEM,
            events::EXTRINSIC_SUCCESS,
            vec![],
        )];
        for (section, method, data) in &self.extra_events {
            records.push(EventRecord::new(Phase::ApplyExtrinsic(1), section, method, data.clone()));
        }
        records.push(match &self.outcome {
            Outcome::Failed(err) => EventRecord::new(
                Phase::ApplyExtrinsic(1),
                events::SYSTEM,
                events::EXTRINSIC_FAILED,
                vec![dispatch_error_data(err), json!({})],
            ),
            _ => EventRecord::new(Phase::ApplyExtrinsic(1), events::SYSTEM, events::EXTRINSIC_SUCCESS, vec![]),
        });
        records.push(EventRecord::new(Phase::Finalization, "treasury", "Rewarded", vec![]));

        let timestamp = blake2_256(format!("timestamp-{}", state.head + 1).as_bytes());
        let hash = self.push_block(state, vec![timestamp, tx_hash], records.clone());
        (hash, records)
    }

    fn record(&self, extrinsic: &SignedExtrinsic) -> Result<Hash, RpcError> {
        if self.outcome == Outcome::PoolRejection {
            return Err(RpcError::Rpc {
                code: codes::POOL_TOO_LOW_PRIORITY,
                message: "Priority is too low".into(),
                method: "author_submitExtrinsic".into(),
            });
        }
        let tx_hash = blake2_256(&serde_json::to_vec(extrinsic)?);
        self.state.lock().unwrap().submitted.push(extrinsic.clone());
        Ok(tx_hash)
    }
}

fn empty_block(number: u64) -> Block {
    Block {
        hash: block_hash(number),
        header: Header {
            parent_hash: block_hash(number.saturating_sub(1)),
            number,
        },
        extrinsic_hashes: vec![],
    }
}

fn dispatch_error_data(err: &DispatchError) -> Value {
    serde_json::to_value(err).unwrap()
}

fn missing(context: impl Into<String>) -> RpcError {
    RpcError::NoResult {
        context: context.into(),
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn supports_subscription(&self) -> bool {
        self.subscription
    }

    async fn genesis_hash(&self) -> Result<Hash, RpcError> {
        Ok(block_hash(0))
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion, RpcError> {
        Ok(RuntimeVersion {
            spec_name: "polymesh_testnet".into(),
            spec_version: 7_000_000,
            transaction_version: 7,
        })
    }

    async fn finalized_head(&self) -> Result<Hash, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.finalized_head_calls += 1;
        if self.auto_advance {
            self.push_block(&mut state, vec![], vec![]);
        }
        Ok(block_hash(state.head))
    }

    async fn header(&self, hash: Option<&Hash>) -> Result<Header, RpcError> {
        let state = self.state.lock().unwrap();
        let hash = hash.copied().unwrap_or_else(|| block_hash(state.head));
        state
            .blocks
            .get(&hash)
            .map(|block| block.header.clone())
            .ok_or_else(|| missing(format!("header {}", hash)))
    }

    async fn block(&self, hash: &Hash) -> Result<Block, RpcError> {
        self.state
            .lock()
            .unwrap()
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| missing(format!("block {}", hash)))
    }

    async fn block_hash(&self, number: u64) -> Result<Option<Hash>, RpcError> {
        let hash = block_hash(number);
        Ok(self.state.lock().unwrap().blocks.contains_key(&hash).then_some(hash))
    }

    async fn events(&self, block_hash: &Hash) -> Result<Vec<EventRecord>, RpcError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .events
            .get(block_hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn account_next_index(&self, _address: &Address) -> Result<u32, RpcError> {
        Ok(self.next_index)
    }

    async fn encode_call(&self, call: &Call) -> Result<Vec<u8>, RpcError> {
        Ok(serde_json::to_vec(call)?)
    }

    async fn encode_payload(&self, payload: &SignerPayload) -> Result<Vec<u8>, RpcError> {
        Ok(serde_json::to_vec(payload)?)
    }

    async fn submit(&self, extrinsic: &SignedExtrinsic) -> Result<Hash, RpcError> {
        let tx_hash = self.record(extrinsic)?;
        let mut state = self.state.lock().unwrap();
        if self.outcome.is_included() {
            for _ in 0..self.blocks_before_inclusion {
                self.push_block(&mut state, vec![], vec![]);
            }
            self.include(&mut state, tx_hash);
            for _ in 0..self.blocks_after_inclusion {
                self.push_block(&mut state, vec![], vec![]);
            }
        }
        Ok(tx_hash)
    }

    async fn submit_and_watch(&self, extrinsic: &SignedExtrinsic) -> Result<StatusSubscription, RpcError> {
        let tx_hash = self.record(extrinsic)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();

        let _ = tx.send(StatusUpdate::Ready);
        match &self.outcome {
            Outcome::Success | Outcome::Failed(_) => {
                let _ = tx.send(StatusUpdate::Broadcast(vec!["peer-1".into()]));
                let (block_hash, events) = self.include(&mut state, tx_hash);
                let _ = tx.send(StatusUpdate::InBlock { block_hash, events });
            }
            Outcome::FinalizedOnly => {
                let (block_hash, _) = self.include(&mut state, tx_hash);
                let _ = tx.send(StatusUpdate::Finalized {
                    block_hash,
                    events: vec![],
                });
            }
            Outcome::RetractedFirst => {
                let _ = tx.send(StatusUpdate::Retracted(blake2_256(b"fork")));
                let (block_hash, events) = self.include(&mut state, tx_hash);
                let _ = tx.send(StatusUpdate::InBlock { block_hash, events });
            }
            Outcome::Dropped => {
                let _ = tx.send(StatusUpdate::Dropped);
            }
            Outcome::Invalid => {
                let _ = tx.send(StatusUpdate::Invalid);
            }
            Outcome::Usurped => {
                let _ = tx.send(StatusUpdate::Usurped(blake2_256(b"replacement")));
            }
            Outcome::FinalityTimeout => {
                let _ = tx.send(StatusUpdate::FinalityTimeout(blake2_256(b"stale")));
            }
            Outcome::PoolRejection => unreachable!("rejected before subscribing"),
        }

        Ok(StatusSubscription {
            id: format!("sub-{}", state.submitted.len()),
            tx_hash,
            updates: rx,
        })
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), RpcError> {
        self.state.lock().unwrap().unsubscribed.push(subscription_id.to_string());
        if self.fail_unsubscribe {
            return Err(RpcError::Other("websocket closed".into()));
        }
        Ok(())
    }

    async fn protocol_fees(&self, tags: &[TxTag]) -> Result<Vec<ProtocolFee>, RpcError> {
        Ok(tags
            .iter()
            .filter_map(|tag| {
                self.protocol_fees.get(tag).map(|fee| ProtocolFee {
                    tag: tag.clone(),
                    fee: *fee,
                })
            })
            .collect())
    }

    async fn partial_fee(&self, call: &Call, _signer: &Address) -> Result<Balance, RpcError> {
        self.state.lock().unwrap().estimated.push(call.tag.clone());
        Ok(self.partial_fees.get(&call.tag).copied().unwrap_or(Balance(5)))
    }

    async fn account_balance(&self, address: &Address) -> Result<AccountBalance, RpcError> {
        let free = self.balances.get(address).copied().unwrap_or_default();
        Ok(AccountBalance {
            free,
            locked: Balance::ZERO,
            total: free,
        })
    }

    async fn subsidy(&self, beneficiary: &Address) -> Result<Option<Subsidy>, RpcError> {
        Ok(self.subsidies.get(beneficiary).cloned())
    }

    async fn primary_account(&self, identity: &IdentityId) -> Result<Address, RpcError> {
        self.primary_accounts
            .get(identity)
            .cloned()
            .ok_or_else(|| missing(format!("primary key of {}", identity)))
    }

    async fn multi_sig_payer(&self, multi_sig: &Address) -> Result<Option<IdentityId>, RpcError> {
        Ok(self.multi_sig_payers.get(multi_sig).copied())
    }
}

/// Indexer whose latest block follows a script; the last value repeats.
pub struct MockMiddleware {
    latest: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
    pub queries: AtomicUsize,
}

impl MockMiddleware {
    pub fn new(script: Vec<u64>) -> Self {
        Self {
            latest: Mutex::new(script.into()),
            last: Mutex::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Report `latest` from the next query on.
    pub fn advance_to(&self, latest: u64) {
        self.latest.lock().unwrap().push_back(latest);
    }
}

#[async_trait]
impl Middleware for MockMiddleware {
    async fn query(&self, _query: &GraphQlQuery) -> Result<Value, RpcError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.latest.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(json!({ "blocks": { "nodes": [{ "blockId": last.to_string() }] } }))
    }
}

#[derive(Default)]
pub struct MockSigner {
    pub reject: bool,
    pub signed: Mutex<Vec<SignerPayloadRaw>>,
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign_payload(&self, _payload: &SignerPayload, raw: &SignerPayloadRaw) -> Result<Vec<u8>, SignError> {
        if self.reject {
            return Err(SignError::Rejected);
        }
        self.signed.lock().unwrap().push(raw.clone());
        Ok(vec![0xab; 64])
    }
}

pub struct MockSigningManager {
    pub accounts: Vec<Address>,
    pub signer: Arc<MockSigner>,
}

#[async_trait]
impl SigningManager for MockSigningManager {
    async fn accounts(&self) -> Result<Vec<Address>, SignError> {
        Ok(self.accounts.clone())
    }

    fn external_signer(&self) -> Arc<dyn Signer> {
        self.signer.clone()
    }
}

/// Sleeps only yield, so polling loops finish immediately.
#[derive(Default)]
pub struct InstantClock {
    pub sleeps: AtomicUsize,
}

impl InstantClock {
    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub middleware: Arc<MockMiddleware>,
    pub signer: Arc<MockSigner>,
    pub clock: Arc<InstantClock>,
    pub ctx: Arc<Context>,
}

/// Alice (`address(1)`) and Bob (`address(2)`) in the wallet, Alice signs by default.
pub fn alice() -> Address {
    address(1)
}

pub fn bob() -> Address {
    address(2)
}

pub struct HarnessBuilder {
    chain: MockChain,
    middleware: Option<Vec<u64>>,
    reject_signature: bool,
    config: EngineConfig,
}

impl HarnessBuilder {
    pub fn new(chain: MockChain) -> Self {
        init_logger();
        Self {
            chain,
            middleware: Some(vec![]),
            reject_signature: false,
            config: EngineConfig::default(),
        }
    }

    pub fn middleware_script(mut self, script: Vec<u64>) -> Self {
        self.middleware = Some(script);
        self
    }

    pub fn without_middleware(mut self) -> Self {
        self.middleware = None;
        self
    }

    pub fn reject_signature(mut self) -> Self {
        self.reject_signature = true;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let chain = Arc::new(self.chain);
        let middleware = Arc::new(MockMiddleware::new(self.middleware.clone().unwrap_or_default()));
        let signer = Arc::new(MockSigner {
            reject: self.reject_signature,
            ..Default::default()
        });
        let clock = Arc::new(InstantClock::default());
        let manager = Arc::new(MockSigningManager {
            accounts: vec![alice(), bob()],
            signer: signer.clone(),
        });

        let mut builder = Context::builder(chain.clone())
            .signing_manager(manager)
            .clock(clock.clone())
            .config(self.config);
        if self.middleware.is_some() {
            builder = builder.middleware(middleware.clone());
        }

        Harness {
            chain,
            middleware,
            signer,
            clock,
            ctx: builder.build(),
        }
    }
}
