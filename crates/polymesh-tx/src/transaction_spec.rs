//! Immutable description of one transaction: what to call, who pays, how
//! long it lives and how its result is derived.

use futures::future::{BoxFuture, FutureExt};
use polymesh_rpc::Call;
use polymesh_types::{Address, Balance, Identity, Mortality, MultiSig, TxTag};
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::TxError;
use crate::submit::TransactionReceipt;

/// One chain call plus its fee inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct TxItem {
    pub call: Call,
    /// Protocol fee override; looked up from the fee schedule when `None`.
    pub fee: Option<Balance>,
    /// Scales the protocol fee (e.g. per-item counts).
    pub fee_multiplier: u32,
}

impl TxItem {
    pub fn new(call: Call) -> Self {
        Self {
            call,
            fee: None,
            fee_multiplier: 1,
        }
    }

    pub fn with_fee(mut self, fee: Balance) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_fee_multiplier(mut self, multiplier: u32) -> Self {
        self.fee_multiplier = multiplier;
        self
    }

    pub fn tag(&self) -> &TxTag {
        &self.call.tag
    }
}

/// A transaction is either one call or an atomic batch of calls.
#[derive(Debug, Clone, PartialEq)]
pub enum TxShape {
    Single(TxItem),
    Batch(Vec<TxItem>),
}

impl TxShape {
    pub fn items(&self) -> &[TxItem] {
        match self {
            TxShape::Single(item) => std::slice::from_ref(item),
            TxShape::Batch(items) => items,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, TxShape::Batch(_))
    }
}

/// Options applied when a call is wrapped in a multisig proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiSigOpts {
    pub expiry: Option<SystemTime>,
}

type SyncResolve<R> = Arc<dyn Fn(&TransactionReceipt) -> Result<R, TxError> + Send + Sync>;
type AsyncResolve<R> = Arc<dyn Fn(TransactionReceipt) -> BoxFuture<'static, Result<R, TxError>> + Send + Sync>;

/// Produces the transaction's logical result once it has landed on chain.
pub enum Resolver<R> {
    Value(R),
    Fn(SyncResolve<R>),
    Async(AsyncResolve<R>),
}

impl<R: Clone> Clone for Resolver<R> {
    fn clone(&self) -> Self {
        match self {
            Resolver::Value(value) => Resolver::Value(value.clone()),
            Resolver::Fn(f) => Resolver::Fn(f.clone()),
            Resolver::Async(f) => Resolver::Async(f.clone()),
        }
    }
}

impl<R> std::fmt::Debug for Resolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Resolver::Value(_) => "Value",
            Resolver::Fn(_) => "Fn",
            Resolver::Async(_) => "Async",
        };
        write!(f, "Resolver::{}", kind)
    }
}

impl<R: Clone + Send + Sync + 'static> Resolver<R> {
    pub fn value(value: R) -> Self {
        Resolver::Value(value)
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&TransactionReceipt) -> Result<R, TxError> + Send + Sync + 'static,
    {
        Resolver::Fn(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(TransactionReceipt) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, TxError>> + Send + 'static,
    {
        Resolver::Async(Arc::new(move |receipt: TransactionReceipt| f(receipt).boxed()))
    }

    pub async fn resolve(&self, receipt: &TransactionReceipt) -> Result<R, TxError> {
        match self {
            Resolver::Value(value) => Ok(value.clone()),
            Resolver::Fn(f) => f(receipt),
            Resolver::Async(f) => f(receipt.clone()).await,
        }
    }

    /// Post-process the resolved value. Runs only after a successful resolution.
    pub fn map<S, F>(self, transform: F) -> Resolver<S>
    where
        F: Fn(R) -> S + Send + Sync + 'static,
        S: Send + 'static,
    {
        let transform = Arc::new(transform);
        match self {
            Resolver::Value(value) => {
                Resolver::Fn(Arc::new(move |_: &TransactionReceipt| Ok(transform(value.clone()))))
            }
            Resolver::Fn(f) => Resolver::Fn(Arc::new(move |receipt: &TransactionReceipt| {
                f(receipt).map(|v| transform(v))
            })),
            Resolver::Async(f) => Resolver::Async(Arc::new(move |receipt: TransactionReceipt| {
                let transform = transform.clone();
                f(receipt).map(move |res| res.map(|v| transform(v))).boxed()
            })),
        }
    }
}

/// Everything needed to run one transaction.
#[derive(Debug, Clone)]
pub struct TransactionSpec<R> {
    pub shape: TxShape,
    pub resolver: Resolver<R>,
    pub mortality: Mortality,
    pub multi_sig: Option<MultiSig>,
    pub multi_sig_opts: MultiSigOpts,
    /// Identity whose primary account pays instead of the signer.
    pub paid_for_by: Option<Identity>,
    /// `None` looks up the next nonce when signing.
    pub nonce: Option<u32>,
    pub signing_address: Option<Address>,
}

impl TransactionSpec<()> {
    /// A single call with no result.
    pub fn new(call: Call) -> Self {
        Self::single(TxItem::new(call), Resolver::Value(()))
    }
}

impl<R: Clone + Send + Sync + 'static> TransactionSpec<R> {
    pub fn single(item: TxItem, resolver: Resolver<R>) -> Self {
        Self::with_shape(TxShape::Single(item), resolver)
    }

    pub fn batch(items: Vec<TxItem>, resolver: Resolver<R>) -> Self {
        Self::with_shape(TxShape::Batch(items), resolver)
    }

    fn with_shape(shape: TxShape, resolver: Resolver<R>) -> Self {
        Self {
            shape,
            resolver,
            mortality: Mortality::default(),
            multi_sig: None,
            multi_sig_opts: MultiSigOpts::default(),
            paid_for_by: None,
            nonce: None,
            signing_address: None,
        }
    }

    pub fn with_mortality(mut self, mortality: Mortality) -> Self {
        self.mortality = mortality;
        self
    }

    pub fn with_multi_sig(mut self, multi_sig: MultiSig) -> Self {
        self.multi_sig = Some(multi_sig);
        self
    }

    pub fn with_proposal_expiry(mut self, expiry: SystemTime) -> Self {
        self.multi_sig_opts.expiry = Some(expiry);
        self
    }

    pub fn paid_for_by(mut self, identity: Identity) -> Self {
        self.paid_for_by = Some(identity);
        self
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_signing_address(mut self, address: Address) -> Self {
        self.signing_address = Some(address);
        self
    }

    /// Apply `transform` to whatever the resolver produces.
    pub fn with_transformer<S, F>(self, transform: F) -> TransactionSpec<S>
    where
        F: Fn(R) -> S + Send + Sync + 'static,
        S: Send + 'static,
    {
        TransactionSpec {
            shape: self.shape,
            resolver: self.resolver.map(transform),
            mortality: self.mortality,
            multi_sig: self.multi_sig,
            multi_sig_opts: self.multi_sig_opts,
            paid_for_by: self.paid_for_by,
            nonce: self.nonce,
            signing_address: self.signing_address,
        }
    }

    /// Tags of the calls this transaction is made of.
    pub fn tags(&self) -> Vec<TxTag> {
        self.shape.items().iter().map(|item| item.tag().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polymesh_types::{tags, Hash};

    fn receipt() -> TransactionReceipt {
        TransactionReceipt {
            block_hash: Hash([1; 32]),
            block_number: 10,
            tx_hash: Hash([2; 32]),
            tx_index: 1,
            events: vec![],
        }
    }

    #[tokio::test]
    async fn test_resolver_kinds() {
        let value = Resolver::value(5u32);
        assert_eq!(value.resolve(&receipt()).await.unwrap(), 5);

        let from_fn = Resolver::from_fn(|r: &TransactionReceipt| Ok(r.block_number));
        assert_eq!(from_fn.resolve(&receipt()).await.unwrap(), 10);

        let from_async = Resolver::from_async(|r: TransactionReceipt| async move { Ok(r.tx_index) });
        assert_eq!(from_async.resolve(&receipt()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transformer_applies_after_resolution() {
        let spec = TransactionSpec::single(
            TxItem::new(Call::new(tags::BALANCES_TRANSFER, vec![])),
            Resolver::from_fn(|r: &TransactionReceipt| Ok(r.block_number)),
        )
        .with_transformer(|n| format!("block {}", n));
        assert_eq!(spec.resolver.resolve(&receipt()).await.unwrap(), "block 10");

        let failing: Resolver<u64> = Resolver::from_fn(|_| Err(TxError::Resolver("missing".into())));
        let mapped = failing.map(|n| n + 1);
        assert_eq!(mapped.resolve(&receipt()).await, Err(TxError::Resolver("missing".into())));
    }

    #[test]
    fn test_shape_items() {
        let a = TxItem::new(Call::new(tags::BALANCES_TRANSFER, vec![]));
        let b = TxItem::new(Call::new(tags::ASSET_CREATE_ASSET, vec![])).with_fee_multiplier(3);
        let spec = TransactionSpec::batch(vec![a, b], Resolver::value(()));
        assert!(spec.shape.is_batch());
        assert_eq!(spec.tags(), vec![tags::BALANCES_TRANSFER, tags::ASSET_CREATE_ASSET]);

        let single = TransactionSpec::new(Call::new(tags::BALANCES_TRANSFER, vec![]));
        assert_eq!(single.shape.items().len(), 1);
        assert_eq!(single.mortality, Mortality::Mortal { lifetime: None });
    }
}
