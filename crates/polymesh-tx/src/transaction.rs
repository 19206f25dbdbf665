//! The transaction object: one run through the lifecycle, observable.

use log::{debug, info, warn};
use polymesh_rpc::{Call, SignedExtrinsic};
use polymesh_types::{tags, Address, Balance, Hash, MultiSig, MultiSigProposal, TxTag};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::batch::compose_batch;
use crate::context::Context;
use crate::error::TxError;
use crate::fee::{check_affordability, check_subsidy_policy, compute_fees, protocol_fees, PayingAccountFees};
use crate::middleware::{MiddlewareOutcome, MiddlewareWaiter};
use crate::observer::{lock, Observers, Unsubscribe};
use crate::payload::{build_signable_payload, build_signer_payload, raw_payload, SignablePayload};
use crate::proposal::{proposal_from_receipt, wrap_as_proposal};
use crate::status::TransactionStatus;
use crate::submit::{SubmissionStrategy, TransactionReceipt};
use crate::transaction_spec::{Resolver, TransactionSpec, TxShape};

struct TxState<R> {
    status: TransactionStatus,
    started: bool,
    receipt: Option<TransactionReceipt>,
    result: Option<R>,
    error: Option<TxError>,
    proposal: Option<MultiSigProposal>,
}

struct Inner<R> {
    ctx: Arc<Context>,
    spec: TransactionSpec<R>,
    state: Mutex<TxState<R>>,
    status_observers: Observers<TransactionStatus>,
    waiter: Arc<MiddlewareWaiter>,
}

/// A prepared transaction. Cloning yields another handle to the same run.
///
/// A transaction runs at most once. `run` is for plain calls (and multisig
/// votes), `run_as_proposal` for calls a multisig signer proposes.
pub struct Transaction<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Transaction<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Clone + Send + Sync + 'static> Transaction<R> {
    pub fn new(ctx: Arc<Context>, spec: TransactionSpec<R>) -> Self {
        let waiter = MiddlewareWaiter::new(&ctx);
        Self {
            inner: Arc::new(Inner {
                ctx,
                spec,
                state: Mutex::new(TxState {
                    status: TransactionStatus::Idle,
                    started: false,
                    receipt: None,
                    result: None,
                    error: None,
                    proposal: None,
                }),
                status_observers: Observers::new(),
                waiter,
            }),
        }
    }

    /// Sign, submit and wait for the transaction, then resolve its result.
    pub async fn run(&self) -> Result<R, TxError> {
        if self.inner.spec.multi_sig.is_some() && !self.tag().is_multi_sig_vote() {
            return Err(TxError::usage(
                "Cannot call run on a multiSig transaction; use run_as_proposal instead",
            ));
        }
        self.begin()?;

        let outcome = async {
            let receipt = self.drive().await?;
            let result = self.inner.spec.resolver.resolve(&receipt).await?;
            Ok::<_, TxError>((receipt.block_number, result))
        }
        .await;

        match outcome {
            Ok((block_number, result)) => {
                lock(&self.inner.state).result = Some(result.clone());
                self.transition(TransactionStatus::Succeeded);
                self.inner.waiter.block_processed(block_number);
                Ok(result)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Submit the call as a new proposal of the signer's multisig.
    pub async fn run_as_proposal(&self) -> Result<MultiSigProposal, TxError> {
        let Some(multi_sig) = self.inner.spec.multi_sig.clone() else {
            return Err(TxError::usage(
                "Cannot call run_as_proposal without setting a multiSig on the transaction",
            ));
        };
        if self.tag().is_multi_sig_vote() {
            return Err(TxError::usage(
                "Cannot call run_as_proposal on an approve or reject call; use run instead",
            ));
        }
        self.begin()?;

        let outcome = async {
            let receipt = self.drive().await?;
            let proposal = proposal_from_receipt(&multi_sig, &receipt)?;
            Ok::<_, TxError>((receipt.block_number, proposal))
        }
        .await;

        match outcome {
            Ok((block_number, proposal)) => {
                lock(&self.inner.state).proposal = Some(proposal.clone());
                self.transition(TransactionStatus::Succeeded);
                self.inner.waiter.block_processed(block_number);
                Ok(proposal)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn begin(&self) -> Result<(), TxError> {
        let mut state = lock(&self.inner.state);
        if state.started {
            return Err(TxError::usage("Cannot re-run a Transaction"));
        }
        state.started = true;
        Ok(())
    }

    /// Everything from signer resolution to an included, non-reverted receipt.
    async fn drive(&self) -> Result<TransactionReceipt, TxError> {
        let ctx = &self.inner.ctx;
        let spec = &self.inner.spec;

        let signer = self.resolve_signer().await?;
        let call = self.submitted_call()?;

        let fees = compute_fees(
            ctx,
            spec.shape.items(),
            &call,
            &signer,
            spec.multi_sig.as_ref(),
            spec.paid_for_by.as_ref(),
        )
        .await?;
        check_subsidy_policy(ctx.config(), &spec.tags(), &fees.paying_account_data)?;
        check_affordability(&fees)?;

        self.transition(TransactionStatus::Unapproved);

        let payload = build_signer_payload(ctx, &call, &signer, spec.nonce, spec.mortality).await?;
        let raw = raw_payload(ctx, &payload).await?;
        let signature = ctx.external_signer()?.sign_payload(&payload, &raw).await?;

        self.transition(TransactionStatus::Running);

        let anchor = payload.block_number;
        let extrinsic = SignedExtrinsic { payload, signature };
        let receipt = SubmissionStrategy::for_client(ctx.chain().as_ref())
            .submit(ctx, &extrinsic, anchor)
            .await?;

        lock(&self.inner.state).receipt = Some(receipt.clone());
        if let Some(err) = receipt.dispatch_error() {
            return Err(TxError::ChainRejection(err));
        }
        Ok(receipt)
    }

    fn fail(&self, err: TxError) -> TxError {
        warn!("transaction {} failed: {}", self.tag(), err);
        lock(&self.inner.state).error = Some(err.clone());
        self.transition(err.terminal_status());
        err
    }

    /// Move to `next` and notify observers once the new status is committed.
    fn transition(&self, next: TransactionStatus) {
        {
            let mut state = lock(&self.inner.state);
            if !state.status.can_transition_to(next) {
                warn!("ignoring status change {} -> {}", state.status, next);
                return;
            }
            debug!("{}: {} -> {}", self.tag(), state.status, next);
            state.status = next;
        }
        self.inner.status_observers.notify(next);
    }

    async fn resolve_signer(&self) -> Result<Address, TxError> {
        self.inner
            .ctx
            .resolve_signing_address(self.inner.spec.signing_address.as_ref())
            .await
    }

    fn wraps_as_proposal(&self) -> bool {
        self.inner.spec.multi_sig.is_some() && !self.tag().is_multi_sig_vote()
    }

    /// The call that is actually signed: batched and proposal-wrapped as needed.
    fn submitted_call(&self) -> Result<Call, TxError> {
        let spec = &self.inner.spec;
        let call = match &spec.shape {
            TxShape::Single(item) => item.call.clone(),
            TxShape::Batch(items) => compose_batch(items)?,
        };
        match &spec.multi_sig {
            Some(multi_sig) if self.wraps_as_proposal() => {
                Ok(wrap_as_proposal(multi_sig, call, spec.multi_sig_opts.expiry))
            }
            _ => Ok(call),
        }
    }

    pub fn status(&self) -> TransactionStatus {
        lock(&self.inner.state).status
    }

    pub fn is_success(&self) -> bool {
        self.status() == TransactionStatus::Succeeded
    }

    /// The resolved result; only available once the transaction succeeded.
    pub fn result(&self) -> Result<R, TxError> {
        lock(&self.inner.state).result.clone().ok_or_else(|| {
            TxError::usage("The result of the transaction was checked before it has been completed")
        })
    }

    pub fn receipt(&self) -> Option<TransactionReceipt> {
        lock(&self.inner.state).receipt.clone()
    }

    pub fn block_hash(&self) -> Option<Hash> {
        lock(&self.inner.state).receipt.as_ref().map(|r| r.block_hash)
    }

    pub fn block_number(&self) -> Option<u64> {
        lock(&self.inner.state).receipt.as_ref().map(|r| r.block_number)
    }

    pub fn tx_hash(&self) -> Option<Hash> {
        lock(&self.inner.state).receipt.as_ref().map(|r| r.tx_hash)
    }

    pub fn tx_index(&self) -> Option<u32> {
        lock(&self.inner.state).receipt.as_ref().map(|r| r.tx_index)
    }

    /// Error the last run ended with, if any.
    pub fn error(&self) -> Option<TxError> {
        lock(&self.inner.state).error.clone()
    }

    pub fn proposal(&self) -> Option<MultiSigProposal> {
        lock(&self.inner.state).proposal.clone()
    }

    /// Tag of the submitted call before proposal wrapping.
    pub fn tag(&self) -> TxTag {
        match &self.inner.spec.shape {
            TxShape::Single(item) => item.tag().clone(),
            TxShape::Batch(_) => tags::UTILITY_BATCH_ALL,
        }
    }

    pub fn signing_address(&self) -> Option<&Address> {
        self.inner.spec.signing_address.as_ref()
    }

    pub fn multi_sig(&self) -> Option<&MultiSig> {
        self.inner.spec.multi_sig.as_ref()
    }

    /// Whether a subsidizer may pay for every call in this transaction.
    pub fn supports_subsidy(&self) -> bool {
        let config = self.inner.ctx.config();
        self.inner.spec.tags().iter().all(|tag| config.is_subsidizable(tag))
    }

    /// Protocol and gas fees plus who would pay them, as of now.
    pub async fn get_total_fees(&self) -> Result<PayingAccountFees, TxError> {
        let spec = &self.inner.spec;
        let signer = self.resolve_signer().await?;
        let call = self.submitted_call()?;
        compute_fees(
            &self.inner.ctx,
            spec.shape.items(),
            &call,
            &signer,
            spec.multi_sig.as_ref(),
            spec.paid_for_by.as_ref(),
        )
        .await
    }

    pub async fn get_protocol_fees(&self) -> Result<Balance, TxError> {
        protocol_fees(&self.inner.ctx, self.inner.spec.shape.items()).await
    }

    /// Unsigned payload for an offline signer; nothing is submitted.
    pub async fn to_signable_payload(&self, metadata: BTreeMap<String, String>) -> Result<SignablePayload, TxError> {
        let spec = &self.inner.spec;
        let signer = self.resolve_signer().await?;
        let call = self.submitted_call()?;
        let multi_sig = spec
            .multi_sig
            .as_ref()
            .filter(|_| self.wraps_as_proposal())
            .map(|multi_sig| multi_sig.address.clone());

        build_signable_payload(
            &self.inner.ctx,
            &call,
            &signer,
            spec.nonce,
            spec.mortality,
            metadata,
            multi_sig,
        )
        .await
    }

    /// Break an idle batch into one transaction per call.
    ///
    /// With an explicit nonce `n`, the i-th transaction uses `n + i`.
    pub fn split(&self) -> Result<Vec<Transaction<()>>, TxError> {
        let spec = &self.inner.spec;
        let TxShape::Batch(items) = &spec.shape else {
            return Err(TxError::usage("Only batch transactions can be split"));
        };
        if lock(&self.inner.state).started {
            return Err(TxError::usage("Cannot split a transaction that has already run"));
        }

        let parts = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let nonce = match spec.nonce {
                    Some(nonce) => Some(
                        u32::try_from(i)
                            .ok()
                            .and_then(|offset| nonce.checked_add(offset))
                            .ok_or_else(|| TxError::usage("Nonce overflows while splitting the batch"))?,
                    ),
                    None => None,
                };
                let part = TransactionSpec {
                    shape: TxShape::Single(item.clone()),
                    resolver: Resolver::Value(()),
                    mortality: spec.mortality,
                    multi_sig: spec.multi_sig.clone(),
                    multi_sig_opts: spec.multi_sig_opts,
                    paid_for_by: spec.paid_for_by,
                    nonce,
                    signing_address: spec.signing_address.clone(),
                };
                Ok(Transaction::new(self.inner.ctx.clone(), part))
            })
            .collect::<Result<Vec<_>, TxError>>()?;
        info!("split batch into {} transactions", parts.len());
        Ok(parts)
    }

    /// Call `listener` on every status change until unsubscribed.
    pub fn on_status_change<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(TransactionStatus) + Send + Sync + 'static,
    {
        self.inner.status_observers.subscribe(Arc::new(listener))
    }

    /// Call `listener` once the indexer has processed the including block,
    /// or with an error once it gives up waiting.
    pub fn on_processed_by_middleware<F>(&self, listener: F) -> Result<Unsubscribe, TxError>
    where
        F: Fn(MiddlewareOutcome) + Send + Sync + 'static,
    {
        self.inner.waiter.subscribe(Arc::new(listener))
    }
}

impl<R> std::fmt::Debug for Transaction<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Transaction")
            .field("shape", &self.inner.spec.shape)
            .field("status", &state.status)
            .field("receipt", &state.receipt)
            .finish()
    }
}
