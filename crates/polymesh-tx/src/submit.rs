//! Submission strategies: push subscription and finalized-head polling.
//!
//! Both strategies end in a [`TransactionReceipt`] holding the including block
//! and the extrinsic's own events. Execution failures are read from those
//! events (`system.ExtrinsicFailed`) the same way for both.

use log::{debug, info};
use polymesh_rpc::{Block, ChainClient, DispatchError, EventRecord, SignedExtrinsic, StatusUpdate};
use polymesh_types::tags::events;
use polymesh_types::{Era, Hash};

use crate::context::Context;
use crate::error::TxError;

/// Where and how a transaction landed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReceipt {
    pub block_hash: Hash,
    pub block_number: u64,
    pub tx_hash: Hash,
    pub tx_index: u32,
    /// Events emitted while applying this extrinsic.
    pub events: Vec<EventRecord>,
}

impl TransactionReceipt {
    /// Execution error, if the extrinsic reverted.
    pub fn dispatch_error(&self) -> Option<DispatchError> {
        self.find_event(events::SYSTEM, events::EXTRINSIC_FAILED)
            .map(|record| DispatchError::from_event_data(&record.event.data))
    }

    pub fn find_event(&self, section: &str, method: &str) -> Option<&EventRecord> {
        self.events.iter().find(|record| record.is(section, method))
    }

    pub fn filter_events<'a>(&'a self, section: &'a str, method: &'a str) -> impl Iterator<Item = &'a EventRecord> {
        self.events.iter().filter(move |record| record.is(section, method))
    }
}

/// How a signed extrinsic is sent and observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStrategy {
    /// `submit_and_watch` and react to pushed status updates.
    Subscription,
    /// `submit`, then scan newly finalized blocks.
    Polling,
}

impl SubmissionStrategy {
    pub fn for_client(chain: &dyn ChainClient) -> Self {
        if chain.supports_subscription() {
            SubmissionStrategy::Subscription
        } else {
            SubmissionStrategy::Polling
        }
    }

    /// Send `extrinsic` and wait until it is included (or definitely won't be).
    ///
    /// `anchor` is the block number the payload's era was computed at.
    pub async fn submit(
        self,
        ctx: &Context,
        extrinsic: &SignedExtrinsic,
        anchor: u64,
    ) -> Result<TransactionReceipt, TxError> {
        match self {
            SubmissionStrategy::Subscription => submit_and_watch(ctx, extrinsic).await,
            SubmissionStrategy::Polling => submit_and_poll(ctx, extrinsic, anchor).await,
        }
    }
}

async fn submit_and_watch(ctx: &Context, extrinsic: &SignedExtrinsic) -> Result<TransactionReceipt, TxError> {
    let chain = ctx.chain();
    let mut subscription = chain
        .submit_and_watch(extrinsic)
        .await
        .map_err(TxError::from_submission)?;
    let tx_hash = subscription.tx_hash;
    info!("submitted {} (subscription {})", tx_hash, subscription.id);

    let outcome = loop {
        let Some(update) = subscription.updates.recv().await else {
            break Err(TxError::Infrastructure(
                "status subscription closed before the transaction was included".into(),
            ));
        };
        debug!("{}: {}", tx_hash, update.name());

        match update {
            StatusUpdate::Future
            | StatusUpdate::Ready
            | StatusUpdate::Broadcast(_)
            | StatusUpdate::Retracted(_) => continue,
            StatusUpdate::InBlock { block_hash, events } | StatusUpdate::Finalized { block_hash, events } => {
                break Ok((block_hash, events));
            }
            other @ (StatusUpdate::FinalityTimeout(_)
            | StatusUpdate::Usurped(_)
            | StatusUpdate::Dropped
            | StatusUpdate::Invalid) => {
                break Err(TxError::PoolEviction(format!("transaction status is {}", other.name())));
            }
        }
    };

    // A failed unsubscribe is reported even when the transaction itself landed.
    chain
        .unsubscribe(&subscription.id)
        .await
        .map_err(|e| TxError::Infrastructure(format!("failed to unsubscribe: {}", e)))?;

    let (block_hash, pushed_events) = outcome?;
    let block = chain.block(&block_hash).await?;
    let events = if pushed_events.is_empty() {
        chain.events(&block_hash).await?
    } else {
        pushed_events
    };
    receipt_from_block(&block, tx_hash, events)
}

async fn submit_and_poll(
    ctx: &Context,
    extrinsic: &SignedExtrinsic,
    anchor: u64,
) -> Result<TransactionReceipt, TxError> {
    let chain = ctx.chain();
    let config = ctx.config();
    let era = extrinsic.payload.era;

    let start = chain.finalized_head().await?;
    let mut scanned = chain.header(Some(&start)).await?.number;

    let tx_hash = chain.submit(extrinsic).await.map_err(TxError::from_submission)?;
    info!("submitted {}, polling from block #{}", tx_hash, scanned);

    for attempt in 1..=config.poll_attempts {
        ctx.clock().sleep(config.poll_interval).await;

        let head_hash = chain.finalized_head().await?;
        let head_number = chain.header(Some(&head_hash)).await?.number;
        if head_number <= scanned {
            debug!("poll {}: no new finalized block (#{})", attempt, head_number);
            continue;
        }

        let last = head_number.min(scanned.saturating_add(config.max_poll_span.max(1)));
        if last < head_number {
            debug!("poll {}: scanning #{}..#{}, finalized head is #{}", attempt, scanned + 1, last, head_number);
        }
        for number in scanned + 1..=last {
            let block = block_at(chain.as_ref(), number).await?;
            if block.index_of(&tx_hash).is_some() {
                let events = chain.events(&block.hash).await?;
                return receipt_from_block(&block, tx_hash, events);
            }
            scanned = number;
        }

        if expired(&era, anchor, scanned) {
            return Err(TxError::PoolEviction(format!(
                "transaction expired at block #{} without being included",
                era.death(anchor)
            )));
        }
    }

    Err(TxError::Infrastructure(format!(
        "transaction {} was not finalized after {} polls",
        tx_hash, config.poll_attempts
    )))
}

async fn block_at(chain: &dyn ChainClient, number: u64) -> Result<Block, TxError> {
    let hash = chain
        .block_hash(number)
        .await?
        .ok_or_else(|| TxError::Infrastructure(format!("finalized block #{} has no hash", number)))?;
    Ok(chain.block(&hash).await?)
}

fn expired(era: &Era, anchor: u64, finalized: u64) -> bool {
    !era.is_immortal() && finalized >= era.death(anchor)
}

fn receipt_from_block(block: &Block, tx_hash: Hash, events: Vec<EventRecord>) -> Result<TransactionReceipt, TxError> {
    let tx_index = block.index_of(&tx_hash).ok_or_else(|| {
        TxError::Infrastructure(format!("transaction {} not found in block {}", tx_hash, block.hash))
    })?;
    info!("{} included in block #{} at index {}", tx_hash, block.header.number, tx_index);

    Ok(TransactionReceipt {
        block_hash: block.hash,
        block_number: block.header.number,
        tx_hash,
        tx_index,
        events: events.into_iter().filter(|record| record.applies_to(tx_index)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polymesh_rpc::{Header, ModuleError, Phase};
    use serde_json::json;

    fn block(number: u64, hashes: Vec<Hash>) -> Block {
        Block {
            hash: Hash([number as u8; 32]),
            header: Header {
                parent_hash: Hash([number.saturating_sub(1) as u8; 32]),
                number,
            },
            extrinsic_hashes: hashes,
        }
    }

    #[test]
    fn test_receipt_filters_events_by_index() {
        let tx = Hash([9; 32]);
        let events = vec![
            EventRecord::new(Phase::ApplyExtrinsic(0), "system", "ExtrinsicSuccess", vec![]),
            EventRecord::new(Phase::ApplyExtrinsic(1), "balances", "Transfer", vec![]),
            EventRecord::new(Phase::ApplyExtrinsic(1), "system", "ExtrinsicSuccess", vec![]),
            EventRecord::new(Phase::Finalization, "system", "Other", vec![]),
        ];
        let receipt = receipt_from_block(&block(5, vec![Hash([0; 32]), tx]), tx, events).unwrap();
        assert_eq!(receipt.tx_index, 1);
        assert_eq!(receipt.block_number, 5);
        assert_eq!(receipt.events.len(), 2);
        assert!(receipt.dispatch_error().is_none());
    }

    #[test]
    fn test_receipt_missing_tx() {
        let err = receipt_from_block(&block(5, vec![]), Hash([9; 32]), vec![]).unwrap_err();
        assert!(matches!(err, TxError::Infrastructure(_)));
    }

    #[test]
    fn test_dispatch_error_from_failed_event() {
        let tx = Hash([9; 32]);
        let events = vec![EventRecord::new(
            Phase::ApplyExtrinsic(0),
            "system",
            "ExtrinsicFailed",
            vec![json!({ "module": { "section": "asset", "name": "NoSuchAsset", "docs": "" } }), json!({})],
        )];
        let receipt = receipt_from_block(&block(3, vec![tx]), tx, events).unwrap();
        assert_eq!(
            receipt.dispatch_error(),
            Some(DispatchError::Module(ModuleError {
                section: "asset".into(),
                name: "NoSuchAsset".into(),
                docs: String::new(),
            }))
        );
    }

    #[test]
    fn test_expiry() {
        let era = Era::mortal(64, 1000);
        assert!(!expired(&era, 1000, 1063));
        assert!(expired(&era, 1000, 1064));
        assert!(!expired(&Era::Immortal, 1000, u64::MAX - 1));
    }
}
