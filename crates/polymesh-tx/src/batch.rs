//! Atomic batches: many calls, one extrinsic, one status timeline.

use polymesh_rpc::{Call, CallArg};
use polymesh_types::tags;

use crate::error::TxError;
use crate::transaction_spec::TxItem;

/// Wrap `items` in `utility.batchAll`, preserving order.
pub fn compose_batch(items: &[TxItem]) -> Result<Call, TxError> {
    if items.is_empty() {
        return Err(TxError::usage("Cannot build a batch without any calls"));
    }
    let calls = items.iter().map(|item| item.call.clone()).collect();
    Ok(Call::with_args(tags::UTILITY_BATCH_ALL, vec![CallArg::Calls(calls)]))
}
