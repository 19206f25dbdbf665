//! Engine configuration.

use polymesh_types::constants::{DEFAULT_LIFETIME, POLYMESH_SS58_FORMAT};
use polymesh_types::{tags, TxTag};
use std::time::Duration;

/// Tuning knobs for submission, polling and fee policy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between finalized-head polls in polling mode.
    pub poll_interval: Duration,
    /// Polls before a polling-mode submission gives up.
    pub poll_attempts: u32,
    /// Finalized blocks inspected per poll; a larger backlog carries over to the next poll.
    pub max_poll_span: u64,
    /// Delay between indexer queries while waiting for it to catch up.
    pub middleware_poll_interval: Duration,
    /// Indexer queries before reporting a sync timeout.
    pub middleware_attempts: u32,
    /// Lifetime, in blocks, of mortal transactions without an explicit one.
    pub default_lifetime: u64,
    /// Calls a subsidizer is never allowed to pay for.
    pub unsubsidized_tags: Vec<TxTag>,
    /// SS58 format used when rendering addresses.
    pub ss58_format: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_attempts: 100,
            max_poll_span: 256,
            middleware_poll_interval: Duration::from_secs(2),
            middleware_attempts: 5,
            default_lifetime: DEFAULT_LIFETIME,
            unsubsidized_tags: vec![tags::STAKING_BOND, tags::STAKING_BOND_EXTRA, tags::STAKING_REBOND],
            ss58_format: POLYMESH_SS58_FORMAT,
        }
    }
}

impl EngineConfig {
    pub fn is_subsidizable(&self, tag: &TxTag) -> bool {
        !self.unsubsidized_tags.contains(tag)
    }
}
