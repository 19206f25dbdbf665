//! Waits for the indexer to process the block a transaction landed in.
//!
//! The waiter polls the indexer's latest block after the transaction
//! succeeds, for a bounded number of attempts, and delivers a single outcome
//! to every registered listener. Listeners registered after the outcome is
//! known receive it immediately. Polling stops as soon as no listener is
//! left.

use log::{debug, info, warn};
use polymesh_rpc::Middleware;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::Clock;
use crate::context::Context;
use crate::error::TxError;
use crate::observer::{lock, Observers, Unsubscribe};

pub type MiddlewareOutcome = Result<(), TxError>;

struct WaiterState {
    target_block: Option<u64>,
    outcome: Option<MiddlewareOutcome>,
    polling: bool,
}

pub(crate) struct MiddlewareWaiter {
    middleware: Option<Arc<dyn Middleware>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    attempts: u32,
    state: Mutex<WaiterState>,
    listeners: Observers<MiddlewareOutcome>,
}

impl MiddlewareWaiter {
    pub fn new(ctx: &Context) -> Arc<Self> {
        Arc::new(Self {
            middleware: ctx.middleware().ok().cloned(),
            clock: ctx.clock().clone(),
            interval: ctx.config().middleware_poll_interval,
            attempts: ctx.config().middleware_attempts,
            state: Mutex::new(WaiterState {
                target_block: None,
                outcome: None,
                polling: false,
            }),
            listeners: Observers::new(),
        })
    }

    pub fn subscribe(
        self: &Arc<Self>,
        callback: Arc<dyn Fn(MiddlewareOutcome) + Send + Sync>,
    ) -> Result<Unsubscribe, TxError> {
        if self.middleware.is_none() {
            return Err(TxError::usage(
                "Cannot subscribe to middleware events because the middleware is not enabled",
            ));
        }

        let mut state = lock(&self.state);
        if let Some(outcome) = state.outcome.clone() {
            drop(state);
            callback(outcome);
            return Ok(Unsubscribe::inert());
        }

        let handle = self.listeners.subscribe(callback);
        if let Some(block) = state.target_block {
            self.start(&mut state, block);
        }
        Ok(handle)
    }

    /// The transaction succeeded in `block`; start waiting if anyone listens.
    pub fn block_processed(self: &Arc<Self>, block: u64) {
        if self.middleware.is_none() {
            return;
        }
        let mut state = lock(&self.state);
        state.target_block = Some(block);
        self.start(&mut state, block);
    }

    fn start(self: &Arc<Self>, state: &mut WaiterState, block: u64) {
        if state.polling || state.outcome.is_some() || !self.listeners.has_active() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available to wait for the middleware");
            return;
        };
        state.polling = true;
        runtime.spawn(self.clone().poll(block));
    }

    async fn poll(self: Arc<Self>, block: u64) {
        let Some(middleware) = self.middleware.clone() else {
            return;
        };

        for attempt in 1..=self.attempts {
            {
                // A racing subscribe is either seen here or finds `polling` cleared.
                let mut state = lock(&self.state);
                if !self.listeners.has_active() {
                    debug!("no middleware listeners left, stopping");
                    state.polling = false;
                    return;
                }
            }

            match middleware.latest_block().await {
                Ok(latest) if latest >= block => {
                    info!("middleware processed block #{} (latest #{})", block, latest);
                    self.finish(Ok(()));
                    return;
                }
                Ok(latest) => debug!(
                    "middleware at #{}, waiting for #{} (attempt {}/{})",
                    latest, block, attempt, self.attempts
                ),
                Err(e) => warn!("middleware query failed (attempt {}/{}): {}", attempt, self.attempts, e),
            }

            if attempt < self.attempts {
                self.clock.sleep(self.interval).await;
            }
        }

        warn!("middleware did not reach block #{} after {} attempts", block, self.attempts);
        self.finish(Err(TxError::MiddlewareSyncTimeout { attempts: self.attempts }));
    }

    fn finish(&self, outcome: MiddlewareOutcome) {
        {
            let mut state = lock(&self.state);
            state.polling = false;
            state.outcome = Some(outcome.clone());
        }
        self.listeners.drain_notify(outcome);
    }
}
