//! Shared, read-only environment of every transaction.

use log::debug;
use polymesh_rpc::{ChainClient, Middleware};
use polymesh_types::Address;
use std::sync::Arc;

use crate::clock::{Clock, TokioClock};
use crate::config::EngineConfig;
use crate::error::TxError;
use crate::signer::{Signer, SigningManager};

/// Chain and indexer connections plus signing session.
pub struct Context {
    chain: Arc<dyn ChainClient>,
    middleware: Option<Arc<dyn Middleware>>,
    signing_manager: Option<Arc<dyn SigningManager>>,
    signing_address: Option<Address>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Context {
    pub fn builder(chain: Arc<dyn ChainClient>) -> ContextBuilder {
        ContextBuilder {
            chain,
            middleware: None,
            signing_manager: None,
            signing_address: None,
            clock: Arc::new(TokioClock),
            config: EngineConfig::default(),
        }
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn is_middleware_enabled(&self) -> bool {
        self.middleware.is_some()
    }

    pub fn middleware(&self) -> Result<&Arc<dyn Middleware>, TxError> {
        self.middleware
            .as_ref()
            .ok_or_else(|| TxError::usage("Cannot query the middleware because it is not enabled"))
    }

    fn signing_manager(&self) -> Result<&Arc<dyn SigningManager>, TxError> {
        self.signing_manager
            .as_ref()
            .ok_or_else(|| TxError::usage("There is no signing manager attached to the client"))
    }

    pub fn external_signer(&self) -> Result<Arc<dyn Signer>, TxError> {
        Ok(self.signing_manager()?.external_signer())
    }

    /// Resolve who signs: the requested address, else the context default,
    /// else the signing manager's first account.
    pub async fn resolve_signing_address(&self, requested: Option<&Address>) -> Result<Address, TxError> {
        let manager = self.signing_manager()?;
        let accounts = manager.accounts().await.map_err(TxError::from)?;

        let candidate = match requested.or(self.signing_address.as_ref()) {
            Some(address) => address.clone(),
            None => accounts
                .first()
                .cloned()
                .ok_or_else(|| TxError::usage("The signing manager has no accounts"))?,
        };

        // Same key under a different SS58 prefix is the same account.
        let key = candidate.public_key();
        if !accounts.iter().any(|account| account.public_key() == key) {
            return Err(TxError::SignerUnavailable(candidate));
        }

        let address = candidate.with_format(self.config.ss58_format).unwrap_or(candidate);
        debug!("signing as {}", address);
        Ok(address)
    }
}

pub struct ContextBuilder {
    chain: Arc<dyn ChainClient>,
    middleware: Option<Arc<dyn Middleware>>,
    signing_manager: Option<Arc<dyn SigningManager>>,
    signing_address: Option<Address>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ContextBuilder {
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    pub fn signing_manager(mut self, manager: Arc<dyn SigningManager>) -> Self {
        self.signing_manager = Some(manager);
        self
    }

    /// Default signing address for transactions that do not name one.
    pub fn signing_address(mut self, address: Address) -> Self {
        self.signing_address = Some(address);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Arc<Context> {
        Arc::new(Context {
            chain: self.chain,
            middleware: self.middleware,
            signing_manager: self.signing_manager,
            signing_address: self.signing_address,
            clock: self.clock,
            config: self.config,
        })
    }
}
