//! Polymesh transaction lifecycle engine.
//!
//! A [`Transaction`] takes a [`TransactionSpec`] from `Idle` through signing
//! and submission to a terminal status, computing fees and the paying account
//! before anything is broadcast. Calls from multisig signers are wrapped into
//! proposals, batches are composed into one atomic `utility.batchAll` call,
//! and an optional indexer confirmation can be awaited after success.
//!
//! ```ignore
//! let ctx = Context::builder(chain).signing_manager(wallet).build();
//! let tx = Transaction::new(ctx, TransactionSpec::new(call));
//! tx.on_status_change(|status| println!("{}", status));
//! tx.run().await?;
//! ```

pub mod batch;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod fee;
pub mod middleware;
mod observer;
pub mod payload;
pub mod procedure;
pub mod proposal;
pub mod signer;
pub mod status;
pub mod submit;
pub mod transaction;
pub mod transaction_spec;

pub use batch::compose_batch;
pub use clock::{Clock, TokioClock};
pub use config::EngineConfig;
pub use context::{Context, ContextBuilder};
pub use error::TxError;
pub use fee::{Fees, PayingAccountData, PayingAccountFees, PayingAccountType};
pub use middleware::MiddlewareOutcome;
pub use observer::Unsubscribe;
pub use payload::SignablePayload;
pub use procedure::{ArgsShape, ProcedureMethod, ProcedureOpts};
pub use signer::{SignError, Signer, SigningManager};
pub use status::TransactionStatus;
pub use submit::{SubmissionStrategy, TransactionReceipt};
pub use transaction::Transaction;
pub use transaction_spec::{MultiSigOpts, Resolver, TransactionSpec, TxItem, TxShape};
