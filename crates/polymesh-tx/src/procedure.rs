//! Procedure methods: named entry points that prepare transactions.

use futures::future::{BoxFuture, FutureExt};
use polymesh_types::{Address, Mortality};
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::TxError;
use crate::transaction::Transaction;
use crate::transaction_spec::TransactionSpec;

/// Per-call overrides applied on top of what the procedure prepares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureOpts {
    pub signing_account: Option<Address>,
    pub nonce: Option<u32>,
    pub mortality: Option<Mortality>,
}

/// How a procedure method takes its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsShape {
    None,
    Optional,
    Required,
}

type PrepareFn<A, R> =
    Arc<dyn Fn(A, Arc<Context>) -> BoxFuture<'static, Result<TransactionSpec<R>, TxError>> + Send + Sync>;

/// Turns arguments into a ready-to-run [`Transaction`].
pub struct ProcedureMethod<A, R> {
    ctx: Arc<Context>,
    prepare: PrepareFn<A, R>,
    shape: ArgsShape,
}

impl<A, R> Clone for ProcedureMethod<A, R> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            prepare: self.prepare.clone(),
            shape: self.shape,
        }
    }
}

impl<R: Clone + Send + Sync + 'static> ProcedureMethod<(), R> {
    /// A method without arguments; prepare it with `()`.
    pub fn no_args<F, Fut>(ctx: Arc<Context>, prepare: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransactionSpec<R>, TxError>> + Send + 'static,
    {
        Self {
            ctx,
            prepare: Arc::new(move |(): (), ctx: Arc<Context>| prepare(ctx).boxed()),
            shape: ArgsShape::None,
        }
    }
}

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> ProcedureMethod<Option<T>, R> {
    /// A method whose arguments may be omitted.
    pub fn optional_args<F, Fut>(ctx: Arc<Context>, prepare: F) -> Self
    where
        F: Fn(Option<T>, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransactionSpec<R>, TxError>> + Send + 'static,
    {
        Self {
            ctx,
            prepare: Arc::new(move |args: Option<T>, ctx: Arc<Context>| prepare(args, ctx).boxed()),
            shape: ArgsShape::Optional,
        }
    }
}

impl<A: Send + 'static, R: Clone + Send + Sync + 'static> ProcedureMethod<A, R> {
    pub fn required_args<F, Fut>(ctx: Arc<Context>, prepare: F) -> Self
    where
        F: Fn(A, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransactionSpec<R>, TxError>> + Send + 'static,
    {
        Self {
            ctx,
            prepare: Arc::new(move |args: A, ctx: Arc<Context>| prepare(args, ctx).boxed()),
            shape: ArgsShape::Required,
        }
    }

    pub fn args_shape(&self) -> ArgsShape {
        self.shape
    }

    /// Prepare a transaction, resolving its signing account up front.
    pub async fn prepare(&self, args: A, opts: ProcedureOpts) -> Result<Transaction<R>, TxError> {
        let mut spec = (self.prepare)(args, self.ctx.clone()).await?;

        if let Some(account) = opts.signing_account {
            spec.signing_address = Some(account);
        }
        if let Some(nonce) = opts.nonce {
            spec.nonce = Some(nonce);
        }
        if let Some(mortality) = opts.mortality {
            spec.mortality = mortality;
        }

        let signer = self.ctx.resolve_signing_address(spec.signing_address.as_ref()).await?;
        spec.signing_address = Some(signer);
        Ok(Transaction::new(self.ctx.clone(), spec))
    }
}
