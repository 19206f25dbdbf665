//! Transaction engine error types.

use polymesh_rpc::{DispatchError, RpcError};
use polymesh_types::{Address, Balance, TxTag};
use thiserror::Error;

use crate::status::TransactionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// The engine was used in a way it does not allow.
    #[error("{0}")]
    Usage(String),

    #[error("insufficient balance to pay fees: {payer} needs {need}, has {have}")]
    InsufficientBalance {
        payer: Address,
        need: Balance,
        have: Balance,
    },

    #[error("insufficient subsidy allowance to pay fees: {payer} needs {need}, allowance is {allowance}")]
    InsufficientAllowance {
        payer: Address,
        need: Balance,
        allowance: Balance,
    },

    #[error("{tag} cannot be paid for by a subsidizer")]
    SubsidyPolicy { tag: TxTag },

    #[error("signing account {0} is not present in the signing manager")]
    SignerUnavailable(Address),

    #[error("{0}")]
    ChainRejection(DispatchError),

    #[error("transaction was aborted: {0}")]
    PoolEviction(String),

    #[error("the user canceled the transaction signature")]
    UserCancellation,

    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    #[error("middleware has not synced after {attempts} attempts")]
    MiddlewareSyncTimeout { attempts: u32 },

    #[error("unexpected event: {0}")]
    UnexpectedEvent(String),

    #[error("result resolution failed: {0}")]
    Resolver(String),
}

impl TxError {
    pub fn usage(message: impl Into<String>) -> Self {
        TxError::Usage(message.into())
    }

    /// Terminal status a transaction ends in when it fails with this error.
    pub fn terminal_status(&self) -> TransactionStatus {
        match self {
            TxError::PoolEviction(_) => TransactionStatus::Aborted,
            TxError::UserCancellation => TransactionStatus::Rejected,
            _ => TransactionStatus::Failed,
        }
    }

    /// Node submission errors: pool rejections abort, everything else is transport.
    pub(crate) fn from_submission(err: RpcError) -> Self {
        if err.is_pool_rejection() {
            TxError::PoolEviction(err.to_string())
        } else {
            TxError::Infrastructure(err.to_string())
        }
    }
}

impl From<RpcError> for TxError {
    fn from(err: RpcError) -> Self {
        TxError::Infrastructure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polymesh_rpc::error::codes;
    use polymesh_rpc::ModuleError;

    #[test]
    fn test_terminal_status() {
        assert_eq!(TxError::PoolEviction("dropped".into()).terminal_status(), TransactionStatus::Aborted);
        assert_eq!(TxError::UserCancellation.terminal_status(), TransactionStatus::Rejected);
        assert_eq!(
            TxError::ChainRejection(DispatchError::BadOrigin).terminal_status(),
            TransactionStatus::Failed
        );
        assert_eq!(TxError::usage("nope").terminal_status(), TransactionStatus::Failed);
    }

    #[test]
    fn test_chain_rejection_message() {
        let err = TxError::ChainRejection(DispatchError::Module(ModuleError {
            section: "asset".into(),
            name: "Unauthorized".into(),
            docs: "The user is not authorized".into(),
        }));
        assert_eq!(err.to_string(), "asset.Unauthorized: The user is not authorized");
    }

    #[test]
    fn test_from_submission() {
        let rejected = RpcError::Rpc {
            code: codes::POOL_TOO_LOW_PRIORITY,
            message: "Priority is too low".into(),
            method: "author_submitExtrinsic".into(),
        };
        assert!(matches!(TxError::from_submission(rejected), TxError::PoolEviction(_)));

        let transport = RpcError::Other("connection reset".into());
        assert_eq!(
            TxError::from_submission(transport),
            TxError::Infrastructure("connection reset".into())
        );
    }
}
