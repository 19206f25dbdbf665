//! Fee computation and payer resolution.
//!
//! The protocol fee comes from the fee schedule (or a per-item override)
//! scaled by each item's multiplier; the gas fee is the node's estimate for
//! the call that is actually submitted. The payer is resolved in order of
//! precedence: explicit `paid_for_by`, the multisig's configured payer, an
//! active subsidy, then the signer itself.

use log::debug;
use polymesh_rpc::Call;
use polymesh_types::{Account, Address, Balance, Identity, MultiSig, TxTag};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::TxError;
use crate::transaction_spec::TxItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Fees {
    pub protocol: Balance,
    pub gas: Balance,
}

impl Fees {
    pub fn total(&self) -> Balance {
        self.protocol + self.gas
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PayingAccountType {
    Caller,
    Subsidy,
    Other,
}

/// Who pays the fees, with the funds available to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PayingAccountData {
    /// The signing account pays.
    Caller { account: Account, balance: Balance },
    /// A subsidizer pays, bounded by the allowance it granted.
    Subsidy {
        account: Account,
        balance: Balance,
        allowance: Balance,
    },
    /// Some other account (sponsor identity, multisig payer) pays.
    Other { account: Account, balance: Balance },
}

impl PayingAccountData {
    pub fn kind(&self) -> PayingAccountType {
        match self {
            PayingAccountData::Caller { .. } => PayingAccountType::Caller,
            PayingAccountData::Subsidy { .. } => PayingAccountType::Subsidy,
            PayingAccountData::Other { .. } => PayingAccountType::Other,
        }
    }

    pub fn account(&self) -> &Account {
        match self {
            PayingAccountData::Caller { account, .. }
            | PayingAccountData::Subsidy { account, .. }
            | PayingAccountData::Other { account, .. } => account,
        }
    }

    pub fn balance(&self) -> Balance {
        match self {
            PayingAccountData::Caller { balance, .. }
            | PayingAccountData::Subsidy { balance, .. }
            | PayingAccountData::Other { balance, .. } => *balance,
        }
    }

    pub fn allowance(&self) -> Option<Balance> {
        match self {
            PayingAccountData::Subsidy { allowance, .. } => Some(*allowance),
            _ => None,
        }
    }
}

/// Fees of one transaction together with who pays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayingAccountFees {
    pub fees: Fees,
    pub paying_account_data: PayingAccountData,
}

/// Sum of the items' protocol fees, each scaled by its multiplier.
///
/// Tags the schedule does not list cost nothing.
pub async fn protocol_fees(ctx: &Context, items: &[TxItem]) -> Result<Balance, TxError> {
    let mut missing: Vec<TxTag> = items
        .iter()
        .filter(|item| item.fee.is_none())
        .map(|item| item.tag().clone())
        .collect();
    missing.sort();
    missing.dedup();

    let schedule: HashMap<TxTag, Balance> = if missing.is_empty() {
        HashMap::new()
    } else {
        ctx.chain()
            .protocol_fees(&missing)
            .await?
            .into_iter()
            .map(|entry| (entry.tag, entry.fee))
            .collect()
    };

    Ok(items
        .iter()
        .map(|item| {
            let fee = item
                .fee
                .or_else(|| schedule.get(item.tag()).copied())
                .unwrap_or(Balance::ZERO);
            fee.saturating_mul(item.fee_multiplier)
        })
        .sum())
}

/// Resolve the paying account for a transaction signed by `signer`.
pub async fn resolve_payer(
    ctx: &Context,
    signer: &Address,
    multi_sig: Option<&MultiSig>,
    paid_for_by: Option<&Identity>,
) -> Result<PayingAccountData, TxError> {
    let chain = ctx.chain();

    let sponsor = match (paid_for_by, multi_sig) {
        (Some(identity), _) => Some(identity.did),
        (None, Some(multi_sig)) => chain.multi_sig_payer(&multi_sig.address).await?,
        (None, None) => None,
    };
    if let Some(did) = sponsor {
        let account = chain.primary_account(&did).await?;
        let balance = chain.account_balance(&account).await?.free;
        debug!("fees paid by {} on behalf of {}", account, did);
        return Ok(PayingAccountData::Other {
            account: Account::new(account),
            balance,
        });
    }

    if let Some(subsidy) = chain.subsidy(signer).await? {
        let balance = chain.account_balance(&subsidy.paying_account).await?.free;
        debug!("fees subsidized by {}", subsidy.paying_account);
        return Ok(PayingAccountData::Subsidy {
            account: Account::new(subsidy.paying_account),
            balance,
            allowance: subsidy.allowance,
        });
    }

    let balance = chain.account_balance(signer).await?.free;
    Ok(PayingAccountData::Caller {
        account: Account::new(signer.clone()),
        balance,
    })
}

/// Compute fees and payer for `items`, estimating gas on `submitted`.
pub async fn compute_fees(
    ctx: &Context,
    items: &[TxItem],
    submitted: &Call,
    signer: &Address,
    multi_sig: Option<&MultiSig>,
    paid_for_by: Option<&Identity>,
) -> Result<PayingAccountFees, TxError> {
    let protocol = protocol_fees(ctx, items).await?;
    let gas = ctx.chain().partial_fee(submitted, signer).await?;
    let paying_account_data = resolve_payer(ctx, signer, multi_sig, paid_for_by).await?;

    Ok(PayingAccountFees {
        fees: Fees { protocol, gas },
        paying_account_data,
    })
}

/// Refuse calls a subsidizer may not pay for.
pub fn check_subsidy_policy(config: &EngineConfig, tags: &[TxTag], payer: &PayingAccountData) -> Result<(), TxError> {
    if payer.kind() != PayingAccountType::Subsidy {
        return Ok(());
    }
    match tags.iter().find(|tag| !config.is_subsidizable(tag)) {
        Some(tag) => Err(TxError::SubsidyPolicy { tag: tag.clone() }),
        None => Ok(()),
    }
}

/// The payer must hold the total fee, and a subsidy must also allow it.
pub fn check_affordability(fees: &PayingAccountFees) -> Result<(), TxError> {
    let need = fees.fees.total();
    let payer = &fees.paying_account_data;

    if let Some(allowance) = payer.allowance() {
        if allowance < need {
            return Err(TxError::InsufficientAllowance {
                payer: payer.account().address.clone(),
                need,
                allowance,
            });
        }
    }

    if payer.balance() < need {
        return Err(TxError::InsufficientBalance {
            payer: payer.account().address.clone(),
            need,
            have: payer.balance(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polymesh_types::tags;

    fn address(seed: u8) -> Address {
        Address::from_public_key(&[seed; 32], 12).unwrap()
    }

    fn fees(protocol: u128, gas: u128, payer: PayingAccountData) -> PayingAccountFees {
        PayingAccountFees {
            fees: Fees {
                protocol: Balance(protocol),
                gas: Balance(gas),
            },
            paying_account_data: payer,
        }
    }

    #[test]
    fn test_affordability() {
        let caller = |balance| PayingAccountData::Caller {
            account: Account::new(address(1)),
            balance: Balance(balance),
        };
        assert!(check_affordability(&fees(100, 5, caller(105))).is_ok());
        assert_eq!(
            check_affordability(&fees(100, 5, caller(104))),
            Err(TxError::InsufficientBalance {
                payer: address(1),
                need: Balance(105),
                have: Balance(104),
            })
        );
    }

    #[test]
    fn test_subsidy_allowance_checked() {
        let subsidy = PayingAccountData::Subsidy {
            account: Account::new(address(2)),
            balance: Balance(1_000),
            allowance: Balance(50),
        };
        assert!(matches!(
            check_affordability(&fees(100, 0, subsidy)),
            Err(TxError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_subsidy_policy() {
        let config = EngineConfig::default();
        let subsidy = PayingAccountData::Subsidy {
            account: Account::new(address(2)),
            balance: Balance(1_000),
            allowance: Balance(1_000),
        };
        let caller = PayingAccountData::Caller {
            account: Account::new(address(1)),
            balance: Balance(1_000),
        };

        let bonding = [tags::BALANCES_TRANSFER, tags::STAKING_BOND];
        assert_eq!(
            check_subsidy_policy(&config, &bonding, &subsidy),
            Err(TxError::SubsidyPolicy { tag: tags::STAKING_BOND })
        );
        assert!(check_subsidy_policy(&config, &bonding, &caller).is_ok());
        assert!(check_subsidy_policy(&config, &[tags::BALANCES_TRANSFER], &subsidy).is_ok());
    }

    #[test]
    fn test_paying_account_serialize() {
        let payer = PayingAccountData::Other {
            account: Account::new(address(3)),
            balance: Balance(7),
        };
        let json = serde_json::to_value(&payer).unwrap();
        assert_eq!(json["type"], "Other");
        assert_eq!(json["balance"], "7");
    }
}
