//! Type-aware sufficiency rules.
//!
//! Pure function: no locking, no state. The balance model re-runs this
//! under the per-user lock at mutation time, so passing here is a
//! preview, not a reservation.

use rust_decimal::Decimal;

use payflow_shared::types::TransactionType;

use super::types::{Balance, SufficiencyCheck};
use crate::transaction::{FundingSource, TransactionDescriptor, TransactionKind};

/// Evaluates the type-specific sufficiency rule for a transaction.
///
/// Rules:
/// - deposit: always sufficient (external source)
/// - withdraw / transfer: `available >= amount`
/// - buy / strategy start, internally funded: `available >= amount +
///   fees`; externally funded: always sufficient
/// - sell: `invested >= amount`
/// - strategy stop: named strategy's amount `>= amount` (aggregate
///   across strategies when no id is given)
///
/// `deficit` is always `max(0, amount - consulted pool)`.
#[must_use]
pub fn evaluate(
    balance: &Balance,
    descriptor: &TransactionDescriptor,
    fee_total: Decimal,
) -> SufficiencyCheck {
    let amount = descriptor.amount;
    let ty = descriptor.transaction_type();

    // (pool consulted, amount that pool must cover)
    let (pool, required) = match (ty, descriptor.kind.funding_source()) {
        (TransactionType::Deposit, _) => (balance.available_for_spending, Decimal::ZERO),
        (TransactionType::Withdraw | TransactionType::Transfer, _) => {
            (balance.available_for_spending, amount)
        }
        (
            TransactionType::Buy | TransactionType::StrategyStart,
            FundingSource::External(_),
        ) => (balance.available_for_spending, Decimal::ZERO),
        (TransactionType::Buy | TransactionType::StrategyStart, FundingSource::Balance) => {
            (balance.available_for_spending, amount + fee_total)
        }
        (TransactionType::Sell, _) => (balance.invested_amount, amount),
        (TransactionType::StrategyStop, _) => {
            let pool = match &descriptor.kind {
                TransactionKind::StrategyStop {
                    strategy_id: Some(id),
                } => balance.strategy_amount(*id),
                _ => balance.total_strategy_amount(),
            };
            (pool, amount)
        }
    };

    SufficiencyCheck {
        sufficient: pool >= required,
        available_balance: pool,
        deficit: (amount - pool).max(Decimal::ZERO),
    }
}
