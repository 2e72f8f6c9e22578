//! Stateful balance model.
//!
//! Holds one shard per user, hydrated lazily from the balance source.
//! A per-user `tokio::sync::Mutex` serializes check-then-mutate: two
//! concurrent transactions for the same user cannot both pass a
//! sufficiency check against funds neither has debited yet. Duplicate
//! transaction ids are rejected idempotently, never re-applied.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use dashmap::DashMap;

use payflow_shared::types::{TransactionId, TransactionType, UserId};

use super::error::BalanceError;
use super::sufficiency;
use super::types::{Balance, SufficiencyCheck};
use crate::fees::FeeBreakdown;
use crate::providers::BalanceSource;
use crate::transaction::{FundingSource, TransactionDescriptor, TransactionKind};

/// Per-user shard: the balance plus the set of applied transaction ids.
#[derive(Debug)]
struct UserLedger {
    balance: Balance,
    applied: HashSet<TransactionId>,
}

/// The balance model. Owns every user's balance exclusively; mutations
/// happen only through [`BalanceModel::commit`] on completed
/// transactions.
pub struct BalanceModel {
    source: Arc<dyn BalanceSource>,
    shards: DashMap<UserId, Arc<Mutex<UserLedger>>>,
}

impl BalanceModel {
    /// Creates a model over a balance source.
    #[must_use]
    pub fn new(source: Arc<dyn BalanceSource>) -> Self {
        Self {
            source,
            shards: DashMap::new(),
        }
    }

    /// Returns the user's shard, hydrating it from the source on first
    /// touch. If two tasks race the hydration, the first insert wins
    /// (the source is read-only, so both fetched the same snapshot).
    async fn shard(&self, user_id: UserId) -> Arc<Mutex<UserLedger>> {
        if let Some(existing) = self.shards.get(&user_id) {
            return Arc::clone(&existing);
        }

        let balance = self.source.fetch(user_id).await;
        debug!(%user_id, "hydrated balance shard");
        Arc::clone(&self.shards.entry(user_id).or_insert_with(|| {
            Arc::new(Mutex::new(UserLedger {
                balance,
                applied: HashSet::new(),
            }))
        }))
    }

    /// A point-in-time copy of the user's balance.
    pub async fn snapshot(&self, user_id: UserId) -> Balance {
        let shard = self.shard(user_id).await;
        let ledger = shard.lock().await;
        ledger.balance.clone()
    }

    /// Runs the type-aware sufficiency rule against the current
    /// balance.
    ///
    /// Advisory only: the rule is re-evaluated inside [`Self::commit`]
    /// under the user lock before any mutation is applied.
    pub async fn check(
        &self,
        descriptor: &TransactionDescriptor,
        fee_total: Decimal,
    ) -> SufficiencyCheck {
        let shard = self.shard(descriptor.user_id).await;
        let ledger = shard.lock().await;
        sufficiency::evaluate(&ledger.balance, descriptor, fee_total)
    }

    /// Applies the balance mutation for a completed transaction.
    ///
    /// Atomic per user: duplicate detection, sufficiency re-check, and
    /// the mutation itself all happen under one lock acquisition.
    ///
    /// # Errors
    ///
    /// - [`BalanceError::DuplicateTransaction`] if this id has already
    ///   been applied (the balance is left untouched)
    /// - [`BalanceError::Insufficient`] if the re-check fails
    pub async fn commit(
        &self,
        transaction_id: TransactionId,
        descriptor: &TransactionDescriptor,
        fees: &FeeBreakdown,
    ) -> Result<Balance, BalanceError> {
        let shard = self.shard(descriptor.user_id).await;
        let mut ledger = shard.lock().await;

        if ledger.applied.contains(&transaction_id) {
            return Err(BalanceError::DuplicateTransaction(transaction_id));
        }

        // Time-of-check/time-of-use guard: the advisory check may be
        // stale by now, so the rule runs again under the lock.
        let check = sufficiency::evaluate(&ledger.balance, descriptor, fees.total);
        if !check.sufficient {
            return Err(BalanceError::Insufficient {
                required: descriptor.amount,
                available: check.available_balance,
                deficit: check.deficit,
            });
        }

        apply(&mut ledger.balance, descriptor, fees);
        ledger.applied.insert(transaction_id);

        info!(
            user_id = %descriptor.user_id,
            %transaction_id,
            transaction_type = %descriptor.transaction_type(),
            amount = %descriptor.amount,
            "balance mutation applied"
        );
        Ok(ledger.balance.clone())
    }
}

/// Applies the per-type balance movement. Callers must have verified
/// sufficiency; every subtraction here is covered by the rule that just
/// passed, which is what keeps the balance non-negative.
fn apply(balance: &mut Balance, descriptor: &TransactionDescriptor, fees: &FeeBreakdown) {
    let amount = descriptor.amount;
    match descriptor.transaction_type() {
        // Inbound funding credits the net amount (fees are withheld by
        // the instrument before the money lands).
        TransactionType::Deposit => {
            balance.available_for_spending += amount - fees.total;
        }
        // Outbound types debit the full amount; fees are tracked on the
        // record, not double-deducted.
        TransactionType::Withdraw | TransactionType::Transfer => {
            balance.available_for_spending -= amount;
        }
        TransactionType::Buy => {
            if descriptor.kind.funding_source() == FundingSource::Balance {
                balance.available_for_spending -= amount;
            }
            balance.invested_amount += amount;
        }
        TransactionType::Sell => {
            balance.invested_amount -= amount;
            balance.available_for_spending += amount;
        }
        TransactionType::StrategyStart => {
            if descriptor.kind.funding_source() == FundingSource::Balance {
                balance.available_for_spending -= amount;
            }
            if let TransactionKind::StrategyStart { strategy_id, .. } = &descriptor.kind {
                *balance.strategies.entry(*strategy_id).or_default() += amount;
            }
        }
        TransactionType::StrategyStop => {
            drain_strategies(balance, descriptor, amount);
            balance.available_for_spending += amount;
        }
    }
}

/// Removes `amount` from strategy buckets: the named strategy when an
/// id is given, otherwise across all strategies in id order.
fn drain_strategies(balance: &mut Balance, descriptor: &TransactionDescriptor, amount: Decimal) {
    if let TransactionKind::StrategyStop {
        strategy_id: Some(id),
    } = &descriptor.kind
    {
        if let Some(bucket) = balance.strategies.get_mut(id) {
            *bucket -= amount;
        }
        return;
    }

    let mut remaining = amount;
    for bucket in balance.strategies.values_mut() {
        if remaining.is_zero() {
            break;
        }
        let take = (*bucket).min(remaining);
        *bucket -= take;
        remaining -= take;
    }
}
