//! Balance domain types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use payflow_shared::types::StrategyId;

/// A user's balance: liquid, invested, and per-strategy amounts.
///
/// Owned exclusively by the balance model; mutated only on completed
/// transactions. Never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Liquid, immediately spendable balance (stable-asset denominated).
    pub available_for_spending: Decimal,
    /// Aggregate value of held non-liquid assets.
    pub invested_amount: Decimal,
    /// Current amount per active yield strategy.
    pub strategies: BTreeMap<StrategyId, Decimal>,
}

impl Balance {
    /// A balance with only liquid funds.
    #[must_use]
    pub fn with_available(available: Decimal) -> Self {
        Self {
            available_for_spending: available,
            ..Self::default()
        }
    }

    /// The current amount in one strategy (zero if not held).
    #[must_use]
    pub fn strategy_amount(&self, strategy_id: StrategyId) -> Decimal {
        self.strategies
            .get(&strategy_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Aggregate amount across all strategies.
    #[must_use]
    pub fn total_strategy_amount(&self) -> Decimal {
        self.strategies.values().copied().sum()
    }
}

/// Result of a type-aware sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SufficiencyCheck {
    /// Whether the transaction may proceed.
    pub sufficient: bool,
    /// The balance pool the rule consulted (available, invested, or
    /// strategy amount, depending on transaction type).
    pub available_balance: Decimal,
    /// `max(0, amount - available_balance)`.
    pub deficit: Decimal,
}
