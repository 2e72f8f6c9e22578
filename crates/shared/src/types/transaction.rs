//! Transaction type classification.
//!
//! The flat [`TransactionType`] keys every rate table and minimum-amount
//! table. The structured per-type payloads live in `payflow-core`; this
//! enum is only the classification axis shared with configuration.

use serde::{Deserialize, Serialize};

/// Transaction type classification.
///
/// Categorizes transactions for fee lookup, minimum-amount enforcement,
/// and balance accounting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Inbound fiat funding from an external instrument.
    Deposit,
    /// Outbound fiat or asset withdrawal to an external instrument.
    Withdraw,
    /// Peer-to-peer transfer funded from the available balance.
    Transfer,
    /// Asset purchase.
    Buy,
    /// Asset sale.
    Sell,
    /// Yield-strategy start (capital moves into a strategy).
    StrategyStart,
    /// Yield-strategy stop (capital exits a strategy).
    StrategyStop,
}

impl TransactionType {
    /// All transaction types, for table construction and tests.
    pub const ALL: [Self; 7] = [
        Self::Deposit,
        Self::Withdraw,
        Self::Transfer,
        Self::Buy,
        Self::Sell,
        Self::StrategyStart,
        Self::StrategyStop,
    ];

    /// Returns true for inbound funding types (external money coming in).
    ///
    /// Inbound types credit `amount - fees.total` to the balance; every
    /// other type debits the full requested amount and tracks fees
    /// separately.
    #[must_use]
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Deposit)
    }

    /// Returns true for trade types that require an asset.
    #[must_use]
    pub fn is_trade(&self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }

    /// Returns true for yield-strategy types (the only protocol-fee payers).
    #[must_use]
    pub fn is_strategy(&self) -> bool {
        matches!(self, Self::StrategyStart | Self::StrategyStop)
    }

    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::StrategyStart => "strategy_start",
            Self::StrategyStop => "strategy_stop",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
