//! Transaction descriptor domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use payflow_shared::types::{Chain, Direction, PaymentMethod, StrategyId, TransactionType, UserId};

/// An asset and the chain it settles on.
///
/// The settlement chain drives the network fee for purchases and sales:
/// buying an asset always pays the network fee of the chain the asset
/// settles on, never the chain the funding came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Ticker symbol (e.g., "BTC", "ETH", "SOL").
    pub symbol: String,
    /// The chain this asset settles on.
    pub chain: Chain,
}

impl Asset {
    /// Creates a new asset.
    #[must_use]
    pub fn new(symbol: impl Into<String>, chain: Chain) -> Self {
        Self {
            symbol: symbol.into(),
            chain,
        }
    }
}

/// How a transaction is funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// Funded by an external payment instrument; pays a provider fee.
    External(PaymentMethod),
    /// Funded from the platform's custodial balance; pays an exchange fee.
    Balance,
}

/// Optional source/target chain specification for cross-chain settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingPlan {
    /// Chain the funds originate on.
    pub source_chain: Chain,
    /// Chain the funds settle on. Overrides the descriptor's own chain
    /// for network-fee purposes.
    pub target_chain: Chain,
}

/// Per-type transaction payload.
///
/// Closed tagged variant: each transaction type declares exactly its
/// required fields, so an incomplete descriptor is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Inbound fiat funding from an external instrument.
    Deposit {
        /// The external instrument funding the deposit.
        method: PaymentMethod,
    },
    /// Outbound withdrawal to an external instrument.
    Withdraw {
        /// The external instrument receiving the funds.
        method: PaymentMethod,
        /// Destination address for wallet withdrawals; unused for
        /// card/bank rails.
        destination: Option<String>,
    },
    /// Peer-to-peer transfer funded from the available balance.
    Transfer {
        /// Recipient peer username.
        recipient: String,
    },
    /// Asset purchase.
    Buy {
        /// The asset being purchased.
        asset: Asset,
        /// External instrument or custodial balance.
        funding: FundingSource,
    },
    /// Asset sale (always settles into the custodial balance).
    Sell {
        /// The asset being sold.
        asset: Asset,
    },
    /// Yield-strategy start.
    StrategyStart {
        /// The strategy receiving the capital.
        strategy_id: StrategyId,
        /// External instrument or custodial balance.
        funding: FundingSource,
    },
    /// Yield-strategy stop. With no id, drains across all strategies.
    StrategyStop {
        /// The strategy to exit, or `None` for an aggregate exit.
        strategy_id: Option<StrategyId>,
    },
}

impl TransactionKind {
    /// The flat classification used to key rate and limit tables.
    #[must_use]
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Deposit { .. } => TransactionType::Deposit,
            Self::Withdraw { .. } => TransactionType::Withdraw,
            Self::Transfer { .. } => TransactionType::Transfer,
            Self::Buy { .. } => TransactionType::Buy,
            Self::Sell { .. } => TransactionType::Sell,
            Self::StrategyStart { .. } => TransactionType::StrategyStart,
            Self::StrategyStop { .. } => TransactionType::StrategyStop,
        }
    }

    /// How this transaction is funded.
    ///
    /// Deposits and withdrawals always ride an external instrument;
    /// transfers, sales, and strategy stops always spend the custodial
    /// balance; buys and strategy starts declare their funding.
    #[must_use]
    pub fn funding_source(&self) -> FundingSource {
        match self {
            Self::Deposit { method } | Self::Withdraw { method, .. } => {
                FundingSource::External(*method)
            }
            Self::Buy { funding, .. } | Self::StrategyStart { funding, .. } => *funding,
            Self::Transfer { .. } | Self::Sell { .. } | Self::StrategyStop { .. } => {
                FundingSource::Balance
            }
        }
    }

    /// Provider-fee direction: inbound money is onramp, outbound offramp.
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::Deposit { .. } | Self::Buy { .. } | Self::StrategyStart { .. } => {
                Direction::Onramp
            }
            Self::Withdraw { .. }
            | Self::Transfer { .. }
            | Self::Sell { .. }
            | Self::StrategyStop { .. } => Direction::Offramp,
        }
    }

    /// The asset being traded, for trade-type transactions.
    #[must_use]
    pub fn asset(&self) -> Option<&Asset> {
        match self {
            Self::Buy { asset, .. } | Self::Sell { asset } => Some(asset),
            _ => None,
        }
    }
}

/// Everything needed to process one transaction.
///
/// Immutable once fees are attached: the flow's confirmation snapshot
/// takes ownership of a clone and is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    /// The user initiating the transaction.
    pub user_id: UserId,
    /// Requested amount, stable-asset denominated.
    pub amount: Decimal,
    /// Per-type payload.
    pub kind: TransactionKind,
    /// Settlement chain for fiat and peer operations. Trades ignore this
    /// in favor of the asset's own settlement chain.
    pub chain: Option<Chain>,
    /// Free-form note shown in transaction history.
    pub memo: Option<String>,
}

impl TransactionDescriptor {
    /// Creates a descriptor with no chain or memo.
    #[must_use]
    pub fn new(user_id: UserId, amount: Decimal, kind: TransactionKind) -> Self {
        Self {
            user_id,
            amount,
            kind,
            chain: None,
            memo: None,
        }
    }

    /// Sets the settlement chain.
    #[must_use]
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// The flat transaction type.
    #[must_use]
    pub fn transaction_type(&self) -> TransactionType {
        self.kind.transaction_type()
    }

    /// The chain the transaction settles on, before routing overrides.
    ///
    /// Trades settle on the target asset's chain; everything else uses
    /// the descriptor's own chain.
    #[must_use]
    pub fn settlement_chain(&self) -> Option<Chain> {
        match &self.kind {
            TransactionKind::Buy { asset, .. } | TransactionKind::Sell { asset } => {
                Some(asset.chain)
            }
            _ => self.chain,
        }
    }

    /// The chain used for the network fee: the routing plan's target
    /// chain when present, otherwise the settlement chain.
    #[must_use]
    pub fn resolved_chain(&self, routing: Option<&RoutingPlan>) -> Option<Chain> {
        routing
            .map(|plan| plan.target_chain)
            .or_else(|| self.settlement_chain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn descriptor(kind: TransactionKind) -> TransactionDescriptor {
        TransactionDescriptor::new(UserId::new(), dec!(100), kind)
    }

    #[test]
    fn test_funding_source_per_kind() {
        let deposit = TransactionKind::Deposit {
            method: PaymentMethod::Card,
        };
        assert_eq!(
            deposit.funding_source(),
            FundingSource::External(PaymentMethod::Card)
        );

        let transfer = TransactionKind::Transfer {
            recipient: "alice_01".into(),
        };
        assert_eq!(transfer.funding_source(), FundingSource::Balance);

        let buy = TransactionKind::Buy {
            asset: Asset::new("SOL", Chain::Solana),
            funding: FundingSource::External(PaymentMethod::BankTransfer),
        };
        assert_eq!(
            buy.funding_source(),
            FundingSource::External(PaymentMethod::BankTransfer)
        );
    }

    #[test]
    fn test_direction_per_kind() {
        assert_eq!(
            TransactionKind::Deposit {
                method: PaymentMethod::Card
            }
            .direction(),
            Direction::Onramp
        );
        assert_eq!(
            TransactionKind::Withdraw {
                method: PaymentMethod::BankTransfer,
                destination: None
            }
            .direction(),
            Direction::Offramp
        );
    }

    #[test]
    fn test_trade_settles_on_asset_chain_not_descriptor_chain() {
        // The descriptor claims Ethereum but the asset settles on Solana;
        // the asset chain must win.
        let desc = descriptor(TransactionKind::Buy {
            asset: Asset::new("SOL", Chain::Solana),
            funding: FundingSource::Balance,
        })
        .with_chain(Chain::Ethereum);

        assert_eq!(desc.settlement_chain(), Some(Chain::Solana));
        assert_eq!(desc.resolved_chain(None), Some(Chain::Solana));
    }

    #[test]
    fn test_routing_plan_overrides_settlement_chain() {
        let desc = descriptor(TransactionKind::Sell {
            asset: Asset::new("ETH", Chain::Ethereum),
        });
        let plan = RoutingPlan {
            source_chain: Chain::Ethereum,
            target_chain: Chain::Sui,
        };
        assert_eq!(desc.resolved_chain(Some(&plan)), Some(Chain::Sui));
    }

    #[test]
    fn test_fiat_ops_use_descriptor_chain() {
        let desc = descriptor(TransactionKind::Deposit {
            method: PaymentMethod::Card,
        })
        .with_chain(Chain::Solana);
        assert_eq!(desc.resolved_chain(None), Some(Chain::Solana));

        let bare = descriptor(TransactionKind::Transfer {
            recipient: "bob_42".into(),
        });
        assert_eq!(bare.resolved_chain(None), None);
    }

    #[test]
    fn test_kind_serde_tagging() {
        let kind = TransactionKind::StrategyStop { strategy_id: None };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "strategy_stop");
    }
}
