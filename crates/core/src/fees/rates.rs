//! Fee rate tables.
//!
//! Thin lookup layer over the configured rate book. Every lookup is
//! fail-open: a missing key resolves to rate zero and logs a warning.
//! Unknown configuration must never block a transaction, only
//! under-price it, which is acceptable for a non-capital-safety
//! component. The platform-fee minimum is the exception and always
//! applies.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use payflow_shared::config::FeeConfig;
use payflow_shared::types::{Chain, Direction, PaymentMethod, TransactionType};

/// Static fee-rate configuration, keyed by transaction type, chain, and
/// payment instrument.
#[derive(Debug, Clone)]
pub struct FeeRateTables {
    min_platform_fee: Decimal,
    platform: HashMap<TransactionType, Decimal>,
    network: HashMap<Chain, Decimal>,
    provider: HashMap<Direction, HashMap<PaymentMethod, Decimal>>,
    exchange: HashMap<TransactionType, Decimal>,
    protocol: HashMap<TransactionType, Decimal>,
}

impl FeeRateTables {
    /// Builds rate tables from configuration.
    #[must_use]
    pub fn from_config(config: &FeeConfig) -> Self {
        Self {
            min_platform_fee: config.min_platform_fee,
            platform: config.platform.clone(),
            network: config.network.clone(),
            provider: config.provider.clone(),
            exchange: config.exchange.clone(),
            protocol: config.protocol.clone(),
        }
    }

    /// The platform-fee floor.
    #[must_use]
    pub fn min_platform_fee(&self) -> Decimal {
        self.min_platform_fee
    }

    /// Platform fee rate for a transaction type.
    #[must_use]
    pub fn platform_rate(&self, ty: TransactionType) -> Decimal {
        self.platform.get(&ty).copied().unwrap_or_else(|| {
            warn!(transaction_type = %ty, "no platform fee rate configured, using 0");
            Decimal::ZERO
        })
    }

    /// Network fee rate for a settlement chain.
    ///
    /// `None` means no chain could be resolved for the transaction; the
    /// network fee is zero in that case.
    #[must_use]
    pub fn network_rate(&self, chain: Option<Chain>) -> Decimal {
        let Some(chain) = chain else {
            warn!("no settlement chain resolved, network fee is 0");
            return Decimal::ZERO;
        };
        self.network.get(&chain).copied().unwrap_or_else(|| {
            warn!(chain = %chain, "no network fee rate configured, using 0");
            Decimal::ZERO
        })
    }

    /// Provider fee rate for a direction and payment method.
    #[must_use]
    pub fn provider_rate(&self, direction: Direction, method: PaymentMethod) -> Decimal {
        self.provider
            .get(&direction)
            .and_then(|methods| methods.get(&method))
            .copied()
            .unwrap_or_else(|| {
                warn!(
                    direction = %direction,
                    method = %method,
                    "no provider fee rate configured, using 0"
                );
                Decimal::ZERO
            })
    }

    /// Exchange fee rate for an internally funded transaction type.
    #[must_use]
    pub fn exchange_rate(&self, ty: TransactionType) -> Decimal {
        self.exchange.get(&ty).copied().unwrap_or_else(|| {
            warn!(transaction_type = %ty, "no exchange fee rate configured, using 0");
            Decimal::ZERO
        })
    }

    /// Protocol fee rate for a transaction type.
    ///
    /// Only strategy operations pay a protocol fee; other types resolve
    /// to zero without consulting the table (and without a warning).
    #[must_use]
    pub fn protocol_rate(&self, ty: TransactionType) -> Decimal {
        if !ty.is_strategy() {
            return Decimal::ZERO;
        }
        self.protocol.get(&ty).copied().unwrap_or_else(|| {
            warn!(transaction_type = %ty, "no protocol fee rate configured, using 0");
            Decimal::ZERO
        })
    }
}

impl Default for FeeRateTables {
    fn default() -> Self {
        Self::from_config(&FeeConfig::default())
    }
}
