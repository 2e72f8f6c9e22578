//! Fee breakdown types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The rate applied per fee component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppliedRates {
    /// Platform fee rate (before the minimum floor).
    pub platform: Decimal,
    /// Network fee rate of the resolved settlement chain.
    pub network: Decimal,
    /// Provider fee rate (zero when internally funded).
    pub provider: Decimal,
    /// Exchange fee rate (zero when externally funded).
    pub exchange: Decimal,
    /// Protocol fee rate (zero for non-strategy types).
    pub protocol: Decimal,
}

/// Per-component fee amounts for one transaction.
///
/// Invariants, maintained by the calculator:
/// - `total` equals the sum of the five components
/// - exactly one of `provider_fee` / `exchange_fee` is nonzero-eligible
///   (the other is always zero)
/// - for a positive amount, `platform_fee` is always positive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Base service fee, floored at the configured minimum.
    pub platform_fee: Decimal,
    /// Settlement chain processing cost.
    pub network_fee: Decimal,
    /// External payment instrument cost (zero when internally funded).
    pub provider_fee: Decimal,
    /// Internal conversion cost (zero when externally funded).
    pub exchange_fee: Decimal,
    /// Yield-strategy protocol interaction cost.
    pub protocol_fee: Decimal,
    /// Sum of all components.
    pub total: Decimal,
    /// The rate applied per component.
    pub rates: AppliedRates,
}

impl FeeBreakdown {
    /// The single instrument-cost slot shown to users: provider fee for
    /// externally funded transactions, exchange fee otherwise. At most
    /// one of the two is ever nonzero.
    #[must_use]
    pub fn processing_fee(&self) -> Decimal {
        self.provider_fee + self.exchange_fee
    }

    /// Converts to the legacy-compatible wire shape.
    #[must_use]
    pub fn to_wire(&self) -> FeeBreakdownWire {
        FeeBreakdownWire {
            platform_fee: self.platform_fee,
            service_fee: self.platform_fee,
            network_fee: self.network_fee,
            provider_fee: self.provider_fee,
            exchange_fee: self.exchange_fee,
            processing_fee: self.processing_fee(),
            protocol_fee: self.protocol_fee,
            total: self.total,
            rates: self.rates,
        }
    }
}

/// Legacy-compatible serialization of a [`FeeBreakdown`].
///
/// Older clients read `service_fee` (= platform fee) and
/// `processing_fee` (= provider or exchange fee, whichever applies).
/// Both names carry the same numeric values as their canonical
/// counterparts and never diverge; this adapter exists strictly at the
/// interface boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBreakdownWire {
    /// Canonical platform fee.
    pub platform_fee: Decimal,
    /// Legacy alias for the platform fee.
    pub service_fee: Decimal,
    /// Network fee.
    pub network_fee: Decimal,
    /// Canonical provider fee.
    pub provider_fee: Decimal,
    /// Canonical exchange fee.
    pub exchange_fee: Decimal,
    /// Legacy display slot: provider or exchange fee.
    pub processing_fee: Decimal,
    /// Protocol fee.
    pub protocol_fee: Decimal,
    /// Sum of all components.
    pub total: Decimal,
    /// The rate applied per component.
    pub rates: AppliedRates,
}
