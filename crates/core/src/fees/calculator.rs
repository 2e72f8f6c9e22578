//! Fee calculator.
//!
//! Pure function from a transaction descriptor (plus optional routing
//! plan) to a fee breakdown. Deterministic: identical inputs always
//! produce identical output, which is what makes memoization safe.

use rust_decimal::Decimal;

use super::error::FeeError;
use super::rates::FeeRateTables;
use super::types::{AppliedRates, FeeBreakdown};
use crate::transaction::{FundingSource, RoutingPlan, TransactionDescriptor};

/// Calculates the fee breakdown for a transaction.
///
/// Components:
/// 1. platform fee = `max(amount * platform_rate, min_platform_fee)`
/// 2. network fee = `amount * network_rate(resolved chain)`; trades
///    resolve to the chain the target asset settles on, and a routing
///    plan's target chain overrides everything
/// 3. exactly one of provider fee (external instrument) or exchange fee
///    (custodial balance funding)
/// 4. protocol fee, nonzero only for strategy operations
///
/// # Errors
///
/// Returns [`FeeError::InvalidAmount`] for amounts that are not strictly
/// positive. Missing rate keys never error (fail-open to zero).
pub fn calculate(
    tables: &FeeRateTables,
    descriptor: &TransactionDescriptor,
    routing: Option<&RoutingPlan>,
) -> Result<FeeBreakdown, FeeError> {
    let amount = descriptor.amount;
    if amount <= Decimal::ZERO {
        return Err(FeeError::InvalidAmount { amount });
    }

    let ty = descriptor.transaction_type();

    let platform_rate = tables.platform_rate(ty);
    let platform_fee = (amount * platform_rate).max(tables.min_platform_fee());

    let network_rate = tables.network_rate(descriptor.resolved_chain(routing));
    let network_fee = amount * network_rate;

    // Exactly one of provider/exchange applies, decided by funding.
    let (provider_rate, exchange_rate) = match descriptor.kind.funding_source() {
        FundingSource::External(method) => (
            tables.provider_rate(descriptor.kind.direction(), method),
            Decimal::ZERO,
        ),
        FundingSource::Balance => (Decimal::ZERO, tables.exchange_rate(ty)),
    };
    let provider_fee = amount * provider_rate;
    let exchange_fee = amount * exchange_rate;

    let protocol_rate = tables.protocol_rate(ty);
    let protocol_fee = amount * protocol_rate;

    let total = platform_fee + network_fee + provider_fee + exchange_fee + protocol_fee;

    Ok(FeeBreakdown {
        platform_fee,
        network_fee,
        provider_fee,
        exchange_fee,
        protocol_fee,
        total,
        rates: AppliedRates {
            platform: platform_rate,
            network: network_rate,
            provider: provider_rate,
            exchange: exchange_rate,
            protocol: protocol_rate,
        },
    })
}
