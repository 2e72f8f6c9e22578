//! Property-based tests for the fee calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;

use payflow_shared::types::{Chain, PaymentMethod, StrategyId, UserId};

use super::calculator::calculate;
use super::rates::FeeRateTables;
use crate::transaction::{
    Asset, FundingSource, RoutingPlan, TransactionDescriptor, TransactionKind,
};

/// Strategy for positive amounts (0.01 .. 10_000_000.00).
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop::sample::select(PaymentMethod::ALL.to_vec())
}

fn chain_strategy() -> impl Strategy<Value = Chain> {
    prop::sample::select(Chain::ALL.to_vec())
}

fn asset_strategy() -> impl Strategy<Value = Asset> {
    chain_strategy().prop_map(|chain| Asset::new(format!("AST-{chain}"), chain))
}

fn funding_strategy() -> impl Strategy<Value = FundingSource> {
    prop_oneof![
        payment_method_strategy().prop_map(FundingSource::External),
        Just(FundingSource::Balance),
    ]
}

/// Strategy covering every transaction kind.
fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        payment_method_strategy().prop_map(|method| TransactionKind::Deposit { method }),
        payment_method_strategy().prop_map(|method| TransactionKind::Withdraw {
            method,
            destination: None,
        }),
        Just(TransactionKind::Transfer {
            recipient: "peer_user".into(),
        }),
        (asset_strategy(), funding_strategy())
            .prop_map(|(asset, funding)| TransactionKind::Buy { asset, funding }),
        asset_strategy().prop_map(|asset| TransactionKind::Sell { asset }),
        funding_strategy().prop_map(|funding| TransactionKind::StrategyStart {
            strategy_id: StrategyId::from_uuid(uuid::Uuid::nil()),
            funding,
        }),
        Just(TransactionKind::StrategyStop { strategy_id: None }),
    ]
}

fn descriptor_strategy() -> impl Strategy<Value = TransactionDescriptor> {
    (
        amount_strategy(),
        kind_strategy(),
        prop::option::of(chain_strategy()),
    )
        .prop_map(|(amount, kind, chain)| TransactionDescriptor {
            user_id: UserId::from_uuid(uuid::Uuid::nil()),
            amount,
            kind,
            chain,
            memo: None,
        })
}

fn routing_strategy() -> impl Strategy<Value = Option<RoutingPlan>> {
    prop::option::of((chain_strategy(), chain_strategy()).prop_map(
        |(source_chain, target_chain)| RoutingPlan {
            source_chain,
            target_chain,
        },
    ))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// For all valid types and amounts > 0, the total equals the sum of
    /// its components and is strictly positive.
    #[test]
    fn prop_total_is_component_sum_and_positive(
        descriptor in descriptor_strategy(),
        routing in routing_strategy(),
    ) {
        let tables = FeeRateTables::default();
        let fees = calculate(&tables, &descriptor, routing.as_ref()).unwrap();

        prop_assert_eq!(
            fees.total,
            fees.platform_fee
                + fees.network_fee
                + fees.provider_fee
                + fees.exchange_fee
                + fees.protocol_fee,
        );
        prop_assert!(fees.total > Decimal::ZERO);
    }

    /// For a positive amount the platform fee is always positive (the
    /// minimum floor guarantees this even at rate zero).
    #[test]
    fn prop_platform_fee_always_positive(
        descriptor in descriptor_strategy(),
    ) {
        let tables = FeeRateTables::default();
        let fees = calculate(&tables, &descriptor, None).unwrap();
        prop_assert!(fees.platform_fee > Decimal::ZERO);
    }

    /// Exactly one of provider/exchange fee applies: the slot not chosen
    /// by the funding source is always zero.
    #[test]
    fn prop_provider_xor_exchange(
        descriptor in descriptor_strategy(),
    ) {
        let tables = FeeRateTables::default();
        let fees = calculate(&tables, &descriptor, None).unwrap();

        match descriptor.kind.funding_source() {
            FundingSource::External(_) => prop_assert_eq!(fees.exchange_fee, Decimal::ZERO),
            FundingSource::Balance => prop_assert_eq!(fees.provider_fee, Decimal::ZERO),
        }
    }

    /// Identical (descriptor, routing plan) inputs always produce
    /// identical fee output.
    #[test]
    fn prop_calculation_is_deterministic(
        descriptor in descriptor_strategy(),
        routing in routing_strategy(),
    ) {
        let tables = FeeRateTables::default();
        let first = calculate(&tables, &descriptor, routing.as_ref()).unwrap();
        let second = calculate(&tables, &descriptor, routing.as_ref()).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Protocol fee is zero for every non-strategy transaction type.
    #[test]
    fn prop_protocol_fee_strategy_only(
        descriptor in descriptor_strategy(),
    ) {
        let tables = FeeRateTables::default();
        let fees = calculate(&tables, &descriptor, None).unwrap();
        if !descriptor.transaction_type().is_strategy() {
            prop_assert_eq!(fees.protocol_fee, Decimal::ZERO);
        }
    }
}
