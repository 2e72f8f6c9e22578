//! Property-based tests for the sufficiency rules.

use proptest::prelude::*;
use rust_decimal::Decimal;

use payflow_shared::types::{Chain, PaymentMethod, StrategyId, UserId};

use super::sufficiency::evaluate;
use super::types::Balance;
use crate::transaction::{Asset, FundingSource, TransactionDescriptor, TransactionKind};

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn nonnegative_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop::sample::select(PaymentMethod::ALL.to_vec())
}

fn funding_strategy() -> impl Strategy<Value = FundingSource> {
    prop_oneof![
        payment_method_strategy().prop_map(FundingSource::External),
        Just(FundingSource::Balance),
    ]
}

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
        funding_strategy().prop_map(|funding| TransactionKind::Buy {
            asset: Asset::new("BTC", Chain::Bitcoin),
            funding,
        }),
        Just(TransactionKind::Sell {
            asset: Asset::new("BTC", Chain::Bitcoin),
        }),
        funding_strategy().prop_map(|funding| TransactionKind::StrategyStart {
            strategy_id: StrategyId::from_uuid(uuid::Uuid::nil()),
            funding,
        }),
        Just(TransactionKind::StrategyStop { strategy_id: None }),
    ]
}

fn balance_strategy() -> impl Strategy<Value = Balance> {
    (nonnegative_strategy(), nonnegative_strategy(), nonnegative_strategy()).prop_map(
        |(available, invested, strategy)| {
            let mut balance = Balance::with_available(available);
            balance.invested_amount = invested;
            balance
                .strategies
                .insert(StrategyId::from_uuid(uuid::Uuid::nil()), strategy);
            balance
        },
    )
}

fn descriptor_strategy() -> impl Strategy<Value = TransactionDescriptor> {
    (amount_strategy(), kind_strategy()).prop_map(|(amount, kind)| {
        TransactionDescriptor::new(UserId::from_uuid(uuid::Uuid::nil()), amount, kind)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The deficit is always `max(0, amount - consulted pool)`,
    /// regardless of transaction type or fees.
    #[test]
    fn prop_deficit_formula(
        balance in balance_strategy(),
        descriptor in descriptor_strategy(),
        fee_total in nonnegative_strategy(),
    ) {
        let check = evaluate(&balance, &descriptor, fee_total);
        let expected = (descriptor.amount - check.available_balance).max(Decimal::ZERO);
        prop_assert_eq!(check.deficit, expected);
        prop_assert!(check.deficit >= Decimal::ZERO);
    }

    /// Deposits and externally funded transactions are sufficient even
    /// against a zero balance.
    #[test]
    fn prop_external_funding_never_blocked(
        amount in amount_strategy(),
        fee_total in nonnegative_strategy(),
        method in payment_method_strategy(),
    ) {
        let deposit = TransactionDescriptor::new(
            UserId::from_uuid(uuid::Uuid::nil()),
            amount,
            TransactionKind::Deposit { method },
        );
        prop_assert!(evaluate(&Balance::default(), &deposit, fee_total).sufficient);

        let buy = TransactionDescriptor::new(
            UserId::from_uuid(uuid::Uuid::nil()),
            amount,
            TransactionKind::Buy {
                asset: Asset::new("BTC", Chain::Bitcoin),
                funding: FundingSource::External(method),
            },
        );
        prop_assert!(evaluate(&Balance::default(), &buy, fee_total).sufficient);
    }

    /// Growing the consulted pool never flips a sufficient check back to
    /// insufficient.
    #[test]
    fn prop_sufficiency_monotone_in_balance(
        balance in balance_strategy(),
        descriptor in descriptor_strategy(),
        fee_total in nonnegative_strategy(),
        extra in nonnegative_strategy(),
    ) {
        let before = evaluate(&balance, &descriptor, fee_total);

        let mut grown = balance.clone();
        grown.available_for_spending += extra;
        grown.invested_amount += extra;
        for bucket in grown.strategies.values_mut() {
            *bucket += extra;
        }
        let after = evaluate(&grown, &descriptor, fee_total);

        prop_assert!(!before.sufficient || after.sufficient);
        prop_assert!(after.deficit <= before.deficit);
    }
}
