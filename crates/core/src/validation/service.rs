//! The transaction validator.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use payflow_shared::config::LimitsConfig;
use payflow_shared::types::{PaymentMethod, TransactionType};

use super::recipient::{is_valid_username, matches_chain};
use crate::transaction::{TransactionDescriptor, TransactionKind};

/// Field-level validation outcome.
///
/// `errors` maps field name to message; ordered so reports are stable
/// across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Field name to error message, empty when valid.
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// True when no field failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field.to_string(), message.into());
    }
}

/// Validates descriptors against amount limits and recipient formats.
///
/// Validation never consults balances or rates: it checks only what the
/// descriptor itself carries, so a report is stable for a given input.
#[derive(Debug, Clone)]
pub struct TransactionValidator {
    minimums: std::collections::HashMap<TransactionType, Decimal>,
}

impl TransactionValidator {
    /// Creates a validator from the limits configuration.
    #[must_use]
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            minimums: limits.minimum_amounts.clone(),
        }
    }

    /// The minimum amount for a transaction type (zero when unset).
    #[must_use]
    pub fn minimum_amount(&self, ty: TransactionType) -> Decimal {
        self.minimums.get(&ty).copied().unwrap_or_default()
    }

    /// Checks a descriptor, collecting every field error.
    #[must_use]
    pub fn validate(&self, descriptor: &TransactionDescriptor) -> ValidationReport {
        let mut report = ValidationReport {
            errors: BTreeMap::new(),
        };

        self.check_amount(descriptor, &mut report);
        check_kind(descriptor, &mut report);
        report
    }

    fn check_amount(&self, descriptor: &TransactionDescriptor, report: &mut ValidationReport) {
        let amount = descriptor.amount;
        if amount <= Decimal::ZERO {
            report.push("amount", format!("Amount must be positive, got {amount}"));
            return;
        }

        let minimum = self.minimum_amount(descriptor.transaction_type());
        if amount < minimum {
            report.push(
                "amount",
                format!(
                    "Amount {amount} is below the {} minimum of {minimum}",
                    descriptor.transaction_type()
                ),
            );
        }
    }
}

impl Default for TransactionValidator {
    fn default() -> Self {
        Self::new(&LimitsConfig::default())
    }
}

fn check_kind(descriptor: &TransactionDescriptor, report: &mut ValidationReport) {
    match &descriptor.kind {
        TransactionKind::Transfer { recipient } => {
            if !is_valid_username(recipient) {
                report.push(
                    "recipient",
                    format!("Invalid recipient username: {recipient}"),
                );
            }
        }
        TransactionKind::Withdraw {
            method: PaymentMethod::ExternalWallet,
            destination,
        } => check_wallet_destination(descriptor, destination.as_deref(), report),
        TransactionKind::Buy { asset, .. } | TransactionKind::Sell { asset } => {
            if asset.symbol.trim().is_empty() {
                report.push("asset", "Asset symbol must not be empty");
            }
        }
        _ => {}
    }
}

/// Wallet withdrawals need both a destination and a chain, and the
/// destination must be well-formed for that chain.
fn check_wallet_destination(
    descriptor: &TransactionDescriptor,
    destination: Option<&str>,
    report: &mut ValidationReport,
) {
    let Some(destination) = destination else {
        report.push(
            "destination",
            "Wallet withdrawals require a destination address",
        );
        return;
    };
    let Some(chain) = descriptor.chain else {
        report.push("chain", "Wallet withdrawals require a settlement chain");
        return;
    };
    if !matches_chain(destination, chain) {
        report.push(
            "destination",
            format!("Destination is not a valid {chain} address"),
        );
    }
}
