//! Persisted transaction records.
//!
//! A record is created for every attempt, including attempts that abort
//! before execution: transaction history must be complete even for
//! failed flows. The only persisted-layout concern in the system is
//! this type's serde shape.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use payflow_shared::types::{Chain, PaymentMethod, TransactionId, TransactionType, UserId};

use crate::transaction::{TransactionDescriptor, TransactionKind};

/// Status of a persisted transaction record.
///
/// Transitions are monotonic: `Pending` may become `Completed` or
/// `Failed`; terminal statuses never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Submitted, awaiting external confirmation.
    Pending,
    /// Settled; the balance mutation has been applied.
    Completed,
    /// Aborted or rejected at some step.
    Failed,
}

impl RecordStatus {
    /// Returns true if the status can still change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The step a failed flow aborted at, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStep {
    /// Input validation rejected the descriptor.
    Validation,
    /// The sufficiency check failed.
    BalanceCheck,
    /// Fee calculation failed.
    FeeCalculation,
    /// The execution provider rejected or timed out.
    Submission,
    /// Settlement could not apply the balance mutation.
    Settlement,
}

impl FailureStep {
    /// Stable snake_case tag, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::BalanceCheck => "balance_check",
            Self::FeeCalculation => "fee_calculation",
            Self::Submission => "submission",
            Self::Settlement => "settlement",
        }
    }
}

impl std::fmt::Display for FailureStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction id (also the idempotency key).
    pub id: TransactionId,
    /// The user who initiated the transaction.
    pub user_id: UserId,
    /// Flat transaction type.
    pub transaction_type: TransactionType,
    /// Requested amount.
    pub amount: Decimal,
    /// Denominating currency code.
    pub currency: String,
    /// Traded asset symbol, for trade types.
    pub asset: Option<String>,
    /// Recipient username or destination address, when present.
    pub recipient: Option<String>,
    /// External payment instrument, when one funds the transaction.
    pub payment_method: Option<PaymentMethod>,
    /// Settlement chain, when resolved.
    pub chain: Option<Chain>,
    /// Creation time of the record.
    pub timestamp: DateTime<Utc>,
    /// Current status.
    pub status: RecordStatus,
    /// Error message for failed records.
    pub error: Option<String>,
    /// The step a failed flow aborted at.
    pub failed_at_step: Option<FailureStep>,
    /// Human-readable description of the attempt.
    pub description: String,
}

impl TransactionRecord {
    /// Builds a pending record from a descriptor.
    #[must_use]
    pub fn pending(id: TransactionId, descriptor: &TransactionDescriptor) -> Self {
        let ty = descriptor.transaction_type();
        let (recipient, payment_method) = recipient_and_method(&descriptor.kind);
        Self {
            id,
            user_id: descriptor.user_id,
            transaction_type: ty,
            amount: descriptor.amount,
            currency: "USD".to_string(),
            asset: descriptor.kind.asset().map(|a| a.symbol.clone()),
            recipient,
            payment_method,
            chain: descriptor.settlement_chain(),
            timestamp: Utc::now(),
            status: RecordStatus::Pending,
            error: None,
            failed_at_step: None,
            description: describe(ty, descriptor),
        }
    }

    /// Builds a failed record from a descriptor, an error message, and
    /// the step the flow aborted at.
    #[must_use]
    pub fn failed(
        id: TransactionId,
        descriptor: &TransactionDescriptor,
        step: FailureStep,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let mut record = Self::pending(id, descriptor);
        record.description = format!("{} (failed at {step}: {error})", record.description);
        record.status = RecordStatus::Failed;
        record.error = Some(error);
        record.failed_at_step = Some(step);
        record
    }

    /// Marks this record completed. Terminal failed records stay failed.
    pub fn complete(&mut self) {
        if self.status == RecordStatus::Pending {
            self.status = RecordStatus::Completed;
        }
    }
}

fn recipient_and_method(kind: &TransactionKind) -> (Option<String>, Option<PaymentMethod>) {
    match kind {
        TransactionKind::Deposit { method } => (None, Some(*method)),
        TransactionKind::Withdraw {
            method,
            destination,
        } => (destination.clone(), Some(*method)),
        TransactionKind::Transfer { recipient } => (Some(recipient.clone()), None),
        TransactionKind::Buy { funding, .. } | TransactionKind::StrategyStart { funding, .. } => {
            match funding {
                crate::transaction::FundingSource::External(method) => (None, Some(*method)),
                crate::transaction::FundingSource::Balance => (None, None),
            }
        }
        TransactionKind::Sell { .. } | TransactionKind::StrategyStop { .. } => (None, None),
    }
}

fn describe(ty: TransactionType, descriptor: &TransactionDescriptor) -> String {
    match descriptor.memo.as_deref() {
        Some(memo) => format!("{ty} of {} - {memo}", descriptor.amount),
        None => format!("{ty} of {}", descriptor.amount),
    }
}
