//! Balance error types.

use rust_decimal::Decimal;
use thiserror::Error;

use payflow_shared::types::TransactionId;

/// Errors that can occur when mutating a balance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    /// The relevant balance pool cannot cover the transaction.
    #[error("Insufficient balance: required {required}, available {available}")]
    Insufficient {
        /// Amount the rule requires (may include fees).
        required: Decimal,
        /// The pool the rule consulted.
        available: Decimal,
        /// `max(0, amount - available)`.
        deficit: Decimal,
    },

    /// This transaction id has already mutated the balance.
    ///
    /// Client retries are rejected, never re-applied: a duplicate id
    /// must not debit or credit twice.
    #[error("Transaction {0} has already been applied")]
    DuplicateTransaction(TransactionId),
}

impl BalanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Insufficient { .. } => "INSUFFICIENT_BALANCE",
            Self::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
        }
    }
}
