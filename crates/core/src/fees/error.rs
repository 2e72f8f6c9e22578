//! Fee calculation error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during fee calculation.
///
/// Missing rate-table entries are deliberately NOT errors: they degrade
/// to a zero rate with a warning (fail-open), because an unknown
/// configuration key must never block a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// Transaction amount must be strictly positive.
    #[error("Transaction amount must be positive, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },
}

impl FeeError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
        }
    }
}
