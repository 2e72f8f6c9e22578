//! Flow error types.

use std::collections::BTreeMap;

use thiserror::Error;

use payflow_shared::error::AppError;

use super::state::FlowState;
use crate::balance::BalanceError;
use crate::fees::FeeError;

/// Errors a transaction flow can fail with.
///
/// Each variant that aborts a persisted attempt maps to exactly one
/// [`super::record::FailureStep`] tag on the failed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Input validation rejected the descriptor.
    #[error("Validation failed: {}", format_fields(.field_errors))]
    Validation {
        /// Field name to error message.
        field_errors: BTreeMap<String, String>,
    },

    /// The sufficiency check or settlement mutation failed.
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// Fee calculation failed.
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// The execution provider rejected the submission.
    #[error("Submission failed: {provider_error}")]
    Submission {
        /// The provider's error message.
        provider_error: String,
    },

    /// The execution provider did not answer within the timeout.
    #[error("Submission timed out after {timeout_secs}s")]
    SubmissionTimeout {
        /// The configured bound that was exceeded.
        timeout_secs: u64,
    },

    /// Cancellation requested after the point of no return.
    #[error("Cannot cancel: transaction is already {state}")]
    NotCancellable {
        /// The state the flow was in.
        state: FlowState,
    },

    /// An operation was called in the wrong state.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: FlowState,
        /// Requested state.
        to: FlowState,
    },
}

impl FlowError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Balance(err) => err.error_code(),
            Self::Fee(err) => err.error_code(),
            Self::Submission { .. } => "SUBMISSION_FAILED",
            Self::SubmissionTimeout { .. } => "SUBMISSION_TIMEOUT",
            Self::NotCancellable { .. } => "NOT_CANCELLABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}

fn format_fields(field_errors: &BTreeMap<String, String>) -> String {
    field_errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        let message = err.to_string();
        match err {
            FlowError::Validation { .. } | FlowError::Fee(_) => Self::Validation(message),
            FlowError::Balance(BalanceError::DuplicateTransaction(_)) => Self::Conflict(message),
            FlowError::Balance(_) | FlowError::NotCancellable { .. } => {
                Self::BusinessRule(message)
            }
            FlowError::Submission { .. } | FlowError::SubmissionTimeout { .. } => {
                Self::ExternalService(message)
            }
            FlowError::InvalidTransition { .. } => Self::Internal(message),
        }
    }
}
