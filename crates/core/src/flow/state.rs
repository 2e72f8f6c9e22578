//! Flow states and the transition table.

use serde::{Deserialize, Serialize};

/// The states a transaction flow moves through.
///
/// Happy path: `Idle` through `Completed` in declaration order. `Error`
/// is reachable from every non-terminal state and is terminal, as is
/// `Completed`; a finished flow is never reused, callers start a fresh
/// one per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Nothing in progress.
    Idle,
    /// Running input validation.
    Validating,
    /// Computing fees and the confirmation snapshot.
    Calculating,
    /// Awaiting the caller's confirm or cancel.
    Confirming,
    /// Submitting to the execution provider.
    Processing,
    /// Submitted, awaiting external confirmation.
    PendingExternalConfirmation,
    /// Settled.
    Completed,
    /// Aborted or rejected.
    Error,
}

impl FlowState {
    /// Returns true for states that end the flow.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether a transition from `self` to `next` is legal.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if next == Self::Error {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Validating, Self::Calculating)
                | (Self::Calculating, Self::Confirming)
                | (Self::Confirming, Self::Processing)
                | (Self::Confirming, Self::Idle)
                | (Self::Processing, Self::PendingExternalConfirmation)
                | (Self::PendingExternalConfirmation, Self::Completed)
        )
    }

    /// Stable snake_case tag, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Calculating => "calculating",
            Self::Confirming => "confirming",
            Self::Processing => "processing",
            Self::PendingExternalConfirmation => "pending_external_confirmation",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
