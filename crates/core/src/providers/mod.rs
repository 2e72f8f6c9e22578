//! Collaborator interfaces.
//!
//! The core never talks to payment rails, chains, or databases
//! directly. Everything external sits behind these traits: a real
//! adapter in production, a deterministic in-memory double in tests.

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use payflow_shared::types::{TransactionId, UserId};

use crate::balance::Balance;
use crate::fees::FeeBreakdown;
use crate::flow::record::TransactionRecord;
use crate::transaction::TransactionDescriptor;

pub use memory::{
    InMemoryStore, RejectingExecutionProvider, StaticBalanceSource, StubExecutionProvider,
};

/// Source of truth for a user's balance at first touch.
///
/// The balance model hydrates a user's shard from this source once,
/// then owns it; subsequent mutations are applied locally.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetches the current balance for a user. Unknown users resolve to
    /// a zero balance.
    async fn fetch(&self, user_id: UserId) -> Balance;
}

/// A descriptor enriched with everything execution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedDescriptor {
    /// The transaction id, used as the idempotency key downstream.
    pub transaction_id: TransactionId,
    /// The original descriptor.
    pub descriptor: TransactionDescriptor,
    /// The computed fee breakdown.
    pub fees: FeeBreakdown,
    /// `amount - fees.total` for inbound types; `None` for types where
    /// the full amount is the balance movement and fees are tracked
    /// separately.
    pub net_amount: Option<Decimal>,
}

/// Error returned by an execution provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Provider error: {0}")]
pub struct ProviderError(pub String);

/// Opaque receipt from a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    /// The provider's own transaction id, for correlation.
    pub provider_tx_id: String,
}

/// Executes transactions against external rails.
///
/// Black-box and possibly slow; the flow bounds every call with a
/// timeout. Once a submission has been sent there is no cancellation:
/// the transaction is tracked to resolution.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    /// Submits an enriched descriptor for execution.
    async fn submit(&self, submission: &EnrichedDescriptor)
        -> Result<ProviderReceipt, ProviderError>;
}

/// Persists transaction history.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts or replaces a record by id.
    async fn record(&self, record: TransactionRecord);

    /// All records for a user, ordered by timestamp.
    async fn transactions(&self, user_id: UserId) -> Vec<TransactionRecord>;
}
