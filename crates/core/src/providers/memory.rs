//! In-memory collaborator implementations.
//!
//! Deterministic doubles for unit tests, also usable as local-run
//! adapters. No randomized latency or failure: a provider either
//! accepts everything or rejects everything, and tests choose which.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use payflow_shared::types::{TransactionId, UserId};

use super::{
    BalanceSource, EnrichedDescriptor, ExecutionProvider, ProviderError, ProviderReceipt,
    TransactionStore,
};
use crate::balance::Balance;
use crate::flow::record::TransactionRecord;

/// Balance source backed by a fixed map. Unknown users get zero.
#[derive(Debug, Default)]
pub struct StaticBalanceSource {
    balances: DashMap<UserId, Balance>,
}

impl StaticBalanceSource {
    /// Creates an empty source (every user starts at zero).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the balance returned for a user.
    pub fn set(&self, user_id: UserId, balance: Balance) {
        self.balances.insert(user_id, balance);
    }
}

#[async_trait]
impl BalanceSource for StaticBalanceSource {
    async fn fetch(&self, user_id: UserId) -> Balance {
        self.balances
            .get(&user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

/// Execution provider that accepts every submission with sequential
/// receipt ids (`prov-1`, `prov-2`, ...).
#[derive(Debug, Default)]
pub struct StubExecutionProvider {
    submissions: AtomicU64,
}

impl StubExecutionProvider {
    /// Creates a provider with the counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submissions accepted so far.
    #[must_use]
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionProvider for StubExecutionProvider {
    async fn submit(
        &self,
        _submission: &EnrichedDescriptor,
    ) -> Result<ProviderReceipt, ProviderError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderReceipt {
            provider_tx_id: format!("prov-{n}"),
        })
    }
}

/// Execution provider that rejects every submission with a fixed
/// message.
#[derive(Debug)]
pub struct RejectingExecutionProvider {
    message: String,
}

impl RejectingExecutionProvider {
    /// Creates a provider that rejects with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ExecutionProvider for RejectingExecutionProvider {
    async fn submit(
        &self,
        _submission: &EnrichedDescriptor,
    ) -> Result<ProviderReceipt, ProviderError> {
        Err(ProviderError(self.message.clone()))
    }
}

/// Transaction store backed by a vector, upserting by id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<TransactionRecord>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a single record by id.
    pub async fn find(&self, id: TransactionId) -> Option<TransactionRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn record(&self, record: TransactionRecord) {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    async fn transactions(&self, user_id: UserId) -> Vec<TransactionRecord> {
        let mut matching: Vec<_> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.timestamp);
        matching
    }
}
