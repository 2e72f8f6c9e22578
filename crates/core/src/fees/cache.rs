//! Fee calculation service with memoization.
//!
//! Rate lookups are deterministic, so identical descriptors may reuse a
//! recent breakdown. Results are cached with a short TTL and the cache
//! is dropped wholesale whenever the rate tables are reloaded. Routing
//! plans are part of the cache key, so plans never share entries.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use moka::sync::Cache;
use rust_decimal::Decimal;

use payflow_shared::config::FlowConfig;
use payflow_shared::types::{Chain, PaymentMethod, TransactionType};

use super::calculator;
use super::error::FeeError;
use super::rates::FeeRateTables;
use super::types::FeeBreakdown;
use crate::transaction::{FundingSource, RoutingPlan, TransactionDescriptor};

/// Cache key: every input the calculator reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FeeCacheKey {
    ty: TransactionType,
    amount: Decimal,
    asset: Option<String>,
    chain: Option<Chain>,
    method: Option<PaymentMethod>,
    routing: Option<RoutingPlan>,
}

impl FeeCacheKey {
    fn new(descriptor: &TransactionDescriptor, routing: Option<&RoutingPlan>) -> Self {
        let method = match descriptor.kind.funding_source() {
            FundingSource::External(method) => Some(method),
            FundingSource::Balance => None,
        };
        Self {
            ty: descriptor.transaction_type(),
            amount: descriptor.amount,
            asset: descriptor.kind.asset().map(|a| a.symbol.clone()),
            chain: descriptor.settlement_chain(),
            method,
            routing: routing.copied(),
        }
    }
}

/// Fee calculation service: rate tables + memoization cache.
///
/// Thread-safe; cheap to share behind an `Arc`. The pure calculator
/// carries all branching logic, this service only adds caching and
/// table reload.
pub struct FeeService {
    tables: RwLock<Arc<FeeRateTables>>,
    cache: Cache<FeeCacheKey, FeeBreakdown>,
}

impl FeeService {
    /// Creates a service over the given rate tables with default cache
    /// tuning.
    #[must_use]
    pub fn new(tables: FeeRateTables) -> Self {
        Self::with_config(tables, &FlowConfig::default())
    }

    /// Creates a service with cache capacity and TTL from configuration.
    #[must_use]
    pub fn with_config(tables: FeeRateTables, config: &FlowConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.fee_cache_capacity)
            .time_to_live(Duration::from_secs(config.fee_cache_ttl_secs))
            .build();

        Self {
            tables: RwLock::new(Arc::new(tables)),
            cache,
        }
    }

    /// Calculates (or returns a memoized) fee breakdown.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::InvalidAmount`] for non-positive amounts;
    /// invalid amounts are never cached.
    pub fn calculate(
        &self,
        descriptor: &TransactionDescriptor,
        routing: Option<&RoutingPlan>,
    ) -> Result<FeeBreakdown, FeeError> {
        let key = FeeCacheKey::new(descriptor, routing);

        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let tables = Arc::clone(&self.tables.read().expect("fee tables lock poisoned"));
        let breakdown = calculator::calculate(&tables, descriptor, routing)?;
        self.cache.insert(key, breakdown.clone());
        Ok(breakdown)
    }

    /// Replaces the rate tables and invalidates every cached breakdown.
    pub fn reload(&self, tables: FeeRateTables) {
        *self.tables.write().expect("fee tables lock poisoned") = Arc::new(tables);
        self.cache.invalidate_all();
        // Invalidation is lazy; force it so stale entries cannot be
        // served between reload and the next maintenance cycle.
        self.cache.run_pending_tasks();
    }

    /// Number of memoized breakdowns (after pending maintenance).
    #[must_use]
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for FeeService {
    fn default() -> Self {
        Self::new(FeeRateTables::default())
    }
}
