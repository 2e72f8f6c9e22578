//! Fee rate tables, calculator, and memoization cache.
//!
//! Four fee components apply per transaction:
//! - platform fee: base service fee, charged on every transaction
//! - network fee: settlement chain processing cost
//! - provider fee XOR exchange fee: external instrument cost vs.
//!   internal conversion cost (exactly one per transaction)
//! - protocol fee: yield-strategy protocol interaction cost
//!
//! Rate lookups are fail-open: a missing table key resolves to rate zero
//! with a warning, never blocking a transaction. The platform-fee
//! minimum is the one capital-safety floor that always applies.

pub mod cache;
pub mod calculator;
pub mod error;
pub mod rates;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use cache::FeeService;
pub use calculator::calculate;
pub use error::FeeError;
pub use rates::FeeRateTables;
pub use types::{AppliedRates, FeeBreakdown, FeeBreakdownWire};
