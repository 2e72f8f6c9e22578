//! Available/invested balance model.
//!
//! Separates the liquid "available" balance from the "invested" balance
//! and per-strategy buckets. The sufficiency rule is type-specific, and
//! the check is re-evaluated atomically at mutation time under a
//! per-user lock, so two concurrent transactions cannot both spend the
//! same funds.

pub mod error;
pub mod model;
pub mod sufficiency;
pub mod types;

#[cfg(test)]
mod model_props;

pub use error::BalanceError;
pub use model::BalanceModel;
pub use sufficiency::evaluate;
pub use types::{Balance, SufficiencyCheck};
