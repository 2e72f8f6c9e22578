//! Common types used across the application.

pub mod chain;
pub mod id;
pub mod payment;
pub mod transaction;

pub use chain::Chain;
pub use id::*;
pub use payment::{Direction, PaymentMethod};
pub use transaction::TransactionType;
