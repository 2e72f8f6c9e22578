//! Pre-flight input validation.
//!
//! Collects every problem with a descriptor into one report instead of
//! stopping at the first, so callers can surface the full field-level
//! error map in a single round trip.

pub mod recipient;
pub mod service;

pub use recipient::{matches_chain, AddressFormat};
pub use service::{TransactionValidator, ValidationReport};
