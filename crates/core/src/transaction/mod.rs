//! Transaction descriptors and routing plans.
//!
//! A [`TransactionDescriptor`] carries everything the fee calculator,
//! validator, and flow state machine need to process one transaction.
//! The per-type payload is a closed tagged variant: each transaction
//! type declares exactly the fields it requires.

pub mod types;

pub use types::{
    Asset, FundingSource, RoutingPlan, TransactionDescriptor, TransactionKind,
};
