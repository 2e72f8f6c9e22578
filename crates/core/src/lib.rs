//! Core transaction logic for Payflow.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, fee calculation, balance accounting,
//! validation rules, and the transaction flow state machine live here.
//!
//! # Modules
//!
//! - `transaction` - Transaction descriptors and routing plans
//! - `fees` - Fee rate tables, calculator, and memoization cache
//! - `balance` - Available/invested balance model and sufficiency checks
//! - `validation` - Input validation (minimums, recipients, assets)
//! - `flow` - Transaction flow state machine and failure recording
//! - `providers` - Collaborator interfaces and in-memory adapters

pub mod balance;
pub mod fees;
pub mod flow;
pub mod providers;
pub mod transaction;
pub mod validation;
