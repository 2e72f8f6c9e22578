//! Shared types, errors, and configuration for Payflow.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Transaction, chain, and payment-instrument classifications
//! - Fee-rate and flow configuration management
//! - Application-wide error types

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
