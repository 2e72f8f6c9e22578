//! Application configuration management.
//!
//! Configuration layers `config/default` + `config/{RUN_MODE}` files with
//! `PAYFLOW__`-prefixed environment variables. Every section carries serde
//! defaults forming a complete built-in rate book, so the system runs with
//! no config file at all.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{Chain, Direction, PaymentMethod, TransactionType};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Fee-rate tables.
    #[serde(default)]
    pub fees: FeeConfig,
    /// Per-type minimum amounts.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Flow tuning (timeouts, caches, event buffers).
    #[serde(default)]
    pub flow: FlowConfig,
}

/// Fee-rate tables keyed by transaction type, chain, and instrument.
///
/// Rates are fractions of the transaction amount (0.01 = 1%). A key
/// missing from a table resolves to rate zero at lookup time (fail-open);
/// these defaults only define the entries that are meant to be nonzero.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    /// Floor for the platform fee, applied after the rate.
    #[serde(default = "default_min_platform_fee")]
    pub min_platform_fee: Decimal,
    /// Platform fee rate per transaction type.
    #[serde(default = "default_platform_rates")]
    pub platform: HashMap<TransactionType, Decimal>,
    /// Network fee rate per settlement chain.
    #[serde(default = "default_network_rates")]
    pub network: HashMap<Chain, Decimal>,
    /// Provider fee rate per direction and payment method.
    #[serde(default = "default_provider_rates")]
    pub provider: HashMap<Direction, HashMap<PaymentMethod, Decimal>>,
    /// Exchange fee rate per transaction type (internally funded only).
    #[serde(default = "default_exchange_rates")]
    pub exchange: HashMap<TransactionType, Decimal>,
    /// Protocol fee rate per transaction type (strategy operations only).
    #[serde(default = "default_protocol_rates")]
    pub protocol: HashMap<TransactionType, Decimal>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            min_platform_fee: default_min_platform_fee(),
            platform: default_platform_rates(),
            network: default_network_rates(),
            provider: default_provider_rates(),
            exchange: default_exchange_rates(),
            protocol: default_protocol_rates(),
        }
    }
}

fn default_min_platform_fee() -> Decimal {
    // 0.05
    Decimal::new(5, 2)
}

fn default_platform_rates() -> HashMap<TransactionType, Decimal> {
    // 0.09% on every transaction type.
    TransactionType::ALL
        .into_iter()
        .map(|ty| (ty, Decimal::new(9, 4)))
        .collect()
}

fn default_network_rates() -> HashMap<Chain, Decimal> {
    HashMap::from([
        (Chain::Bitcoin, Decimal::new(4, 4)),   // 0.0004
        (Chain::Ethereum, Decimal::new(25, 4)), // 0.0025
        (Chain::Solana, Decimal::new(1, 5)),    // 0.00001
        (Chain::Sui, Decimal::new(2, 5)),       // 0.00002
    ])
}

fn default_provider_rates() -> HashMap<Direction, HashMap<PaymentMethod, Decimal>> {
    let onramp = HashMap::from([
        (PaymentMethod::Card, Decimal::new(1, 2)),            // 0.01
        (PaymentMethod::BankTransfer, Decimal::new(5, 3)),    // 0.005
        (PaymentMethod::ExternalWallet, Decimal::new(1, 3)),  // 0.001
    ]);
    let offramp = HashMap::from([
        (PaymentMethod::Card, Decimal::new(15, 3)),           // 0.015
        (PaymentMethod::BankTransfer, Decimal::new(75, 4)),   // 0.0075
        (PaymentMethod::ExternalWallet, Decimal::new(1, 3)),  // 0.001
    ]);
    HashMap::from([(Direction::Onramp, onramp), (Direction::Offramp, offramp)])
}

fn default_exchange_rates() -> HashMap<TransactionType, Decimal> {
    HashMap::from([
        (TransactionType::Buy, Decimal::new(1, 2)),            // 0.01
        (TransactionType::Sell, Decimal::new(1, 2)),           // 0.01
        (TransactionType::Transfer, Decimal::new(5, 3)),       // 0.005
        (TransactionType::StrategyStart, Decimal::new(25, 4)), // 0.0025
        (TransactionType::StrategyStop, Decimal::new(25, 4)),  // 0.0025
    ])
}

fn default_protocol_rates() -> HashMap<TransactionType, Decimal> {
    HashMap::from([
        (TransactionType::StrategyStart, Decimal::new(5, 3)), // 0.005
        (TransactionType::StrategyStop, Decimal::new(5, 3)),  // 0.005
    ])
}

/// Per-type minimum transaction amounts.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Minimum amount per transaction type.
    #[serde(default = "default_minimum_amounts")]
    pub minimum_amounts: HashMap<TransactionType, Decimal>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            minimum_amounts: default_minimum_amounts(),
        }
    }
}

fn default_minimum_amounts() -> HashMap<TransactionType, Decimal> {
    HashMap::from([
        (TransactionType::Deposit, Decimal::new(500, 2)),        // 5.00
        (TransactionType::Withdraw, Decimal::new(500, 2)),       // 5.00
        (TransactionType::Transfer, Decimal::new(100, 2)),       // 1.00
        (TransactionType::Buy, Decimal::new(100, 2)),            // 1.00
        (TransactionType::Sell, Decimal::new(100, 2)),           // 1.00
        (TransactionType::StrategyStart, Decimal::new(2500, 2)), // 25.00
        (TransactionType::StrategyStop, Decimal::new(100, 2)),   // 1.00
    ])
}

/// Flow tuning parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// Bound on a single execution-provider submission, in seconds.
    #[serde(default = "default_submission_timeout")]
    pub submission_timeout_secs: u64,
    /// Time-to-live for memoized fee breakdowns, in seconds.
    #[serde(default = "default_fee_cache_ttl")]
    pub fee_cache_ttl_secs: u64,
    /// Maximum number of memoized fee breakdowns.
    #[serde(default = "default_fee_cache_capacity")]
    pub fee_cache_capacity: u64,
    /// Buffered capacity of the flow event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            submission_timeout_secs: default_submission_timeout(),
            fee_cache_ttl_secs: default_fee_cache_ttl(),
            fee_cache_capacity: default_fee_cache_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_submission_timeout() -> u64 {
    30
}

fn default_fee_cache_ttl() -> u64 {
    45 // within the 30-60s band; rate lookups are deterministic
}

fn default_fee_cache_capacity() -> u64 {
    1024
}

fn default_event_capacity() -> usize {
    256
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAYFLOW").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
