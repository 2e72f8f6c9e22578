//! Settlement chain classification.

use serde::{Deserialize, Serialize};

/// Settlement chains supported by the system.
///
/// The chain determines both the network-fee rate and the external
/// address format accepted for withdrawals to that chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    /// Bitcoin (legacy Base58 and segwit bech32 addresses).
    Bitcoin,
    /// Ethereum and EVM-compatible networks (0x-prefixed 40-hex addresses).
    Ethereum,
    /// Solana (Base58 addresses).
    Solana,
    /// Sui (0x-prefixed 64-hex addresses).
    Sui,
}

impl Chain {
    /// All supported chains, for table construction and tests.
    pub const ALL: [Self; 4] = [Self::Bitcoin, Self::Ethereum, Self::Solana, Self::Sui];

    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
            Self::Sui => "sui",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
