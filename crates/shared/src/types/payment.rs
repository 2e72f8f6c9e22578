//! Payment instrument and fee direction classifications.

use serde::{Deserialize, Serialize};

/// External payment instruments.
///
/// Provider fees are keyed by `(direction, payment method)`. Transactions
/// funded from the platform's own custodial balance carry no payment
/// method and pay an exchange fee instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Bank transfer (ACH/SEPA-style rails).
    BankTransfer,
    /// Self-custodied external wallet of record.
    ExternalWallet,
}

impl PaymentMethod {
    /// All payment methods, for table construction and tests.
    pub const ALL: [Self; 3] = [Self::Card, Self::BankTransfer, Self::ExternalWallet];

    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
            Self::ExternalWallet => "external_wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of money flow relative to the platform, for provider fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money entering the platform (deposits, externally funded buys).
    Onramp,
    /// Money leaving the platform (withdrawals).
    Offramp,
}

impl Direction {
    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onramp => "onramp",
            Self::Offramp => "offramp",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_as_str_matches_serde() {
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Onramp.to_string(), "onramp");
        assert_eq!(Direction::Offramp.to_string(), "offramp");
    }
}
