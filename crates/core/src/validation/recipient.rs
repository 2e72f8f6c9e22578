//! Recipient and destination-address format checks.
//!
//! Shape checks only: charset and length per address family. No
//! checksum verification and no on-chain existence lookups; those
//! belong to the execution provider.

use payflow_shared::types::Chain;

/// The address families a destination string can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// Peer username: 3 to 20 chars of lowercase alphanumerics and
    /// underscores.
    Username,
    /// Bitcoin legacy (Base58, `1`/`3` prefix) or segwit (`bc1` bech32).
    Bitcoin,
    /// EVM address: `0x` plus 40 hex digits.
    Evm,
    /// Solana address: 32 to 44 Base58 chars.
    Solana,
    /// Sui address: `0x` plus 64 hex digits.
    Sui,
}

/// Returns true for valid peer usernames.
#[must_use]
pub fn is_valid_username(value: &str) -> bool {
    (3..=20).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Base58 alphabet check (Bitcoin variant: no `0`, `O`, `I`, `l`).
fn is_base58(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() && !matches!(b, b'0' | b'O' | b'I' | b'l')
        })
}

/// Bech32 data charset (lowercase, excluding `1`, `b`, `i`, `o`).
fn is_bech32_data(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            (b.is_ascii_lowercase() || b.is_ascii_digit()) && !matches!(b, b'1' | b'b' | b'i' | b'o')
        })
}

fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_bitcoin_address(value: &str) -> bool {
    let legacy = (26..=35).contains(&value.len())
        && (value.starts_with('1') || value.starts_with('3'))
        && is_base58(value);
    let segwit = value
        .strip_prefix("bc1")
        .is_some_and(|data| (39..=87).contains(&value.len()) && is_bech32_data(data));
    legacy || segwit
}

fn is_evm_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && is_hex(hex))
}

fn is_solana_address(value: &str) -> bool {
    (32..=44).contains(&value.len()) && is_base58(value)
}

fn is_sui_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && is_hex(hex))
}

impl AddressFormat {
    /// Checks whether `value` matches this format.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Username => is_valid_username(value),
            Self::Bitcoin => is_bitcoin_address(value),
            Self::Evm => is_evm_address(value),
            Self::Solana => is_solana_address(value),
            Self::Sui => is_sui_address(value),
        }
    }

    /// The format expected for addresses on a given chain.
    #[must_use]
    pub fn for_chain(chain: Chain) -> Self {
        match chain {
            Chain::Bitcoin => Self::Bitcoin,
            Chain::Ethereum => Self::Evm,
            Chain::Solana => Self::Solana,
            Chain::Sui => Self::Sui,
        }
    }
}

/// Returns true when `address` is well-formed for `chain`.
#[must_use]
pub fn matches_chain(address: &str, chain: Chain) -> bool {
    AddressFormat::for_chain(chain).matches(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice_01", true)]
    #[case("bob", true)]
    #[case("ab", false)] // too short
    #[case("a_very_long_username_x", false)] // too long
    #[case("Alice", false)] // uppercase
    #[case("bob-42", false)] // hyphen
    fn test_username_format(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_valid_username(value), valid);
    }

    #[rstest]
    #[case("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", true)] // legacy P2PKH
    #[case("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", true)] // legacy P2SH
    #[case("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", true)] // segwit
    #[case("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNO", false)] // 'O' not Base58
    #[case("2A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", false)] // bad prefix
    #[case("bc1", false)] // no data part
    fn test_bitcoin_format(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(matches_chain(value, Chain::Bitcoin), valid);
    }

    #[rstest]
    #[case("0x742d35Cc6634C0532925a3b844Bc454e4438f44e", true)]
    #[case("0x742d35Cc6634C0532925a3b844Bc454e4438f44", false)] // 39 digits
    #[case("742d35Cc6634C0532925a3b844Bc454e4438f44e", false)] // no 0x
    #[case("0x742d35Cc6634C0532925a3b844Bc454e4438f44g", false)] // non-hex
    fn test_evm_format(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(matches_chain(value, Chain::Ethereum), valid);
    }

    #[rstest]
    #[case("4Nd1mYvL6Q6sWkzFhAyXy65cDhjMQNvHBXZo1CnhqnAq", true)]
    #[case("4Nd1mYvL6Q", false)] // too short
    #[case("4Nd1mYvL6Q6sWkzFhAyXy65cDhjMQNvHBXZo1Cnhqn0q", false)] // '0'
    fn test_solana_format(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(matches_chain(value, Chain::Solana), valid);
    }

    #[test]
    fn test_sui_format_is_64_hex_digits() {
        let valid = format!("0x{}", "a1".repeat(32));
        assert!(matches_chain(&valid, Chain::Sui));
        // EVM-length hex is not a Sui address.
        assert!(!matches_chain(
            "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            Chain::Sui
        ));
    }
}
