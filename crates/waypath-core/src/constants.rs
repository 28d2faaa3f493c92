//! Protocol and policy constants. All values in satoshis unless noted.

use serde::{Deserialize, Serialize};

pub const COIN: u64 = 100_000_000;

/// Default minimum value for a spendable output.
pub const DEFAULT_DUST_THRESHOLD: u64 = 2_730;

/// Largest OP_RETURN payload relayed under standard policy.
pub const MAX_STANDARD_OP_RETURN: usize = 79;

/// Worst-case DER signature plus its sighash byte.
pub const MAX_DER_SIGNATURE_SIZE: usize = 72;

/// Serialized SEC1 compressed public key.
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

/// Largest number of addresses the data source accepts in one request.
pub const MAX_BATCH_ADDRESSES: usize = 500;

/// BIP44 purpose level.
pub const BIP44_PURPOSE: u32 = 44;

/// First hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Networks the wallet core can build transactions for.
///
/// Controls the BIP44 coin type and whether segregated witness spends are
/// available.
///
/// # Examples
///
/// ```
/// use waypath_core::constants::Network;
/// assert_eq!(Network::default(), Network::Bitcoin);
/// assert_eq!(Network::BitcoinCash.coin_type(), 145);
/// assert!(!Network::BitcoinCash.supports_segwit());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
    Regtest,
    BitcoinCash,
    BitcoinCashTestnet,
}

impl Network {
    /// SLIP-44 coin type used at the second BIP44 level.
    pub fn coin_type(&self) -> u32 {
        match self {
            Self::Bitcoin => 0,
            Self::Testnet | Self::Regtest | Self::BitcoinCashTestnet => 1,
            Self::BitcoinCash => 145,
        }
    }

    pub fn supports_segwit(&self) -> bool {
        matches!(self, Self::Bitcoin | Self::Testnet | Self::Regtest)
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet | Self::Regtest | Self::BitcoinCashTestnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_types() {
        assert_eq!(Network::Bitcoin.coin_type(), 0);
        assert_eq!(Network::Testnet.coin_type(), 1);
        assert_eq!(Network::BitcoinCashTestnet.coin_type(), 1);
        assert_eq!(Network::BitcoinCash.coin_type(), 145);
    }

    #[test]
    fn segwit_support() {
        assert!(Network::Bitcoin.supports_segwit());
        assert!(Network::Regtest.supports_segwit());
        assert!(!Network::BitcoinCash.supports_segwit());
        assert!(!Network::BitcoinCashTestnet.supports_segwit());
    }

    #[test]
    fn network_serde_snake_case() {
        let json = serde_json::to_string(&Network::BitcoinCashTestnet).unwrap();
        assert_eq!(json, "\"bitcoin_cash_testnet\"");
        let back: Network = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(back, Network::Testnet);
    }

    #[test]
    fn hardened_offset_is_bit_31() {
        assert_eq!(HARDENED_OFFSET, 1 << 31);
    }
}
