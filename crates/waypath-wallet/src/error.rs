//! Wallet error types.

use thiserror::Error;

use waypath_core::constants::Network;
use waypath_core::error::{CodecError, EstimateError, PathError, SourceError};
use waypath_core::types::UnknownFeeStrategy;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Insufficient funds to cover the outputs plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Total value of every available UTXO in satoshis.
        have: u64,
        /// Outputs plus the fee of spending them all.
        need: u64,
    },

    /// No UTXOs available for spending.
    #[error("no UTXOs available")]
    NoUtxos,

    /// Selection reached the input cap before balancing.
    #[error("selection exceeded {0} inputs")]
    SelectionLimit(usize),

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Output value below the dust threshold.
    #[error("output of {value} is below the dust threshold of {threshold}")]
    DustOutput { value: u64, threshold: u64 },

    /// OP_RETURN payload too large without the non-standard opt-in.
    #[error("OP_RETURN payload of {size} bytes exceeds {max}")]
    NonStandardOpReturn { size: usize, max: usize },

    /// Fee strategy name outside the known set.
    #[error("unknown fee strategy: {0}")]
    UnknownFeeStrategy(String),

    /// Change is required but no change address was set.
    #[error("change address required")]
    MissingChangeAddress,

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Key derivation failure.
    #[error("key derivation: {0}")]
    KeyDerivation(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Invalid or unreadable configuration.
    #[error("config: {0}")]
    Config(String),

    /// Witness address requested on a network without segwit.
    #[error("segwit is not supported on {0:?}")]
    SegwitUnsupported(Network),

    /// Transaction build error.
    #[error("build error: {0}")]
    BuildError(String),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    /// Blockchain data source failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<UnknownFeeStrategy> for WalletError {
    fn from(e: UnknownFeeStrategy) -> Self {
        Self::UnknownFeeStrategy(e.0)
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        Self::KeyDerivation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypath_core::types::FeeStrategy;

    #[test]
    fn display_insufficient_funds() {
        let e = WalletError::InsufficientFunds {
            have: 100,
            need: 200,
        };
        assert_eq!(e.to_string(), "insufficient funds: have 100, need 200");
    }

    #[test]
    fn display_dust() {
        let e = WalletError::DustOutput {
            value: 500,
            threshold: 2730,
        };
        assert_eq!(
            e.to_string(),
            "output of 500 is below the dust threshold of 2730"
        );
    }

    #[test]
    fn clone_and_eq() {
        let e1 = WalletError::InvalidAmount("zero".into());
        let e2 = e1.clone();
        assert_eq!(e1, e2);
    }

    #[test]
    fn from_unknown_fee_strategy() {
        let err = "fastest".parse::<FeeStrategy>().unwrap_err();
        let wallet: WalletError = err.into();
        assert_eq!(wallet, WalletError::UnknownFeeStrategy("fastest".into()));
        assert_eq!(wallet.to_string(), "unknown fee strategy: fastest");
    }

    #[test]
    fn from_source_error_is_transparent() {
        let wallet: WalletError = SourceError::Timeout.into();
        assert_eq!(wallet.to_string(), "request timed out");
        assert_eq!(wallet, WalletError::Source(SourceError::Timeout));
    }

    #[test]
    fn from_path_error() {
        let wallet: WalletError = PathError::NoLevels.into();
        assert_eq!(wallet, WalletError::Path(PathError::NoLevels));
    }
}
