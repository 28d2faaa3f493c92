//! Trait interfaces for the Waypath wallet core.
//!
//! These traits define the seams to the outside world:
//! - [`UtxoSource`] — paginated unspent-output listings (a blockchain API implements)
//! - [`FeeRateSource`] — per-kilobyte fee rates by strategy
//! - [`ScriptCodec`] — address strings to and from output scripts, per network

use crate::constants::Network;
use crate::error::{CodecError, SourceError};
use crate::script::{ScriptType, classify_script};
use crate::types::{FeeStrategy, Page, UnspentOutput};

/// Read-only access to unspent outputs held by addresses.
///
/// Pages are 1-based. Implementations report transient failures (rate limits,
/// dropped connections, timeouts) through [`SourceError::is_transient`] so
/// callers can decide whether to retry.
pub trait UtxoSource: Send + Sync {
    /// Unspent outputs of a batch of addresses, one page at a time.
    fn batch_unspent_outputs(
        &self,
        addresses: &[String],
        page: usize,
        per_page: usize,
    ) -> Result<Page<UnspentOutput>, SourceError>;

    /// Unspent outputs of a single address.
    ///
    /// Default implementation delegates to
    /// [`batch_unspent_outputs`](Self::batch_unspent_outputs).
    fn unspent_outputs(
        &self,
        address: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<UnspentOutput>, SourceError> {
        self.batch_unspent_outputs(&[address.to_string()], page, per_page)
    }
}

/// Fee rates in satoshis per 1000 bytes.
pub trait FeeRateSource: Send + Sync {
    fn fee_per_kb(&self, strategy: FeeStrategy) -> Result<u64, SourceError>;
}

/// Conversion between addresses and output scripts for one network.
pub trait ScriptCodec: Send + Sync {
    fn network(&self) -> Network;

    /// Output script paying to `address`.
    fn script_for_address(&self, address: &str) -> Result<Vec<u8>, CodecError>;

    /// Address form of `script`, if it has one.
    fn address_for_script(&self, script: &[u8]) -> Result<String, CodecError>;

    /// Whether `address` pays to a native witness program.
    fn is_witness(&self, address: &str) -> Result<bool, CodecError> {
        Ok(classify_script(&self.script_for_address(address)?).is_witness())
    }

    fn is_p2sh(&self, address: &str) -> Result<bool, CodecError> {
        Ok(classify_script(&self.script_for_address(address)?) == ScriptType::P2sh)
    }
}
