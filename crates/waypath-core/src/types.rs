//! Core wallet types: outpoints, UTXOs, outputs, fee strategies.
//!
//! All monetary values are in satoshis (1 BTC = 10^8 satoshis).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::path::DerivationPath;

/// A 32-byte transaction id, kept in display (big-endian hex) order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Txid,
    pub index: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// Which wrapping a UTXO's spending condition uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpendShape {
    /// The output script is spent directly.
    Bare,
    /// Redeem script, no witness script.
    P2sh,
    /// Witness script, no redeem script.
    P2wsh,
    /// Redeem script wrapping a witness script.
    P2shP2wsh,
}

/// An unspent output the wallet may spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// Value in satoshis.
    pub value: u64,
    pub address: Option<String>,
    pub script_pubkey: Vec<u8>,
    /// Key position that can sign for this output.
    pub path: Option<DerivationPath>,
    pub redeem_script: Option<Vec<u8>>,
    pub witness_script: Option<Vec<u8>>,
}

impl Utxo {
    /// A bare UTXO with no address, path, or wrapping scripts.
    pub fn new(outpoint: OutPoint, value: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            outpoint,
            value,
            address: None,
            script_pubkey,
            path: None,
            redeem_script: None,
            witness_script: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_path(mut self, path: DerivationPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_redeem_script(mut self, script: Vec<u8>) -> Self {
        self.redeem_script = Some(script);
        self
    }

    pub fn with_witness_script(mut self, script: Vec<u8>) -> Self {
        self.witness_script = Some(script);
        self
    }

    pub fn shape(&self) -> SpendShape {
        match (&self.redeem_script, &self.witness_script) {
            (None, None) => SpendShape::Bare,
            (Some(_), None) => SpendShape::P2sh,
            (None, Some(_)) => SpendShape::P2wsh,
            (Some(_), Some(_)) => SpendShape::P2shP2wsh,
        }
    }
}

/// A transaction output being created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: u64,
    #[serde(with = "hex")]
    pub script_pubkey: Vec<u8>,
}

/// Fee policy chosen once per transaction build.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeeStrategy {
    /// Flat rate charged per started kilobyte.
    BaseFee,
    /// Rate the fee source expects to confirm promptly.
    #[default]
    Optimal,
    /// Cheaper rate accepting slower confirmation.
    LowPriority,
}

impl FeeStrategy {
    pub const ALL: [FeeStrategy; 3] = [Self::BaseFee, Self::Optimal, Self::LowPriority];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseFee => "base_fee",
            Self::Optimal => "optimal",
            Self::LowPriority => "low_priority",
        }
    }
}

impl fmt::Display for FeeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a fee strategy name outside the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeeStrategy(pub String);

impl fmt::Display for UnknownFeeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown fee strategy: {}", self.0)
    }
}

impl std::error::Error for UnknownFeeStrategy {}

impl FromStr for FeeStrategy {
    type Err = UnknownFeeStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| UnknownFeeStrategy(s.to_string()))
    }
}

/// One unspent output as reported by a blockchain data source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub address: String,
    /// Transaction id, hex.
    pub hash: String,
    pub index: u32,
    pub value: u64,
    /// Output script, hex.
    pub script_hex: String,
}

/// One page of a paginated data-source listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// 1-based page number.
    pub current_page: usize,
    pub per_page: usize,
    /// Total items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    pub fn has_more(&self) -> bool {
        !self.data.is_empty() && self.current_page.saturating_mul(self.per_page) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outpoint(fill: u8, index: u32) -> OutPoint {
        OutPoint {
            txid: Txid([fill; 32]),
            index,
        }
    }

    #[test]
    fn txid_hex_roundtrip() {
        let txid = Txid([0xab; 32]);
        let s = txid.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(s.parse::<Txid>().unwrap(), txid);
        assert!("abcd".parse::<Txid>().is_err());
    }

    #[test]
    fn outpoint_display() {
        let op = outpoint(0, 3);
        assert!(op.to_string().ends_with(":3"));
    }

    #[test]
    fn utxo_shapes() {
        let base = Utxo::new(outpoint(1, 0), 1_000, vec![]);
        assert_eq!(base.shape(), SpendShape::Bare);
        assert_eq!(base.clone().with_redeem_script(vec![1]).shape(), SpendShape::P2sh);
        assert_eq!(base.clone().with_witness_script(vec![1]).shape(), SpendShape::P2wsh);
        assert_eq!(
            base.with_redeem_script(vec![1]).with_witness_script(vec![2]).shape(),
            SpendShape::P2shP2wsh
        );
    }

    #[test]
    fn fee_strategy_names() {
        assert_eq!(FeeStrategy::default(), FeeStrategy::Optimal);
        assert_eq!("base_fee".parse::<FeeStrategy>().unwrap(), FeeStrategy::BaseFee);
        assert_eq!("low_priority".parse::<FeeStrategy>().unwrap(), FeeStrategy::LowPriority);
        let err = "turbo".parse::<FeeStrategy>().unwrap_err();
        assert_eq!(err.to_string(), "unknown fee strategy: turbo");
        assert_eq!(FeeStrategy::Optimal.to_string(), "optimal");
    }

    #[test]
    fn fee_strategy_serde_matches_names() {
        for strategy in FeeStrategy::ALL {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy.name()));
        }
    }

    #[test]
    fn tx_out_serializes_script_as_hex() {
        let out = TxOut {
            value: 5,
            script_pubkey: vec![0x6a, 0x00],
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["script_pubkey"], "6a00");
    }

    #[test]
    fn page_has_more() {
        let page = Page {
            data: vec![1, 2],
            current_page: 1,
            per_page: 2,
            total: 3,
        };
        assert!(page.has_more());
        let last = Page {
            data: vec![3],
            current_page: 2,
            per_page: 2,
            total: 3,
        };
        assert!(!last.has_more());
        let empty: Page<u8> = Page {
            data: vec![],
            current_page: 1,
            per_page: 2,
            total: 10,
        };
        assert!(!empty.has_more());
    }
}
