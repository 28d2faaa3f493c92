//! Address string codec backed by the `bitcoin` crate.
//!
//! Bitcoin Cash networks share Bitcoin's legacy base58 prefixes and reject
//! every witness form.

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Script};

use waypath_core::constants::Network;
use waypath_core::error::CodecError;
use waypath_core::script::classify_script;
use waypath_core::traits::ScriptCodec;

/// Network parameters the `bitcoin` crate uses for `network`.
pub fn bitcoin_network(network: Network) -> bitcoin::Network {
    match network {
        Network::Bitcoin | Network::BitcoinCash => bitcoin::Network::Bitcoin,
        Network::Testnet | Network::BitcoinCashTestnet => bitcoin::Network::Testnet,
        Network::Regtest => bitcoin::Network::Regtest,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitcoinCodec {
    network: Network,
}

impl BitcoinCodec {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    fn check_witness(&self, script: &[u8], shown: &str) -> Result<(), CodecError> {
        if !self.network.supports_segwit() && classify_script(script).is_witness() {
            return Err(CodecError::InvalidAddress {
                address: shown.to_string(),
                reason: format!("witness program on {:?}", self.network),
            });
        }
        Ok(())
    }
}

impl ScriptCodec for BitcoinCodec {
    fn network(&self) -> Network {
        self.network
    }

    fn script_for_address(&self, address: &str) -> Result<Vec<u8>, CodecError> {
        let unchecked = Address::<NetworkUnchecked>::from_str(address).map_err(|e| {
            CodecError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;
        let checked = unchecked
            .require_network(bitcoin_network(self.network))
            .map_err(|_| CodecError::WrongNetwork(address.to_string()))?;
        let script = checked.script_pubkey().into_bytes();
        self.check_witness(&script, address)?;
        Ok(script)
    }

    fn address_for_script(&self, script: &[u8]) -> Result<String, CodecError> {
        self.check_witness(script, &hex::encode(script))?;
        Address::from_script(Script::from_bytes(script), bitcoin_network(self.network))
            .map(|address| address.to_string())
            .map_err(|_| CodecError::NoAddressForm(hex::encode(script)))
    }
}
