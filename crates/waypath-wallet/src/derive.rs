//! Address derivation: from a derivation path to an address and its scripts.
//!
//! A [`SingleKeyDeriver`] pays to one key of the wallet's tree. A
//! [`MultisigDeriver`] combines the same path across several cosigner trees
//! into an m-of-n multisig script and wraps it as P2SH, P2WSH or P2SH-P2WSH.

use std::sync::Arc;

use bitcoin::hashes::{Hash, sha256};
use serde::{Deserialize, Serialize};

use waypath_core::constants::Network;
use waypath_core::path::DerivationPath;
use waypath_core::script::{
    multisig_script, p2pkh_script, p2sh_script, p2wpkh_script, p2wsh_script,
};
use waypath_core::traits::ScriptCodec;
use waypath_core::types::Utxo;

use crate::error::WalletError;
use crate::keys::KeyNode;

/// Output form an address pays to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    #[default]
    P2pkh,
    P2wpkh,
    P2shP2wpkh,
    /// Multisig wrapped in P2SH.
    P2sh,
    /// Multisig wrapped in P2WSH.
    P2wsh,
    /// Multisig wrapped in P2WSH, itself wrapped in P2SH.
    P2shP2wsh,
}

impl AddressKind {
    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            Self::P2wpkh | Self::P2shP2wpkh | Self::P2wsh | Self::P2shP2wsh
        )
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self, Self::P2sh | Self::P2wsh | Self::P2shP2wsh)
    }

    fn check_network(&self, network: Network) -> Result<(), WalletError> {
        if self.is_segwit() && !network.supports_segwit() {
            return Err(WalletError::SegwitUnsupported(network));
        }
        Ok(())
    }
}

/// An address together with everything needed to spend from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAddress {
    pub path: DerivationPath,
    pub address: String,
    pub script_pubkey: Vec<u8>,
    pub redeem_script: Option<Vec<u8>>,
    pub witness_script: Option<Vec<u8>>,
}

impl DerivedAddress {
    /// Attach this address's path and scripts to a UTXO paying to it.
    pub fn annotate(&self, utxo: Utxo) -> Utxo {
        let mut utxo = utxo.with_address(&self.address).with_path(self.path.clone());
        utxo.redeem_script = self.redeem_script.clone();
        utxo.witness_script = self.witness_script.clone();
        utxo
    }
}

/// Produces the address for a derivation path.
pub trait AddressDeriver {
    fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError>;
}

impl<D: AddressDeriver + ?Sized> AddressDeriver for &mut D {
    fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
        (**self).derive_address(path)
    }
}

fn compressed_key(node: &mut KeyNode, path: &DerivationPath) -> Result<[u8; 33], WalletError> {
    Ok(node
        .derive_through_parent(&path.public_path())?
        .public_key()
        .serialize())
}

fn hash160(data: &[u8]) -> [u8; 20] {
    bitcoin::hashes::hash160::Hash::hash(data).to_byte_array()
}

fn witness_script_hash(script: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(script).to_byte_array()
}

/// Single-signature addresses under one key tree.
pub struct SingleKeyDeriver {
    root: KeyNode,
    kind: AddressKind,
    codec: Arc<dyn ScriptCodec>,
}

impl SingleKeyDeriver {
    pub fn new(
        root: KeyNode,
        kind: AddressKind,
        codec: Arc<dyn ScriptCodec>,
    ) -> Result<Self, WalletError> {
        if kind.is_multisig() {
            return Err(WalletError::Config(format!(
                "{kind:?} needs a multisig deriver"
            )));
        }
        kind.check_network(codec.network())?;
        Ok(Self { root, kind, codec })
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn root(&self) -> &KeyNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut KeyNode {
        &mut self.root
    }

    pub fn codec(&self) -> &Arc<dyn ScriptCodec> {
        &self.codec
    }
}

impl AddressDeriver for SingleKeyDeriver {
    fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
        let pubkey = compressed_key(&mut self.root, path)?;
        let hash = hash160(&pubkey);
        let (script_pubkey, redeem_script) = match self.kind {
            AddressKind::P2pkh => (p2pkh_script(&hash), None),
            AddressKind::P2wpkh => (p2wpkh_script(&hash), None),
            AddressKind::P2shP2wpkh => {
                let program = p2wpkh_script(&hash);
                (p2sh_script(&hash160(&program)), Some(program))
            }
            kind => {
                return Err(WalletError::Config(format!(
                    "{kind:?} needs a multisig deriver"
                )));
            }
        };
        Ok(DerivedAddress {
            path: path.clone(),
            address: self.codec.address_for_script(&script_pubkey)?,
            script_pubkey,
            redeem_script,
            witness_script: None,
        })
    }
}

/// m-of-n multisig addresses over cosigner key trees.
///
/// Cosigner public keys are sorted before building the script, so the
/// order of `cosigners` does not affect the resulting address.
pub struct MultisigDeriver {
    cosigners: Vec<KeyNode>,
    required: usize,
    kind: AddressKind,
    codec: Arc<dyn ScriptCodec>,
}

impl MultisigDeriver {
    pub fn new(
        cosigners: Vec<KeyNode>,
        required: usize,
        kind: AddressKind,
        codec: Arc<dyn ScriptCodec>,
    ) -> Result<Self, WalletError> {
        if !kind.is_multisig() {
            return Err(WalletError::Config(format!(
                "{kind:?} is not a multisig address kind"
            )));
        }
        kind.check_network(codec.network())?;
        if required == 0 || required > cosigners.len() || cosigners.len() > 16 {
            return Err(WalletError::Config(format!(
                "{required}-of-{} multisig",
                cosigners.len()
            )));
        }
        Ok(Self {
            cosigners,
            required,
            kind,
            codec,
        })
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn cosigner_count(&self) -> usize {
        self.cosigners.len()
    }
}

impl AddressDeriver for MultisigDeriver {
    fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
        let pubkeys = self
            .cosigners
            .iter_mut()
            .map(|node| compressed_key(node, path).map(|k| k.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        let multisig = multisig_script(self.required, &pubkeys)?;

        let (script_pubkey, redeem_script, witness_script) = match self.kind {
            AddressKind::P2sh => (
                p2sh_script(&hash160(&multisig)),
                Some(multisig),
                None,
            ),
            AddressKind::P2wsh => (
                p2wsh_script(&witness_script_hash(&multisig)),
                None,
                Some(multisig),
            ),
            AddressKind::P2shP2wsh => {
                let program = p2wsh_script(&witness_script_hash(&multisig));
                (
                    p2sh_script(&hash160(&program)),
                    Some(program),
                    Some(multisig),
                )
            }
            kind => {
                return Err(WalletError::Config(format!(
                    "{kind:?} is not a multisig address kind"
                )));
            }
        };

        Ok(DerivedAddress {
            path: path.clone(),
            address: self.codec.address_for_script(&script_pubkey)?,
            script_pubkey,
            redeem_script,
            witness_script,
        })
    }
}
