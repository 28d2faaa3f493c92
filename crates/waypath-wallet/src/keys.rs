//! Seed management and the hierarchical key tree.
//!
//! A [`KeyNode`] holds one BIP32 extended key (private or public) together
//! with the path it sits at, and memoizes every descendant it is asked for.
//! Requesting the same path twice returns the same cached node.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use waypath_core::constants::Network;
use waypath_core::path::DerivationPath;

use crate::codec::bitcoin_network;
use crate::error::WalletError;

/// Shortest and longest seeds BIP32 accepts, in bytes.
pub const MIN_SEED_LEN: usize = 16;
pub const MAX_SEED_LEN: usize = 64;

/// A BIP32 master seed.
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Generate a random 32-byte seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a seed from raw bytes (16 to 64 of them).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
            return Err(WalletError::KeyDerivation(format!(
                "seed must be {MIN_SEED_LEN} to {MAX_SEED_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Extended key held by a [`KeyNode`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKey {
    Private(Xpriv),
    Public(Xpub),
}

/// One key of the hierarchy plus the path it was derived at.
///
/// Public targets below a private node are derived along the private path
/// and neutered only at the last step, so hardened levels work. Public nodes
/// can only reach non-hardened descendants.
pub struct KeyNode {
    key: ExtendedKey,
    path: DerivationPath,
    secp: Arc<Secp256k1<All>>,
    /// Descendants by canonical path string.
    cache: HashMap<String, KeyNode>,
    /// Compressed public key hex; filled lazily on public nodes only.
    public_hex: OnceCell<String>,
}

impl KeyNode {
    fn with_context(key: ExtendedKey, path: DerivationPath, secp: Arc<Secp256k1<All>>) -> Self {
        Self {
            key,
            path,
            secp,
            cache: HashMap::new(),
            public_hex: OnceCell::new(),
        }
    }

    /// Master private node `m` for `seed`.
    pub fn master(seed: &Seed, network: Network) -> Result<Self, WalletError> {
        let xpriv = Xpriv::new_master(bitcoin_network(network), seed.as_bytes())?;
        Ok(Self::with_context(
            ExtendedKey::Private(xpriv),
            DerivationPath::master(),
            Arc::new(Secp256k1::new()),
        ))
    }

    /// Private node located at `path`, which must use the `m` root.
    pub fn from_xpriv(xpriv: Xpriv, path: DerivationPath) -> Result<Self, WalletError> {
        if !path.is_private_path() {
            return Err(WalletError::KeyDerivation(format!(
                "private key at public path {path}"
            )));
        }
        Ok(Self::with_context(
            ExtendedKey::Private(xpriv),
            path,
            Arc::new(Secp256k1::new()),
        ))
    }

    /// Public node located at `path`, which must use the `M` root.
    pub fn from_xpub(xpub: Xpub, path: DerivationPath) -> Result<Self, WalletError> {
        if !path.is_public_path() {
            return Err(WalletError::KeyDerivation(format!(
                "public key at private path {path}"
            )));
        }
        Ok(Self::with_context(
            ExtendedKey::Public(xpub),
            path,
            Arc::new(Secp256k1::new()),
        ))
    }

    /// Parse a base58 `xprv`/`tprv` or `xpub`/`tpub` string.
    pub fn from_extended_key(encoded: &str, path: DerivationPath) -> Result<Self, WalletError> {
        if let Ok(xpriv) = Xpriv::from_str(encoded) {
            return Self::from_xpriv(xpriv, path);
        }
        let xpub = Xpub::from_str(encoded)?;
        Self::from_xpub(xpub, path)
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn key(&self) -> &ExtendedKey {
        &self.key
    }

    pub fn is_private(&self) -> bool {
        matches!(self.key, ExtendedKey::Private(_))
    }

    pub fn xpriv(&self) -> Option<&Xpriv> {
        match &self.key {
            ExtendedKey::Private(xpriv) => Some(xpriv),
            ExtendedKey::Public(_) => None,
        }
    }

    pub fn xpub(&self) -> Xpub {
        match &self.key {
            ExtendedKey::Private(xpriv) => Xpub::from_priv(&self.secp, xpriv),
            ExtendedKey::Public(xpub) => *xpub,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            ExtendedKey::Private(xpriv) => xpriv.private_key.public_key(&self.secp),
            ExtendedKey::Public(xpub) => xpub.public_key,
        }
    }

    /// Base58 form of the held extended key.
    pub fn extended_key_string(&self) -> String {
        match &self.key {
            ExtendedKey::Private(xpriv) => xpriv.to_string(),
            ExtendedKey::Public(xpub) => xpub.to_string(),
        }
    }

    /// Compressed public key as hex.
    ///
    /// Private nodes go through their cached public counterpart.
    pub fn public_key_hex(&mut self) -> Result<String, WalletError> {
        if !self.is_private() {
            return Ok(self.cached_public_hex().to_owned());
        }
        let public_path = self.path.public_path();
        Ok(self.derive(&public_path)?.cached_public_hex().to_owned())
    }

    fn cached_public_hex(&self) -> &str {
        self.public_hex
            .get_or_init(|| hex::encode(self.public_key().serialize()))
    }

    /// Number of memoized descendants.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Derive (or fetch from cache) the node at `path`.
    ///
    /// `path` must extend this node's levels. Its root marker decides
    /// whether the result holds a private or a public key.
    pub fn derive(&mut self, path: &DerivationPath) -> Result<&KeyNode, WalletError> {
        self.derive_mut(path).map(|node| &*node)
    }

    /// Derive the node at `path` by way of its parent.
    ///
    /// The parent branch is memoized on this node and the leaf on the
    /// branch, so walking many siblings (a chain of addresses) adds one
    /// entry here and one short derivation per leaf. Hardened leaves and
    /// private targets go through the private parent.
    pub fn derive_through_parent(&mut self, path: &DerivationPath) -> Result<&KeyNode, WalletError> {
        let Ok(parent) = path.parent() else {
            return self.derive(path);
        };
        if parent.depth() <= self.path.depth() {
            return self.derive(path);
        }
        let parent = if path.is_public_path() && !path.is_hardened() {
            parent
        } else {
            parent.private_path()
        };
        self.derive_mut(&parent)?.derive(path)
    }

    fn derive_mut(&mut self, path: &DerivationPath) -> Result<&mut KeyNode, WalletError> {
        if *path == self.path {
            return Ok(self);
        }
        let key = path.to_string();
        if !self.cache.contains_key(&key) {
            let node = self.derive_uncached(path)?;
            trace!(from = %self.path, to = %key, "derived key node");
            self.cache.insert(key.clone(), node);
        }
        self.cache
            .get_mut(&key)
            .ok_or_else(|| WalletError::KeyDerivation(format!("{key} missing from cache")))
    }

    fn derive_uncached(&mut self, path: &DerivationPath) -> Result<KeyNode, WalletError> {
        let relative: Vec<ChildNumber> = path
            .relative_to(&self.path)
            .ok_or_else(|| {
                WalletError::KeyDerivation(format!("{path} is not below {}", self.path))
            })?
            .iter()
            .map(|level| ChildNumber::from(level.child_number()))
            .collect();

        let key = match (self.key, path.is_public_path()) {
            (ExtendedKey::Private(xpriv), false) => {
                ExtendedKey::Private(xpriv.derive_priv(&self.secp, &relative)?)
            }
            (ExtendedKey::Private(_), true) => {
                let xpub = self.derive(&path.private_path())?.xpub();
                ExtendedKey::Public(xpub)
            }
            (ExtendedKey::Public(xpub), true) => {
                if relative.iter().any(ChildNumber::is_hardened) {
                    return Err(WalletError::KeyDerivation(format!(
                        "hardened level in {path} below public node {}",
                        self.path
                    )));
                }
                ExtendedKey::Public(xpub.derive_pub(&self.secp, &relative)?)
            }
            (ExtendedKey::Public(_), false) => {
                return Err(WalletError::KeyDerivation(format!(
                    "private path {path} below public node {}",
                    self.path
                )));
            }
        };
        Ok(Self::with_context(key, path.clone(), Arc::clone(&self.secp)))
    }
}

impl fmt::Debug for KeyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyNode")
            .field("path", &self.path.to_string())
            .field("private", &self.is_private())
            .field("cached", &self.cache.len())
            .finish()
    }
}
