//! BIP-39 mnemonic phrases to BIP32 seeds.

use bip39::{Language, Mnemonic};

use crate::error::WalletError;
use crate::keys::Seed;

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn parse(phrase: &str) -> Result<Mnemonic, WalletError> {
    Mnemonic::parse_in(Language::English, normalize(phrase))
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Parse a BIP-39 phrase and stretch it into a 64-byte seed.
///
/// Normalizes whitespace and converts to lowercase before parsing.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let mnemonic = parse(phrase)?;
    Seed::from_bytes(&mnemonic.to_seed(passphrase))
}

/// Encode entropy (16, 20, 24, 28 or 32 bytes) as an English phrase.
pub fn entropy_to_mnemonic(entropy: &[u8]) -> Result<String, WalletError> {
    Mnemonic::from_entropy_in(Language::English, entropy)
        .map(|m| m.to_string())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// A fresh 24-word phrase from the OS RNG.
pub fn generate_mnemonic() -> Result<String, WalletError> {
    use rand::RngCore;
    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    entropy_to_mnemonic(&entropy)
}

/// Whether `phrase` is a valid English BIP-39 mnemonic.
pub fn is_valid_mnemonic(phrase: &str) -> bool {
    parse(phrase).is_ok()
}
