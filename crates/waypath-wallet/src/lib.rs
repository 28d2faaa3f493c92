//! # waypath-wallet — HD key tree, fee-aware transaction building, and fund discovery.
//!
//! Provides BIP32 key derivation with a memoizing key tree, address
//! derivation for single-key and multisig outputs, size-driven coin
//! selection and transaction building, and gap-limited discovery of funds
//! through a retrying blockchain data source.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`keys`] — Seed and the cached `KeyNode` tree
//! - [`mnemonic`] — BIP39 phrases to seeds
//! - [`codec`] — Address codec on top of the `bitcoin` crate
//! - [`derive`] — Paths to addresses and spending scripts
//! - [`fee`] — Fee strategies and static rates
//! - [`coin_selection`] — Largest-first, size-aware UTXO selection
//! - [`builder`] — Transaction builder
//! - [`retry`] — Bounded retry for data source calls
//! - [`discovery`] — Gap-limited fund scanner
//! - [`config`] — File and environment configuration
//! - [`wallet`] — High-level wallet composition

pub mod builder;
pub mod codec;
pub mod coin_selection;
pub mod config;
pub mod derive;
pub mod discovery;
pub mod error;
pub mod fee;
pub mod keys;
pub mod mnemonic;
pub mod retry;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{BuildState, TransactionBuilder, UnsignedTransaction};
pub use codec::BitcoinCodec;
pub use coin_selection::{CoinSelection, CoinSelector, SelectionParams};
pub use config::WalletConfig;
pub use derive::{AddressDeriver, AddressKind, DerivedAddress, MultisigDeriver, SingleKeyDeriver};
pub use discovery::{AddressFunds, DiscoveryResult, FundScanner, FundedOutput, ScanOptions};
pub use error::WalletError;
pub use fee::{FeePolicy, StaticFeeRates};
pub use keys::{ExtendedKey, KeyNode, Seed};
pub use mnemonic::mnemonic_to_seed;
pub use retry::{Retrier, RetryPolicy, Sleeper, ThreadSleeper};
pub use wallet::Wallet;
