//! Wallet configuration.
//!
//! Settings come from an optional TOML file layered with `WAYPATH_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `WAYPATH_FEE_RATES__OPTIMAL=15000`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use waypath_core::constants::{DEFAULT_DUST_THRESHOLD, MAX_BATCH_ADDRESSES, Network};
use waypath_core::types::FeeStrategy;

use crate::coin_selection::DEFAULT_MAX_INPUTS;
use crate::derive::AddressKind;
use crate::discovery::{DEFAULT_INCREMENT, DEFAULT_PER_PAGE, ScanOptions};
use crate::error::WalletError;
use crate::fee::StaticFeeRates;
use crate::retry::{DEFAULT_RETRY_LIMIT, RetryPolicy};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "WAYPATH";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WalletConfig {
    pub network: Network,
    /// BIP44 account index.
    pub account: u32,
    pub address_kind: AddressKind,
    /// Gap window for discovery.
    pub increment: u32,
    /// Addresses per data source request.
    pub batch_size: usize,
    pub per_page: usize,
    /// Consecutive transient failures tolerated.
    pub retry_limit: u32,
    pub retry_delay_ms: u64,
    pub dust_threshold: u64,
    pub fee_strategy: FeeStrategy,
    /// Fallback per-kB rates.
    pub fee_rates: StaticFeeRates,
    /// Input cap for one selection.
    pub max_inputs: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            account: 0,
            address_kind: AddressKind::P2pkh,
            increment: DEFAULT_INCREMENT,
            batch_size: MAX_BATCH_ADDRESSES,
            per_page: DEFAULT_PER_PAGE,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_delay_ms: 1_000,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            fee_strategy: FeeStrategy::Optimal,
            fee_rates: StaticFeeRates::default(),
            max_inputs: DEFAULT_MAX_INPUTS,
        }
    }
}

impl WalletConfig {
    /// Preset for Bitcoin testnet.
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            ..Self::default()
        }
    }

    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, WalletError> {
        Self::load_with_env(path, None)
    }

    /// Load from `path` (if given) and `env`, or the process environment
    /// when `env` is `None`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, WalletError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WalletError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        self.scan_options().validate()?;
        if self.retry_limit == 0 {
            return Err(WalletError::Config("retry_limit must be positive".into()));
        }
        if self.max_inputs == 0 {
            return Err(WalletError::Config("max_inputs must be positive".into()));
        }
        if self.address_kind.is_segwit() && !self.network.supports_segwit() {
            return Err(WalletError::SegwitUnsupported(self.network));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            limit: self.retry_limit,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            increment: self.increment,
            batch_size: self.batch_size,
            per_page: self.per_page,
        }
    }
}
