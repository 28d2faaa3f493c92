//! Fee resolution: strategy rates and size-derived fees.
//!
//! Rates are satoshis per 1000 virtual bytes. `base_fee` charges its rate for
//! every started kilobyte; the other strategies charge proportionally,
//! rounding up to the next satoshi.

use serde::{Deserialize, Serialize};

use waypath_core::error::SourceError;
use waypath_core::traits::FeeRateSource;
use waypath_core::types::FeeStrategy;

use crate::error::WalletError;

/// Default flat rate per started kilobyte.
pub const DEFAULT_BASE_FEE_PER_KB: u64 = 10_000;

pub const DEFAULT_OPTIMAL_PER_KB: u64 = 20_000;

pub const DEFAULT_LOW_PRIORITY_PER_KB: u64 = 5_000;

/// Fee for a transaction of `vsize` virtual bytes at `rate_per_kb`.
pub fn fee_for_size(strategy: FeeStrategy, rate_per_kb: u64, vsize: usize) -> u64 {
    let vsize = vsize as u128;
    let rate = rate_per_kb as u128;
    let fee = match strategy {
        FeeStrategy::BaseFee => rate * vsize.div_ceil(1000),
        FeeStrategy::Optimal | FeeStrategy::LowPriority => (rate * vsize).div_ceil(1000),
    };
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Fee rule fixed for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Exact fee regardless of size.
    Fixed(u64),
    /// Size-derived fee.
    Rate { strategy: FeeStrategy, per_kb: u64 },
}

impl FeePolicy {
    /// Resolve `strategy` through `source`, unless a fixed fee is set.
    pub fn resolve(
        fixed: Option<u64>,
        strategy: FeeStrategy,
        source: &dyn FeeRateSource,
    ) -> Result<Self, WalletError> {
        match fixed {
            Some(fee) => Ok(Self::Fixed(fee)),
            None => Ok(Self::Rate {
                strategy,
                per_kb: source.fee_per_kb(strategy)?,
            }),
        }
    }

    pub fn fee_for(&self, vsize: usize) -> u64 {
        match *self {
            Self::Fixed(fee) => fee,
            Self::Rate { strategy, per_kb } => fee_for_size(strategy, per_kb, vsize),
        }
    }
}

/// Fee source answering from fixed configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct StaticFeeRates {
    pub base_fee: u64,
    pub optimal: u64,
    pub low_priority: u64,
}

impl Default for StaticFeeRates {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE_PER_KB,
            optimal: DEFAULT_OPTIMAL_PER_KB,
            low_priority: DEFAULT_LOW_PRIORITY_PER_KB,
        }
    }
}

impl FeeRateSource for StaticFeeRates {
    fn fee_per_kb(&self, strategy: FeeStrategy) -> Result<u64, SourceError> {
        Ok(match strategy {
            FeeStrategy::BaseFee => self.base_fee,
            FeeStrategy::Optimal => self.optimal,
            FeeStrategy::LowPriority => self.low_priority,
        })
    }
}
