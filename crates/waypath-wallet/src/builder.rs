//! Transaction builder with fee-aware coin selection.
//!
//! Provides a builder pattern for constructing unsigned transactions:
//! 1. Add outputs (address + amount, raw script, or OP_RETURN data)
//! 2. Pick a change address and a fee strategy (or a fixed fee)
//! 3. Build against the available UTXOs; selection converges on a fee
//!    consistent with the transaction's own estimated size
//!
//! Signing happens elsewhere; the builder only guarantees that the inputs
//! leave room for maximum-length signatures.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use waypath_core::constants::{DEFAULT_DUST_THRESHOLD, MAX_STANDARD_OP_RETURN};
use waypath_core::path::DerivationPath;
use waypath_core::script::op_return_script;
use waypath_core::size::{TxSize, estimate_utxo};
use waypath_core::traits::{FeeRateSource, ScriptCodec};
use waypath_core::types::{FeeStrategy, TxOut, Utxo};

use crate::coin_selection::{CoinSelector, DEFAULT_MAX_INPUTS, SelectionParams};
use crate::error::WalletError;
use crate::fee::FeePolicy;

/// Where a builder is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Accepting outputs and settings.
    Configuring,
    /// Choosing inputs.
    Selecting,
    /// Inputs cover outputs plus fee; outputs not yet finalized.
    Balanced,
    Built,
    Failed,
}

/// An unsigned transaction ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Spent UTXOs, in input order.
    pub inputs: Vec<Utxo>,
    /// Outputs, change included.
    pub outputs: Vec<TxOut>,
    /// Position of the change output in `outputs`.
    pub change_index: Option<usize>,
    pub fee: u64,
    pub fee_policy: FeePolicy,
    /// Worst-case size once signed.
    pub size: TxSize,
    pub lock_time: u32,
    /// Selection iterations it took to balance.
    pub iterations: usize,
}

impl UnsignedTransaction {
    pub fn total_in(&self) -> u64 {
        self.inputs.iter().map(|u| u.value).sum()
    }

    pub fn total_out(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    pub fn change(&self) -> Option<&TxOut> {
        self.change_index.and_then(|i| self.outputs.get(i))
    }

    /// Derivation path of every input, in input order.
    pub fn input_paths(&self) -> Vec<Option<&DerivationPath>> {
        self.inputs.iter().map(|u| u.path.as_ref()).collect()
    }
}

/// Builder for unsigned transactions.
///
/// # Example
/// ```ignore
/// let mut builder = TransactionBuilder::new(codec, fee_source);
/// builder
///     .add_output("bc1q...", 50_000)?
///     .set_change_address("bc1q...")?
///     .set_fee_strategy(FeeStrategy::LowPriority);
/// let unsigned = builder.build(&utxos)?;
/// ```
pub struct TransactionBuilder {
    codec: Arc<dyn ScriptCodec>,
    fee_source: Arc<dyn FeeRateSource>,
    outputs: Vec<TxOut>,
    change_address: Option<String>,
    change_script: Option<Vec<u8>>,
    fee_strategy: FeeStrategy,
    fixed_fee: Option<u64>,
    dust_threshold: u64,
    max_inputs: usize,
    randomize_change: bool,
    lock_time: u32,
    state: BuildState,
}

impl TransactionBuilder {
    /// Create a builder with the default strategy, dust threshold, and input cap.
    pub fn new(codec: Arc<dyn ScriptCodec>, fee_source: Arc<dyn FeeRateSource>) -> Self {
        Self {
            codec,
            fee_source,
            outputs: Vec::new(),
            change_address: None,
            change_script: None,
            fee_strategy: FeeStrategy::default(),
            fixed_fee: None,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            max_inputs: DEFAULT_MAX_INPUTS,
            randomize_change: false,
            lock_time: 0,
            state: BuildState::Configuring,
        }
    }

    fn configure(&mut self) -> &mut Self {
        self.state = BuildState::Configuring;
        self
    }

    fn check_value(&self, value: u64) -> Result<(), WalletError> {
        if value == 0 {
            return Err(WalletError::InvalidAmount("output value is zero".into()));
        }
        if value < self.dust_threshold {
            return Err(WalletError::DustOutput {
                value,
                threshold: self.dust_threshold,
            });
        }
        Ok(())
    }

    /// Pay `value` satoshis to `address`.
    pub fn add_output(&mut self, address: &str, value: u64) -> Result<&mut Self, WalletError> {
        self.check_value(value)?;
        let script_pubkey = self.codec.script_for_address(address)?;
        self.outputs.push(TxOut {
            value,
            script_pubkey,
        });
        Ok(self.configure())
    }

    /// Pay `value` satoshis to a raw output script.
    pub fn add_script_output(
        &mut self,
        script_pubkey: Vec<u8>,
        value: u64,
    ) -> Result<&mut Self, WalletError> {
        self.check_value(value)?;
        self.outputs.push(TxOut {
            value,
            script_pubkey,
        });
        Ok(self.configure())
    }

    /// Attach a zero-value `OP_RETURN` output carrying `data`.
    ///
    /// Payloads over 79 bytes are non-standard and need `allow_non_standard`.
    pub fn add_op_return(
        &mut self,
        data: &[u8],
        allow_non_standard: bool,
    ) -> Result<&mut Self, WalletError> {
        if data.len() > MAX_STANDARD_OP_RETURN && !allow_non_standard {
            return Err(WalletError::NonStandardOpReturn {
                size: data.len(),
                max: MAX_STANDARD_OP_RETURN,
            });
        }
        self.outputs.push(TxOut {
            value: 0,
            script_pubkey: op_return_script(data),
        });
        Ok(self.configure())
    }

    pub fn set_change_address(&mut self, address: &str) -> Result<&mut Self, WalletError> {
        let script = self.codec.script_for_address(address)?;
        self.change_address = Some(address.to_string());
        self.change_script = Some(script);
        Ok(self.configure())
    }

    /// Pay exactly `fee`, overriding the strategy.
    pub fn set_fee(&mut self, fee: u64) -> &mut Self {
        self.fixed_fee = Some(fee);
        self.configure()
    }

    pub fn set_fee_strategy(&mut self, strategy: FeeStrategy) -> &mut Self {
        self.fee_strategy = strategy;
        self.configure()
    }

    /// Set the strategy by its name (`base_fee`, `optimal`, `low_priority`).
    pub fn set_fee_strategy_name(&mut self, name: &str) -> Result<&mut Self, WalletError> {
        let strategy: FeeStrategy = name.parse()?;
        Ok(self.set_fee_strategy(strategy))
    }

    pub fn set_dust_threshold(&mut self, threshold: u64) -> &mut Self {
        self.dust_threshold = threshold;
        self.configure()
    }

    pub fn set_max_inputs(&mut self, max_inputs: usize) -> &mut Self {
        self.max_inputs = max_inputs;
        self.configure()
    }

    /// Place the change output at a uniformly random position.
    pub fn randomize_change_output(&mut self, randomize: bool) -> &mut Self {
        self.randomize_change = randomize;
        self.configure()
    }

    pub fn set_lock_time(&mut self, lock_time: u32) -> &mut Self {
        self.lock_time = lock_time;
        self.configure()
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn change_address(&self) -> Option<&str> {
        self.change_address.as_deref()
    }

    /// Fixed fee, if one was set.
    pub fn fee(&self) -> Option<u64> {
        self.fixed_fee
    }

    pub fn fee_strategy(&self) -> FeeStrategy {
        self.fee_strategy
    }

    pub fn dust_threshold(&self) -> u64 {
        self.dust_threshold
    }

    pub fn max_inputs(&self) -> usize {
        self.max_inputs
    }

    pub fn randomizes_change(&self) -> bool {
        self.randomize_change
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Build an unsigned transaction, shuffling change with the thread RNG.
    pub fn build(&mut self, utxos: &[Utxo]) -> Result<UnsignedTransaction, WalletError> {
        self.build_with_rng(utxos, &mut rand::thread_rng())
    }

    /// Build an unsigned transaction using `rng` for the change position.
    pub fn build_with_rng<R: Rng + ?Sized>(
        &mut self,
        utxos: &[Utxo],
        rng: &mut R,
    ) -> Result<UnsignedTransaction, WalletError> {
        let result = self.try_build(utxos, rng);
        self.state = match &result {
            Ok(_) => BuildState::Built,
            Err(e) => {
                debug!(error = %e, "build failed");
                BuildState::Failed
            }
        };
        result
    }

    fn try_build<R: Rng + ?Sized>(
        &mut self,
        utxos: &[Utxo],
        rng: &mut R,
    ) -> Result<UnsignedTransaction, WalletError> {
        if self.outputs.is_empty() {
            return Err(WalletError::BuildError("no outputs".into()));
        }

        self.state = BuildState::Selecting;
        let fee_policy =
            FeePolicy::resolve(self.fixed_fee, self.fee_strategy, self.fee_source.as_ref())?;
        let selection = CoinSelector::select(
            utxos,
            &SelectionParams {
                outputs: &self.outputs,
                change_script: self.change_script.as_deref(),
                fee: fee_policy,
                dust_threshold: self.dust_threshold,
                max_inputs: self.max_inputs,
            },
        )?;
        self.state = BuildState::Balanced;

        let mut outputs = self.outputs.clone();
        let mut change_index = None;
        if let (true, Some(script)) = (selection.has_change(), &self.change_script) {
            let index = if self.randomize_change {
                rng.gen_range(0..=outputs.len())
            } else {
                outputs.len()
            };
            outputs.insert(
                index,
                TxOut {
                    value: selection.change,
                    script_pubkey: script.clone(),
                },
            );
            change_index = Some(index);
        }

        info!(
            inputs = selection.selected.len(),
            outputs = outputs.len(),
            fee = selection.fee,
            change = selection.change,
            vsize = selection.size.vsize,
            iterations = selection.iterations,
            "built transaction"
        );

        Ok(UnsignedTransaction {
            inputs: selection.selected,
            outputs,
            change_index,
            fee: selection.fee,
            fee_policy,
            size: selection.size,
            lock_time: self.lock_time,
            iterations: selection.iterations,
        })
    }

    /// Spend every UTXO to `destination`, less the size-derived fee.
    ///
    /// Configured outputs and change settings are not used.
    pub fn sweep(
        &mut self,
        utxos: &[Utxo],
        destination: &str,
    ) -> Result<UnsignedTransaction, WalletError> {
        let result = self.try_sweep(utxos, destination);
        self.state = if result.is_ok() {
            BuildState::Built
        } else {
            BuildState::Failed
        };
        result
    }

    fn try_sweep(
        &mut self,
        utxos: &[Utxo],
        destination: &str,
    ) -> Result<UnsignedTransaction, WalletError> {
        if utxos.is_empty() {
            return Err(WalletError::NoUtxos);
        }
        let script_pubkey = self.codec.script_for_address(destination)?;

        self.state = BuildState::Selecting;
        let inputs = CoinSelector::order(utxos);
        let input_sizes = inputs.iter().map(estimate_utxo).collect::<Result<Vec<_>, _>>()?;
        let total_in = inputs
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.value))
            .ok_or_else(|| WalletError::InvalidAmount("total input overflow".into()))?;

        let fee_policy =
            FeePolicy::resolve(self.fixed_fee, self.fee_strategy, self.fee_source.as_ref())?;
        let size = TxSize::from_parts(
            &input_sizes,
            &[TxOut {
                value: 0,
                script_pubkey: script_pubkey.clone(),
            }],
        );
        let fee = fee_policy.fee_for(size.vsize);
        let value = total_in
            .checked_sub(fee)
            .ok_or(WalletError::InsufficientFunds {
                have: total_in,
                need: fee,
            })?;
        self.check_value(value)?;
        self.state = BuildState::Balanced;

        info!(inputs = inputs.len(), value, fee, vsize = size.vsize, "built sweep");

        Ok(UnsignedTransaction {
            inputs,
            outputs: vec![TxOut {
                value,
                script_pubkey,
            }],
            change_index: None,
            fee,
            fee_policy,
            size,
            lock_time: self.lock_time,
            iterations: input_sizes.len(),
        })
    }
}
