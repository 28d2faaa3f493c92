//! Fee-aware coin selection.
//!
//! Fee depends on size, size depends on the inputs chosen, and the inputs
//! chosen depend on the fee. The selector resolves this by adding one UTXO at
//! a time (largest first) and re-estimating the whole transaction after every
//! addition, both without and with a change output, until the selection pays
//! for itself.

use tracing::debug;

use waypath_core::size::{InputSize, TxSize, estimate_utxo};
use waypath_core::types::{TxOut, Utxo};

use crate::error::WalletError;
use crate::fee::FeePolicy;

/// Default cap on the number of inputs one selection may use.
pub const DEFAULT_MAX_INPUTS: usize = 2_000;

/// Inputs to one selection run.
#[derive(Debug, Clone)]
pub struct SelectionParams<'a> {
    /// Outputs to fund, change excluded.
    pub outputs: &'a [TxOut],
    /// Script receiving change, if any.
    pub change_script: Option<&'a [u8]>,
    pub fee: FeePolicy,
    pub dust_threshold: u64,
    pub max_inputs: usize,
}

/// Result of coin selection: which UTXOs to spend and the fee/change breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected UTXOs, in selection order.
    pub selected: Vec<Utxo>,
    pub total_in: u64,
    /// Sum of the requested outputs.
    pub total_out: u64,
    /// Fee paid, including any leftover too small for change.
    pub fee: u64,
    /// Change value; 0 when no change output is created.
    pub change: u64,
    /// Estimated size of the final transaction.
    pub size: TxSize,
    /// UTXOs tried before the selection balanced.
    pub iterations: usize,
}

impl CoinSelection {
    pub fn has_change(&self) -> bool {
        self.change > 0
    }
}

/// Largest-first coin selector with a hard input cap.
pub struct CoinSelector;

impl CoinSelector {
    /// UTXOs in selection order: value descending, then outpoint ascending.
    pub fn order(utxos: &[Utxo]) -> Vec<Utxo> {
        let mut ordered = utxos.to_vec();
        ordered.sort_by(|a, b| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.outpoint.cmp(&b.outpoint))
        });
        ordered
    }

    /// Select UTXOs funding `params.outputs` plus the size-derived fee.
    pub fn select(utxos: &[Utxo], params: &SelectionParams<'_>) -> Result<CoinSelection, WalletError> {
        if utxos.is_empty() {
            return Err(WalletError::NoUtxos);
        }

        let mut total_out: u64 = 0;
        for out in params.outputs {
            total_out = total_out
                .checked_add(out.value)
                .ok_or_else(|| WalletError::InvalidAmount("total output overflow".into()))?;
        }

        let mut selected: Vec<Utxo> = Vec::new();
        let mut input_sizes: Vec<InputSize> = Vec::new();
        let mut total_in: u64 = 0;
        let mut need = total_out;

        for (iteration, utxo) in Self::order(utxos).into_iter().enumerate() {
            if selected.len() >= params.max_inputs {
                return Err(WalletError::SelectionLimit(params.max_inputs));
            }
            input_sizes.push(estimate_utxo(&utxo)?);
            total_in = total_in.saturating_add(utxo.value);
            selected.push(utxo);
            let iterations = iteration + 1;

            let size = TxSize::from_parts(&input_sizes, params.outputs);
            let fee = params.fee.fee_for(size.vsize);
            need = total_out.saturating_add(fee);
            if total_in < need {
                debug!(iterations, total_in, need, "selection short");
                continue;
            }

            let leftover = total_in - need;
            if leftover < params.dust_threshold {
                debug!(iterations, fee, leftover, "balanced without change");
                return Ok(CoinSelection {
                    selected,
                    total_in,
                    total_out,
                    fee: total_in - total_out,
                    change: 0,
                    size,
                    iterations,
                });
            }

            let change_script = params
                .change_script
                .ok_or(WalletError::MissingChangeAddress)?;
            let mut with_change = params.outputs.to_vec();
            with_change.push(TxOut {
                value: 0,
                script_pubkey: change_script.to_vec(),
            });
            let change_size = TxSize::from_parts(&input_sizes, &with_change);
            let change_fee = params.fee.fee_for(change_size.vsize);
            let change = total_in
                .checked_sub(total_out.saturating_add(change_fee))
                .unwrap_or(0);

            if change >= params.dust_threshold && change > 0 {
                debug!(iterations, fee = change_fee, change, "balanced with change");
                return Ok(CoinSelection {
                    selected,
                    total_in,
                    total_out,
                    fee: change_fee,
                    change,
                    size: change_size,
                    iterations,
                });
            }

            // The change output would cost more than it returns.
            debug!(iterations, fee, leftover, "change below dust after its own fee");
            return Ok(CoinSelection {
                selected,
                total_in,
                total_out,
                fee: total_in - total_out,
                change: 0,
                size,
                iterations,
            });
        }

        Err(WalletError::InsufficientFunds {
            have: total_in,
            need,
        })
    }
}
