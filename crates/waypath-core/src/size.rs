//! Worst-case size estimation for unsigned transactions.
//!
//! Every figure assumes maximum-length DER signatures so that a transaction
//! funded from these estimates never underpays once signed. Unlocking data is
//! split into the legacy scriptSig (counted with its own length prefix) and
//! the segregated witness, which is discounted when computing vsize.
//!
//! # Layout
//!
//! ```text
//! input  = txid(32) || vout(4) || varint(len) || scriptSig || sequence(4)
//! output = value(8) || varint(len) || scriptPubKey
//! tx     = version(4) || [marker, flag] || varint(#in) || inputs
//!          || varint(#out) || outputs || [witnesses] || locktime(4)
//! ```

use crate::constants::{COMPRESSED_PUBKEY_SIZE, MAX_DER_SIGNATURE_SIZE};
use crate::error::EstimateError;
use crate::script::{MultisigInfo, ScriptType, classify_script};
use crate::types::{SpendShape, TxOut, Utxo};

/// Outpoint (32 + 4) and sequence (4).
pub const INPUT_BASE_SIZE: usize = 32 + 4 + 4;

/// Output value field.
pub const OUTPUT_VALUE_SIZE: usize = 8;

/// Version and locktime fields.
pub const TX_HEADER_SIZE: usize = 4 + 4;

/// Segwit marker and flag bytes.
pub const WITNESS_MARKER_SIZE: usize = 2;

/// Weight units per non-witness byte.
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Unlocking data size of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSize {
    /// scriptSig bytes including the length prefix.
    pub script_sig: usize,
    /// Serialized witness bytes; 0 when the input has no witness.
    pub witness: usize,
}

impl InputSize {
    /// Non-witness bytes the input adds to the transaction.
    pub fn base_size(&self) -> usize {
        INPUT_BASE_SIZE + self.script_sig
    }

    pub fn has_witness(&self) -> bool {
        self.witness > 0
    }
}

/// Whole-transaction size figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxSize {
    /// Size without any witness data.
    pub base_size: usize,
    /// Witness data including marker and flag; 0 for legacy transactions.
    pub witness_size: usize,
    /// Serialized size with witness data.
    pub total_size: usize,
    pub weight: usize,
    pub vsize: usize,
}

impl TxSize {
    /// Aggregate already-estimated inputs with the given outputs.
    pub fn from_parts(inputs: &[InputSize], outputs: &[TxOut]) -> Self {
        let mut base_size = TX_HEADER_SIZE
            + length_of_varint(inputs.len() as u64)
            + length_of_varint(outputs.len() as u64);
        base_size += inputs.iter().map(InputSize::base_size).sum::<usize>();
        base_size += outputs
            .iter()
            .map(|out| output_size(out.script_pubkey.len()))
            .sum::<usize>();

        let witness_size = if inputs.iter().any(InputSize::has_witness) {
            // Inputs without a witness still serialize an empty item count.
            WITNESS_MARKER_SIZE
                + inputs
                    .iter()
                    .map(|input| input.witness.max(1))
                    .sum::<usize>()
        } else {
            0
        };

        let total_size = base_size + witness_size;
        let weight = base_size * (WITNESS_SCALE_FACTOR - 1) + total_size;
        Self {
            base_size,
            witness_size,
            total_size,
            weight,
            vsize: weight.div_ceil(WITNESS_SCALE_FACTOR),
        }
    }
}

/// Bytes used by a CompactSize varint encoding `n`.
pub fn length_of_varint(n: u64) -> usize {
    if n <= 0xfc {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Bytes used by the push opcode (and length) of a `data_len`-byte push.
pub fn length_of_script_push_length(data_len: u64) -> usize {
    if data_len <= 75 {
        1
    } else if data_len <= 0xff {
        2
    } else if data_len <= 0xffff {
        3
    } else {
        5
    }
}

/// Serialized size of one output with a `script_len`-byte script.
pub fn output_size(script_len: usize) -> usize {
    OUTPUT_VALUE_SIZE + length_of_varint(script_len as u64) + script_len
}

/// Stack items satisfying an m-of-n multisig, and the script's own size.
///
/// Item 0 is the empty `OP_0` dummy consumed by `OP_CHECKMULTISIG`.
pub fn estimate_multisig_stack_size(info: &MultisigInfo) -> (Vec<usize>, usize) {
    let mut stack = Vec::with_capacity(1 + info.required);
    stack.push(0);
    stack.extend(std::iter::repeat_n(MAX_DER_SIGNATURE_SIZE, info.required));
    (stack, info.script_size())
}

/// Signature and public key items of a pay-to-pubkey-hash spend.
pub fn p2pkh_stack() -> Vec<usize> {
    vec![MAX_DER_SIGNATURE_SIZE, COMPRESSED_PUBKEY_SIZE]
}

/// Convert a stack of item sizes into scriptSig and witness sizes.
///
/// Without witness the items are pushed in the scriptSig. With witness they
/// move to the witness, followed by `witness_script` as its own item. A
/// `redeem_script` is always the final scriptSig push.
pub fn estimate_size_for_stack(
    stack: &[usize],
    is_witness: bool,
    redeem_script: Option<&[u8]>,
    witness_script: Option<&[u8]>,
) -> Result<InputSize, EstimateError> {
    if witness_script.is_some() && !is_witness {
        return Err(EstimateError::WitnessScriptWithoutWitness);
    }

    let (mut script_sig_items, mut witness_items) = if is_witness {
        (Vec::new(), stack.to_vec())
    } else {
        (stack.to_vec(), Vec::new())
    };
    if let Some(ws) = witness_script {
        witness_items.push(ws.len());
    }
    if let Some(rs) = redeem_script {
        script_sig_items.push(rs.len());
    }

    let pushes: usize = script_sig_items
        .iter()
        .map(|&len| length_of_script_push_length(len as u64) + len)
        .sum();
    let script_sig = length_of_varint(pushes as u64) + pushes;

    let witness = if witness_items.is_empty() {
        0
    } else {
        length_of_varint(witness_items.len() as u64)
            + witness_items
                .iter()
                .map(|&len| length_of_varint(len as u64) + len)
                .sum::<usize>()
    };

    Ok(InputSize { script_sig, witness })
}

/// Stack needed to satisfy `script` and whether it is a witness program.
fn signing_stack(script: &[u8]) -> Result<(Vec<usize>, bool), EstimateError> {
    match classify_script(script) {
        ScriptType::P2pkh => Ok((p2pkh_stack(), false)),
        ScriptType::P2wpkh => Ok((p2pkh_stack(), true)),
        ScriptType::P2pk => Ok((vec![MAX_DER_SIGNATURE_SIZE], false)),
        ScriptType::Multisig => {
            let info = MultisigInfo::parse(script)
                .ok_or_else(|| EstimateError::InvalidMultisig("unparseable".into()))?;
            Ok((estimate_multisig_stack_size(&info).0, false))
        }
        other => Err(EstimateError::UnsupportedScript(other)),
    }
}

fn expect_output(utxo: &Utxo, expected: ScriptType) -> Result<(), EstimateError> {
    let actual = classify_script(&utxo.script_pubkey);
    if actual != expected {
        return Err(EstimateError::ShapeMismatch(format!(
            "{:?} spend of a {actual:?} output at {}",
            utxo.shape(),
            utxo.outpoint
        )));
    }
    Ok(())
}

/// Unlocking data size for spending `utxo`.
pub fn estimate_utxo(utxo: &Utxo) -> Result<InputSize, EstimateError> {
    match (utxo.shape(), &utxo.redeem_script, &utxo.witness_script) {
        (SpendShape::Bare, _, _) => {
            let output_type = classify_script(&utxo.script_pubkey);
            if matches!(output_type, ScriptType::P2sh | ScriptType::P2wsh) {
                return Err(EstimateError::ShapeMismatch(format!(
                    "{output_type:?} output at {} without its script",
                    utxo.outpoint
                )));
            }
            let (stack, is_witness) = signing_stack(&utxo.script_pubkey)?;
            estimate_size_for_stack(&stack, is_witness, None, None)
        }
        (SpendShape::P2sh, Some(redeem), None) => {
            expect_output(utxo, ScriptType::P2sh)?;
            if classify_script(redeem) == ScriptType::P2wsh {
                return Err(EstimateError::ShapeMismatch(format!(
                    "P2WSH redeem script without witness script at {}",
                    utxo.outpoint
                )));
            }
            let (stack, is_witness) = signing_stack(redeem)?;
            estimate_size_for_stack(&stack, is_witness, Some(redeem), None)
        }
        (SpendShape::P2wsh, None, Some(witness_script)) => {
            expect_output(utxo, ScriptType::P2wsh)?;
            let stack = inner_witness_stack(witness_script)?;
            estimate_size_for_stack(&stack, true, None, Some(witness_script))
        }
        (SpendShape::P2shP2wsh, Some(redeem), Some(witness_script)) => {
            expect_output(utxo, ScriptType::P2sh)?;
            if classify_script(redeem) != ScriptType::P2wsh {
                return Err(EstimateError::ShapeMismatch(format!(
                    "redeem script at {} is not a P2WSH program",
                    utxo.outpoint
                )));
            }
            let stack = inner_witness_stack(witness_script)?;
            estimate_size_for_stack(&stack, true, Some(redeem), Some(witness_script))
        }
        (shape, _, _) => Err(EstimateError::ShapeMismatch(format!("{shape:?}"))),
    }
}

fn inner_witness_stack(witness_script: &[u8]) -> Result<Vec<usize>, EstimateError> {
    match signing_stack(witness_script)? {
        (stack, false) => Ok(stack),
        (_, true) => Err(EstimateError::ShapeMismatch(
            "witness program nested inside a witness script".into(),
        )),
    }
}

/// Size, weight and vsize of a transaction spending `utxos` into `outputs`.
pub fn estimate_vsize(utxos: &[Utxo], outputs: &[TxOut]) -> Result<TxSize, EstimateError> {
    let inputs = utxos
        .iter()
        .map(estimate_utxo)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TxSize::from_parts(&inputs, outputs))
}
