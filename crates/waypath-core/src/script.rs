//! Output script templates and classification.
//!
//! Only the handful of standard templates a wallet spends or pays to are
//! recognized. Classification is a pure function of the script bytes.

use serde::{Deserialize, Serialize};

use crate::error::EstimateError;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Largest data push encodable with a single direct opcode.
const MAX_DIRECT_PUSH: usize = 75;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    P2pk,
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    Multisig,
    NullData,
    Unknown,
}

impl ScriptType {
    /// Native segregated witness program.
    pub fn is_witness(&self) -> bool {
        matches!(self, Self::P2wpkh | Self::P2wsh)
    }

    pub fn is_p2sh(&self) -> bool {
        matches!(self, Self::P2sh)
    }

    /// Name used by block explorers and backend APIs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::P2pk => "pubkey",
            Self::P2pkh => "pubkeyhash",
            Self::P2sh => "scripthash",
            Self::P2wpkh => "witness_v0_keyhash",
            Self::P2wsh => "witness_v0_scripthash",
            Self::Multisig => "multisig",
            Self::NullData => "nulldata",
            Self::Unknown => "nonstandard",
        }
    }

    /// Inverse of [`ScriptType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "pubkey" => Self::P2pk,
            "pubkeyhash" => Self::P2pkh,
            "scripthash" => Self::P2sh,
            "witness_v0_keyhash" => Self::P2wpkh,
            "witness_v0_scripthash" => Self::P2wsh,
            "multisig" => Self::Multisig,
            "nulldata" => Self::NullData,
            "nonstandard" => Self::Unknown,
            _ => return None,
        })
    }
}

pub fn classify_script(script: &[u8]) -> ScriptType {
    if is_p2pkh(script) {
        ScriptType::P2pkh
    } else if is_p2sh(script) {
        ScriptType::P2sh
    } else if is_p2wpkh(script) {
        ScriptType::P2wpkh
    } else if is_p2wsh(script) {
        ScriptType::P2wsh
    } else if is_p2pk(script) {
        ScriptType::P2pk
    } else if script.first() == Some(&OP_RETURN) {
        ScriptType::NullData
    } else if MultisigInfo::parse(script).is_some() {
        ScriptType::Multisig
    } else {
        ScriptType::Unknown
    }
}

fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 0x14
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
}

fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == 0x14 && script[22] == OP_EQUAL
}

fn is_p2wpkh(script: &[u8]) -> bool {
    script.len() == 22 && script[0] == OP_0 && script[1] == 0x14
}

fn is_p2wsh(script: &[u8]) -> bool {
    script.len() == 34 && script[0] == OP_0 && script[1] == 0x20
}

fn is_p2pk(script: &[u8]) -> bool {
    let key_len = match script.first().copied() {
        Some(len @ 33) => len,
        Some(len @ 65) => len,
        _ => return false,
    };

    let expected_len = key_len as usize + 2;
    script.len() == expected_len && script[script.len() - 1] == OP_CHECKSIG
}

/// Shape of an `OP_m <keys> OP_n OP_CHECKMULTISIG` script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigInfo {
    /// Signatures required (m).
    pub required: usize,
    /// Serialized length of each public key, in script order.
    pub key_sizes: Vec<usize>,
}

impl MultisigInfo {
    /// `required`-of-`keys` over compressed keys.
    pub fn compressed(required: usize, keys: usize) -> Result<Self, EstimateError> {
        let info = Self {
            required,
            key_sizes: vec![crate::constants::COMPRESSED_PUBKEY_SIZE; keys],
        };
        info.validate()?;
        Ok(info)
    }

    pub fn total(&self) -> usize {
        self.key_sizes.len()
    }

    /// Serialized size of the multisig script itself.
    pub fn script_size(&self) -> usize {
        let keys: usize = self.key_sizes.iter().map(|len| 1 + len).sum();
        1 + keys + 1 + 1
    }

    pub fn parse(script: &[u8]) -> Option<Self> {
        let (&op_m, rest) = script.split_first()?;
        let (&op_check, rest) = rest.split_last()?;
        let (&op_n, mut keys) = rest.split_last()?;
        if op_check != OP_CHECKMULTISIG {
            return None;
        }
        let required = small_int(op_m)?;
        let total = small_int(op_n)?;

        let mut key_sizes = Vec::with_capacity(total);
        while let Some((&len, tail)) = keys.split_first() {
            let len = len as usize;
            if !(len == 33 || len == 65) || tail.len() < len {
                return None;
            }
            key_sizes.push(len);
            keys = &tail[len..];
        }

        let info = Self { required, key_sizes };
        (info.total() == total && info.validate().is_ok()).then_some(info)
    }

    fn validate(&self) -> Result<(), EstimateError> {
        let n = self.total();
        if self.required == 0 || n == 0 || n > 16 || self.required > n {
            return Err(EstimateError::InvalidMultisig(format!(
                "{}-of-{}",
                self.required, n
            )));
        }
        Ok(())
    }
}

fn small_int(op: u8) -> Option<usize> {
    (OP_1..=OP_16)
        .contains(&op)
        .then(|| (op - OP_1 + 1) as usize)
}

/// Append a minimal data push to `script`.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len <= MAX_DIRECT_PUSH {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh_script(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, 0x14]);
    script.extend_from_slice(script_hash);
    script.push(OP_EQUAL);
    script
}

pub fn p2wpkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.extend_from_slice(&[OP_0, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script
}

pub fn p2wsh_script(script_hash: &[u8; 32]) -> Vec<u8> {
    let mut script = Vec::with_capacity(34);
    script.extend_from_slice(&[OP_0, 0x20]);
    script.extend_from_slice(script_hash);
    script
}

pub fn p2pk_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(pubkey.len() + 2);
    push_data(&mut script, pubkey);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_m <keys...> OP_n OP_CHECKMULTISIG` with keys sorted lexicographically.
pub fn multisig_script(required: usize, pubkeys: &[Vec<u8>]) -> Result<Vec<u8>, EstimateError> {
    let info = MultisigInfo {
        required,
        key_sizes: pubkeys.iter().map(Vec::len).collect(),
    };
    info.validate()?;
    if let Some(bad) = pubkeys.iter().find(|k| !(k.len() == 33 || k.len() == 65)) {
        return Err(EstimateError::InvalidMultisig(format!(
            "public key of {} bytes",
            bad.len()
        )));
    }

    let mut sorted: Vec<&Vec<u8>> = pubkeys.iter().collect();
    sorted.sort();

    let mut script = Vec::with_capacity(info.script_size());
    script.push(OP_1 + required as u8 - 1);
    for key in sorted {
        push_data(&mut script, key);
    }
    script.push(OP_1 + pubkeys.len() as u8 - 1);
    script.push(OP_CHECKMULTISIG);
    Ok(script)
}

/// `OP_RETURN <data>`; standardness is checked by the caller.
pub fn op_return_script(data: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(data.len() + 6);
    script.push(OP_RETURN);
    push_data(&mut script, data);
    script
}
