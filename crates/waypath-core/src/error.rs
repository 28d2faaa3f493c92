//! Error types for the Waypath core.
use thiserror::Error;

use crate::script::ScriptType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty derivation path")] Empty,
    #[error("invalid root marker: {0}")] InvalidRoot(String),
    #[error("invalid path level: {0}")] InvalidLevel(String),
    #[error("level index out of range: {0}")] IndexOutOfRange(u64),
    #[error("path has no levels below the root")] NoLevels,
    #[error("insert offset {offset} beyond depth {depth}")] InsertOutOfBounds { offset: usize, depth: usize },
    #[error("not a BIP44 path: {0}")] NotBip44(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimateError {
    #[error("unsupported spending script: {0:?}")] UnsupportedScript(ScriptType),
    #[error("spending shape mismatch: {0}")] ShapeMismatch(String),
    #[error("witness script given for a non-witness spend")] WitnessScriptWithoutWitness,
    #[error("invalid multisig: {0}")] InvalidMultisig(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("rate limited: {0}")] RateLimited(String),
    #[error("connection failed: {0}")] Connection(String),
    #[error("request timed out")] Timeout,
    #[error("malformed response: {0}")] Malformed(String),
    #[error("unauthorized: {0}")] Unauthorized(String),
    #[error("not found: {0}")] NotFound(String),
}

impl SourceError {
    /// Whether a retry can be expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Connection(_) | Self::Timeout)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid address {address}: {reason}")] InvalidAddress { address: String, reason: String },
    #[error("address belongs to another network: {0}")] WrongNetwork(String),
    #[error("script has no address form: {0}")] NoAddressForm(String),
}
