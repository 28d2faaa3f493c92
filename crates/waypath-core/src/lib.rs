//! # waypath-core
//! Foundation types, path algebra, script templates, and worst-case size
//! estimation for the Waypath wallet.

pub mod constants;
pub mod error;
pub mod path;
pub mod script;
pub mod size;
pub mod traits;
pub mod types;

pub use constants::Network;
pub use error::{CodecError, EstimateError, PathError, SourceError};
pub use path::{AccountPath, DerivationPath, Level, Root};
pub use script::{MultisigInfo, ScriptType};
pub use size::{InputSize, TxSize};
pub use traits::{FeeRateSource, ScriptCodec, UtxoSource};
pub use types::{FeeStrategy, OutPoint, Page, SpendShape, TxOut, Txid, UnspentOutput, Utxo};
