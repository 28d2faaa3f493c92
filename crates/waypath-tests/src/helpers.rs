//! Shared test helpers for integration and property tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};
use std::time::Duration;

use waypath_core::error::SourceError;
use waypath_core::script::p2pkh_script;
use waypath_core::traits::UtxoSource;
use waypath_core::types::{OutPoint, Page, Txid, UnspentOutput, Utxo};
use waypath_wallet::derive::DerivedAddress;
use waypath_wallet::fee::StaticFeeRates;
use waypath_wallet::retry::Sleeper;

/// The all-`abandon` BIP39 test phrase.
pub const PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
                          abandon abandon abandon abandon abandon about";

static TRACING: Once = Once::new();

/// Install a test subscriber once, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// 10 sat/vB for `optimal` and `base_fee`, 1 sat/vB for `low_priority`.
pub fn flat_rates() -> StaticFeeRates {
    StaticFeeRates {
        base_fee: 10_000,
        optimal: 10_000,
        low_priority: 1_000,
    }
}

/// P2PKH UTXO with a txid filled with `seed`.
pub fn p2pkh_utxo(seed: u8, value: u64) -> Utxo {
    Utxo::new(
        OutPoint {
            txid: Txid([seed; 32]),
            index: 0,
        },
        value,
        p2pkh_script(&[seed; 20]),
    )
}

/// In-memory UTXO source with failure injection and a call log.
#[derive(Default)]
pub struct MockUtxoSource {
    outputs: HashMap<String, Vec<UnspentOutput>>,
    failures: Mutex<VecDeque<SourceError>>,
    calls: Mutex<Vec<(usize, usize)>>,
    next_txid: u64,
}

impl MockUtxoSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pay `value` to `derived`.
    pub fn fund(&mut self, derived: &DerivedAddress, value: u64) {
        self.next_txid += 1;
        let list = self.outputs.entry(derived.address.clone()).or_default();
        list.push(UnspentOutput {
            address: derived.address.clone(),
            hash: format!("{:064x}", self.next_txid),
            index: list.len() as u32,
            value,
            script_hex: hex::encode(&derived.script_pubkey),
        });
    }

    /// Fail the next calls with `errors`, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = SourceError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// `(batch length, page)` of every successful call.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UtxoSource for MockUtxoSource {
    fn batch_unspent_outputs(
        &self,
        addresses: &[String],
        page: usize,
        per_page: usize,
    ) -> Result<Page<UnspentOutput>, SourceError> {
        if let Some(e) = self.failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.calls.lock().unwrap().push((addresses.len(), page));
        let all: Vec<UnspentOutput> = addresses
            .iter()
            .filter_map(|a| self.outputs.get(a))
            .flatten()
            .cloned()
            .collect();
        let total = all.len();
        let data = all
            .into_iter()
            .skip(page.saturating_sub(1) * per_page)
            .take(per_page)
            .collect();
        Ok(Page {
            data,
            current_page: page,
            per_page,
            total,
        })
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) {
        self.sleeps.lock().unwrap().push(delay);
    }
}
