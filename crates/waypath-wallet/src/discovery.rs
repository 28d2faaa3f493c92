//! Gap-limited wallet fund discovery.
//!
//! Walks the external and internal chains of one BIP44 account in windows
//! of `increment` consecutive addresses. Each window is looked up in batches
//! of at most 500 addresses, page by page, with transient data source
//! failures retried. A chain ends at the first window in which no address
//! holds funds.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use waypath_core::constants::{HARDENED_OFFSET, MAX_BATCH_ADDRESSES};
use waypath_core::error::{PathError, SourceError};
use waypath_core::path::{AccountPath, DerivationPath};
use waypath_core::traits::UtxoSource;
use waypath_core::types::{OutPoint, Txid, UnspentOutput, Utxo};

use crate::derive::{AddressDeriver, DerivedAddress};
use crate::error::WalletError;
use crate::retry::Retrier;

/// Default gap window.
pub const DEFAULT_INCREMENT: u32 = 200;

pub const DEFAULT_PER_PAGE: usize = 500;

/// Window and request sizing for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Consecutive addresses per gap window.
    pub increment: u32,
    /// Addresses per data source request, at most 500.
    pub batch_size: usize,
    /// Items per result page.
    pub per_page: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            increment: DEFAULT_INCREMENT,
            batch_size: MAX_BATCH_ADDRESSES,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

fn check_increment(increment: u32) -> Result<(), WalletError> {
    if increment == 0 || increment > HARDENED_OFFSET {
        return Err(WalletError::Config(format!(
            "increment must be 1..={HARDENED_OFFSET}, got {increment}"
        )));
    }
    Ok(())
}

impl ScanOptions {
    pub fn validate(&self) -> Result<(), WalletError> {
        check_increment(self.increment)?;
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_ADDRESSES {
            return Err(WalletError::Config(format!(
                "batch_size must be 1..={MAX_BATCH_ADDRESSES}, got {}",
                self.batch_size
            )));
        }
        if self.per_page == 0 {
            return Err(WalletError::Config("per_page must be positive".into()));
        }
        Ok(())
    }
}

/// One unspent output found at a scanned address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FundedOutput {
    /// Transaction id, hex.
    pub hash: String,
    pub index: u32,
    pub value: u64,
    /// Output script, hex.
    pub script_hex: String,
}

impl From<UnspentOutput> for FundedOutput {
    fn from(u: UnspentOutput) -> Self {
        Self {
            hash: u.hash,
            index: u.index,
            value: u.value,
            script_hex: u.script_hex,
        }
    }
}

/// Funds held by one address and what is needed to spend them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddressFunds {
    pub path: DerivationPath,
    #[serde(default, with = "hex_opt")]
    pub redeem_script: Option<Vec<u8>>,
    #[serde(default, with = "hex_opt")]
    pub witness_script: Option<Vec<u8>>,
    pub utxos: Vec<FundedOutput>,
}

impl AddressFunds {
    fn new(derived: &DerivedAddress) -> Self {
        Self {
            path: derived.path.clone(),
            redeem_script: derived.redeem_script.clone(),
            witness_script: derived.witness_script.clone(),
            utxos: Vec::new(),
        }
    }

    pub fn balance(&self) -> u64 {
        self.utxos.iter().map(|u| u.value).sum()
    }
}

/// Everything a scan found.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryResult {
    /// Funded addresses only.
    pub funds: BTreeMap<String, AddressFunds>,
    pub addresses_searched: usize,
    /// Highest funded address index on the external chain.
    pub highest_external: Option<u32>,
    /// Highest funded address index on the internal (change) chain.
    pub highest_internal: Option<u32>,
}

impl DiscoveryResult {
    /// Number of unspent outputs found.
    pub fn count(&self) -> usize {
        self.funds.values().map(|f| f.utxos.len()).sum()
    }

    pub fn balance(&self) -> u64 {
        self.funds.values().map(AddressFunds::balance).sum()
    }

    /// Flatten into spendable UTXOs carrying path and scripts.
    pub fn to_utxos(&self) -> Result<Vec<Utxo>, WalletError> {
        let mut utxos = Vec::with_capacity(self.count());
        for (address, funds) in &self.funds {
            for out in &funds.utxos {
                let txid = Txid::from_str(&out.hash).map_err(|e| {
                    SourceError::Malformed(format!("txid {}: {e}", out.hash))
                })?;
                let script = hex::decode(&out.script_hex).map_err(|e| {
                    SourceError::Malformed(format!("script {}: {e}", out.script_hex))
                })?;
                let mut utxo = Utxo::new(
                    OutPoint {
                        txid,
                        index: out.index,
                    },
                    out.value,
                    script,
                )
                .with_address(address)
                .with_path(funds.path.clone());
                utxo.redeem_script = funds.redeem_script.clone();
                utxo.witness_script = funds.witness_script.clone();
                utxos.push(utxo);
            }
        }
        Ok(utxos)
    }
}

/// Scans one account for funded addresses.
pub struct FundScanner<D: AddressDeriver> {
    deriver: D,
    source: Arc<dyn UtxoSource>,
    retrier: Retrier,
    account: AccountPath,
    options: ScanOptions,
}

impl<D: AddressDeriver> FundScanner<D> {
    pub fn new(
        deriver: D,
        source: Arc<dyn UtxoSource>,
        retrier: Retrier,
        account: AccountPath,
        options: ScanOptions,
    ) -> Result<Self, WalletError> {
        options.validate()?;
        Ok(Self {
            deriver,
            source,
            retrier,
            account,
            options,
        })
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Scan with the configured gap window.
    pub fn discover_default(&mut self) -> Result<DiscoveryResult, WalletError> {
        self.discover(self.options.increment)
    }

    /// Scan both chains with gap windows of `increment` addresses.
    pub fn discover(&mut self, increment: u32) -> Result<DiscoveryResult, WalletError> {
        check_increment(increment)?;
        let mut result = DiscoveryResult::default();
        for external in [true, false] {
            let highest = self.scan_chain(external, increment, &mut result)?;
            if external {
                result.highest_external = highest;
            } else {
                result.highest_internal = highest;
            }
        }
        info!(
            account = %self.account.account_root(),
            searched = result.addresses_searched,
            addresses = result.funds.len(),
            utxos = result.count(),
            balance = result.balance(),
            "discovery finished"
        );
        Ok(result)
    }

    fn scan_chain(
        &mut self,
        external: bool,
        increment: u32,
        result: &mut DiscoveryResult,
    ) -> Result<Option<u32>, WalletError> {
        let chain = self.account.external(external);
        let mut highest = None;
        let mut start: u32 = 0;
        loop {
            let end = start
                .checked_add(increment)
                .ok_or(PathError::IndexOutOfRange(start as u64 + increment as u64))?;

            let mut funded = 0usize;
            let mut batch_start = start;
            while batch_start < end {
                let batch_end = end.min(batch_start.saturating_add(self.options.batch_size as u32));
                let mut batch: HashMap<String, (u32, DerivedAddress)> = HashMap::new();
                let mut addresses = Vec::new();
                for index in batch_start..batch_end {
                    let path = chain.with_index(index)?.path();
                    let derived = self.deriver.derive_address(&path)?;
                    addresses.push(derived.address.clone());
                    batch.insert(derived.address.clone(), (index, derived));
                }

                let found = self.get_utxos(&addresses)?;
                result.addresses_searched += addresses.len();

                for (address, outputs) in found {
                    let Some((index, derived)) = batch.get(&address) else {
                        continue;
                    };
                    let funds = result.funds.entry(address).or_insert_with(|| {
                        funded += 1;
                        AddressFunds::new(derived)
                    });
                    funds.utxos.extend(outputs);
                    highest = highest.max(Some(*index));
                }
                batch_start = batch_end;
            }

            info!(
                chain = chain.chain(),
                start,
                end,
                funded,
                "scanned window"
            );
            if funded == 0 {
                return Ok(highest);
            }
            start = end;
        }
    }

    /// Unspent outputs of `addresses`, grouped by address.
    ///
    /// Requests carry at most `batch_size` addresses each and follow
    /// pagination to the last page. Addresses without outputs are absent
    /// from the map.
    pub fn get_utxos(
        &mut self,
        addresses: &[String],
    ) -> Result<BTreeMap<String, Vec<FundedOutput>>, WalletError> {
        let per_page = self.options.per_page;
        let mut grouped: BTreeMap<String, Vec<FundedOutput>> = BTreeMap::new();
        for batch in addresses.chunks(self.options.batch_size) {
            let requested: HashSet<&str> = batch.iter().map(String::as_str).collect();
            let mut page = 1;
            loop {
                let source = &self.source;
                let listing = self.retrier.call("batch_unspent_outputs", || {
                    source.batch_unspent_outputs(batch, page, per_page)
                })?;
                debug!(
                    batch = batch.len(),
                    page,
                    items = listing.data.len(),
                    total = listing.total,
                    "fetched unspent page"
                );
                let more = listing.has_more();
                for output in listing.data {
                    if !requested.contains(output.address.as_str()) {
                        warn!(address = %output.address, "unspent output for an address not requested");
                        continue;
                    }
                    grouped
                        .entry(output.address.clone())
                        .or_default()
                        .push(output.into());
                }
                if !more {
                    break;
                }
                page += 1;
            }
        }
        Ok(grouped)
    }
}

/// Optional byte strings as optional hex strings.
mod hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use waypath_core::types::Page;

    use crate::retry::{RetryPolicy, Sleeper};

    // ------------------------------------------------------------------
    // Mock: UtxoSource with failure injection
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockSource {
        outputs: HashMap<String, Vec<UnspentOutput>>,
        failures: Mutex<VecDeque<SourceError>>,
        /// (batch length, page) per successful call.
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl MockSource {
        fn fund(&mut self, address: &str, values: &[u64]) {
            let list = self.outputs.entry(address.to_string()).or_default();
            for &value in values {
                let n = list.len() as u32;
                list.push(UnspentOutput {
                    address: address.to_string(),
                    hash: format!("{:064x}", value * 1000 + n as u64),
                    index: n,
                    value,
                    script_hex: "76a914".to_string() + &"11".repeat(20) + "88ac",
                });
            }
        }

        fn fail_next(&self, errors: Vec<SourceError>) {
            self.failures.lock().unwrap().extend(errors);
        }
    }

    impl UtxoSource for MockSource {
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
                .skip((page - 1) * per_page)
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

    /// Address is the path string itself.
    struct PathDeriver;

    impl AddressDeriver for PathDeriver {
        fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
            Ok(DerivedAddress {
                path: path.clone(),
                address: path.to_string(),
                script_pubkey: vec![],
                redeem_script: None,
                witness_script: None,
            })
        }
    }

    #[derive(Default)]
    struct CountingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for CountingSleeper {
        fn sleep(&self, delay: Duration) {
            self.sleeps.lock().unwrap().push(delay);
        }
    }

    fn addr(chain: u32, index: u32) -> String {
        format!("m/44'/0'/0'/{chain}/{index}")
    }

    fn scanner(
        source: Arc<MockSource>,
        options: ScanOptions,
        limit: u32,
    ) -> (FundScanner<PathDeriver>, Arc<CountingSleeper>) {
        let sleeper = Arc::new(CountingSleeper::default());
        let retrier = Retrier::new(
            RetryPolicy {
                limit,
                delay: Duration::from_millis(10),
            },
            sleeper.clone(),
        );
        let account = AccountPath::new(0, 0).unwrap();
        let scanner = FundScanner::new(PathDeriver, source, retrier, account, options).unwrap();
        (scanner, sleeper)
    }

    fn options(increment: u32) -> ScanOptions {
        ScanOptions {
            increment,
            ..ScanOptions::default()
        }
    }

    #[test]
    fn options_validation() {
        assert!(ScanOptions::default().validate().is_ok());
        assert!(options(0).validate().is_err());
        let mut o = ScanOptions::default();
        o.batch_size = 501;
        assert!(o.validate().is_err());
        o.batch_size = 0;
        assert!(o.validate().is_err());
        let o = ScanOptions {
            per_page: 0,
            ..ScanOptions::default()
        };
        assert!(o.validate().is_err());
        assert!(options(HARDENED_OFFSET).validate().is_ok());
        assert!(options(HARDENED_OFFSET + 1).validate().is_err());
        assert!(options(u32::MAX).validate().is_err());
    }

    #[test]
    fn oversized_increment_rejected_before_deriving() {
        let source = Arc::new(MockSource::default());
        let (mut s, _) = scanner(source.clone(), options(5), 5);
        assert!(matches!(s.discover(1 << 31 | 1), Err(WalletError::Config(_))));
        assert!(matches!(s.discover(u32::MAX), Err(WalletError::Config(_))));
        assert!(source.calls.lock().unwrap().is_empty());

        let retrier = Retrier::new(RetryPolicy::default(), Arc::new(CountingSleeper::default()));
        assert!(matches!(
            FundScanner::new(
                PathDeriver,
                source,
                retrier,
                AccountPath::new(0, 0).unwrap(),
                options(u32::MAX),
            ),
            Err(WalletError::Config(_))
        ));
    }

    #[derive(Default)]
    struct CountingDeriver {
        derived: usize,
    }

    impl AddressDeriver for CountingDeriver {
        fn derive_address(&mut self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
            self.derived += 1;
            PathDeriver.derive_address(path)
        }
    }

    #[test]
    fn windows_are_derived_one_batch_at_a_time() {
        let source = Arc::new(MockSource::default());
        source.fail_next(vec![SourceError::Unauthorized("key".into())]);
        let mut deriver = CountingDeriver::default();
        {
            let retrier =
                Retrier::new(RetryPolicy::default(), Arc::new(CountingSleeper::default()));
            let mut s = FundScanner::new(
                &mut deriver,
                source,
                retrier,
                AccountPath::new(0, 0).unwrap(),
                options(1_200),
            )
            .unwrap();
            assert!(s.discover_default().is_err());
        }
        assert_eq!(deriver.derived, 500);
    }

    #[test]
    fn outputs_are_grouped_by_address() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 4), &[700, 800]);
        source.fund(&addr(0, 1), &[100]);
        source.fund(&addr(1, 9), &[999]);
        let source = Arc::new(source);
        let (mut s, _) = scanner(source.clone(), options(5), 5);

        let grouped = s
            .get_utxos(&[addr(0, 1), addr(0, 2), addr(0, 4)])
            .unwrap();
        assert_eq!(*source.calls.lock().unwrap(), vec![(3, 1)]);
        assert_eq!(
            grouped.keys().cloned().collect::<Vec<_>>(),
            vec![addr(0, 1), addr(0, 4)]
        );
        let values: Vec<u64> = grouped[&addr(0, 4)].iter().map(|u| u.value).collect();
        assert_eq!(values, vec![700, 800]);
        assert_eq!(grouped[&addr(0, 1)][0].value, 100);
    }

    /// Answers every request with the same stray output.
    struct StraySource;

    impl UtxoSource for StraySource {
        fn batch_unspent_outputs(
            &self,
            _addresses: &[String],
            page: usize,
            per_page: usize,
        ) -> Result<Page<UnspentOutput>, SourceError> {
            Ok(Page {
                data: vec![UnspentOutput {
                    address: "elsewhere".into(),
                    hash: "00".repeat(32),
                    index: 0,
                    value: 1_000,
                    script_hex: String::new(),
                }],
                current_page: page,
                per_page,
                total: 1,
            })
        }
    }

    #[test]
    fn outputs_for_unrequested_addresses_dropped() {
        let retrier = Retrier::new(RetryPolicy::default(), Arc::new(CountingSleeper::default()));
        let mut s = FundScanner::new(
            PathDeriver,
            Arc::new(StraySource),
            retrier,
            AccountPath::new(0, 0).unwrap(),
            options(5),
        )
        .unwrap();
        assert!(s.get_utxos(&[addr(0, 0)]).unwrap().is_empty());
        let result = s.discover_default().unwrap();
        assert_eq!(result.balance(), 0);
        assert_eq!(result.addresses_searched, 10);
    }

    #[test]
    fn walks_windows_until_one_is_empty() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 0), &[1_000]);
        source.fund(&addr(0, 3), &[2_000, 3_000]);
        source.fund(&addr(0, 7), &[4_000]);
        source.fund(&addr(1, 2), &[500]);
        let (mut s, _) = scanner(Arc::new(source), options(5), 5);

        let result = s.discover(5).unwrap();
        // External: 0..5, 5..10, 10..15. Internal: 0..5, 5..10.
        assert_eq!(result.addresses_searched, 25);
        assert_eq!(result.funds.len(), 4);
        assert_eq!(result.count(), 5);
        assert_eq!(result.balance(), 10_500);
        assert_eq!(result.highest_external, Some(7));
        assert_eq!(result.highest_internal, Some(2));

        let funds = &result.funds[&addr(0, 3)];
        assert_eq!(funds.path.to_string(), addr(0, 3));
        assert_eq!(funds.balance(), 5_000);
    }

    #[test]
    fn funds_past_the_gap_are_not_found() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 12), &[9_999]);
        let (mut s, _) = scanner(Arc::new(source), options(5), 5);

        let result = s.discover(5).unwrap();
        assert_eq!(result.addresses_searched, 10);
        assert_eq!(result.balance(), 0);
        assert_eq!(result.highest_external, None);
        assert!(result.funds.is_empty());
    }

    #[test]
    fn zero_increment_rejected() {
        let (mut s, _) = scanner(Arc::new(MockSource::default()), options(5), 5);
        assert!(matches!(s.discover(0), Err(WalletError::Config(_))));
    }

    #[test]
    fn requests_are_batched() {
        let source = Arc::new(MockSource::default());
        let (mut s, _) = scanner(
            source.clone(),
            ScanOptions {
                increment: 12,
                batch_size: 5,
                per_page: 500,
            },
            5,
        );
        s.discover_default().unwrap();
        // One empty window per chain, three batches each.
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![(5, 1), (5, 1), (2, 1), (5, 1), (5, 1), (2, 1)]
        );
    }

    #[test]
    fn follows_pagination() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 1), &[1, 2, 3, 4, 5]);
        let source = Arc::new(source);
        let (mut s, _) = scanner(
            source.clone(),
            ScanOptions {
                increment: 3,
                batch_size: 500,
                per_page: 2,
            },
            5,
        );
        let outputs = s.get_utxos(&[addr(0, 1), addr(0, 2)]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[&addr(0, 1)].len(), 5);
        assert_eq!(*source.calls.lock().unwrap(), vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn transient_failures_are_retried() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 0), &[1_000]);
        let source = Arc::new(source);
        source.fail_next(vec![
            SourceError::RateLimited("429".into()),
            SourceError::Timeout,
        ]);
        let (mut s, sleeper) = scanner(source, options(5), 3);

        let result = s.discover(5).unwrap();
        assert_eq!(result.balance(), 1_000);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn retry_limit_propagates_original_error() {
        let source = Arc::new(MockSource::default());
        source.fail_next(vec![
            SourceError::Connection("a".into()),
            SourceError::Connection("b".into()),
            SourceError::Connection("c".into()),
            SourceError::Connection("d".into()),
        ]);
        let (mut s, sleeper) = scanner(source, options(5), 3);

        let err = s.discover(5).unwrap_err();
        assert_eq!(err, WalletError::Source(SourceError::Connection("c".into())));
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let source = Arc::new(MockSource::default());
        source.fail_next(vec![SourceError::Unauthorized("api key".into())]);
        let (mut s, sleeper) = scanner(source, options(5), 5);

        let err = s.discover(5).unwrap_err();
        assert_eq!(
            err,
            WalletError::Source(SourceError::Unauthorized("api key".into()))
        );
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn result_flattens_into_utxos() {
        let mut source = MockSource::default();
        source.fund(&addr(0, 1), &[1_000, 2_000]);
        let (mut s, _) = scanner(Arc::new(source), options(5), 5);
        let result = s.discover(5).unwrap();

        let utxos = result.to_utxos().unwrap();
        assert_eq!(utxos.len(), 2);
        for utxo in &utxos {
            assert_eq!(utxo.address.as_deref(), Some(addr(0, 1).as_str()));
            assert_eq!(utxo.path.as_ref().unwrap().to_string(), addr(0, 1));
            assert_eq!(utxo.script_pubkey.len(), 25);
        }
    }

    #[test]
    fn result_serializes_paths_and_scripts_as_strings() {
        let mut result = DiscoveryResult::default();
        result.funds.insert(
            "addr".into(),
            AddressFunds {
                path: "m/44'/0'/0'/0/1".parse().unwrap(),
                redeem_script: Some(vec![0xab, 0xcd]),
                witness_script: None,
                utxos: vec![],
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["funds"]["addr"]["path"], "m/44'/0'/0'/0/1");
        assert_eq!(json["funds"]["addr"]["redeem_script"], "abcd");
        assert!(json["funds"]["addr"]["witness_script"].is_null());

        let back: DiscoveryResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn malformed_txid_surfaces_as_malformed() {
        let mut result = DiscoveryResult::default();
        result.funds.insert(
            "addr".into(),
            AddressFunds {
                path: DerivationPath::master(),
                redeem_script: None,
                witness_script: None,
                utxos: vec![FundedOutput {
                    hash: "xyz".into(),
                    index: 0,
                    value: 1,
                    script_hex: String::new(),
                }],
            },
        );
        assert!(matches!(
            result.to_utxos(),
            Err(WalletError::Source(SourceError::Malformed(_)))
        ));
    }
}
