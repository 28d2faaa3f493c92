//! Wallet composition: key tree, address chains, discovery, and spending.
//!
//! The [`Wallet`] ties one account's address derivation to the fund scanner
//! and the transaction builder, and hands out the private keys an external
//! signer needs for a built transaction.

use std::sync::Arc;

use bitcoin::bip32::Xpriv;
use tracing::info;

use waypath_core::constants::Network;
use waypath_core::path::AccountPath;
use waypath_core::traits::{FeeRateSource, UtxoSource};
use waypath_core::types::Utxo;

use crate::builder::{TransactionBuilder, UnsignedTransaction};
use crate::codec::BitcoinCodec;
use crate::config::WalletConfig;
use crate::derive::{AddressDeriver, DerivedAddress, SingleKeyDeriver};
use crate::discovery::{DiscoveryResult, FundScanner};
use crate::error::WalletError;
use crate::keys::{KeyNode, Seed};
use crate::mnemonic::mnemonic_to_seed;
use crate::retry::{Retrier, Sleeper};

/// HD wallet over one BIP44 account.
pub struct Wallet {
    config: WalletConfig,
    deriver: SingleKeyDeriver,
    account: AccountPath,
    codec: Arc<BitcoinCodec>,
    /// Next unissued index on the external chain.
    next_external: u32,
    /// Next unissued index on the internal (change) chain.
    next_internal: u32,
}

impl Wallet {
    pub fn from_seed(seed: &Seed, config: WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let root = KeyNode::master(seed, config.network)?;
        let codec = Arc::new(BitcoinCodec::new(config.network));
        let deriver = SingleKeyDeriver::new(root, config.address_kind, codec.clone())?;
        let account = AccountPath::for_network(config.network, config.account)?;
        Ok(Self {
            config,
            deriver,
            account,
            codec,
            next_external: 0,
            next_internal: 0,
        })
    }

    /// Restore from a BIP39 phrase.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        let seed = mnemonic_to_seed(phrase, passphrase)?;
        Self::from_seed(&seed, config)
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn account(&self) -> AccountPath {
        self.account
    }

    pub fn codec(&self) -> Arc<BitcoinCodec> {
        self.codec.clone()
    }

    /// Address at `index` on the external or internal chain.
    pub fn address_at(&mut self, external: bool, index: u32) -> Result<DerivedAddress, WalletError> {
        let path = self.account.external(external).with_index(index)?.path();
        self.deriver.derive_address(&path)
    }

    /// Issue the next receiving address.
    pub fn next_address(&mut self) -> Result<DerivedAddress, WalletError> {
        let address = self.address_at(true, self.next_external)?;
        self.next_external += 1;
        Ok(address)
    }

    /// Issue the next change address.
    pub fn change_address(&mut self) -> Result<DerivedAddress, WalletError> {
        let address = self.address_at(false, self.next_internal)?;
        self.next_internal += 1;
        Ok(address)
    }

    /// Next indices to be issued, external then internal.
    pub fn next_indices(&self) -> (u32, u32) {
        (self.next_external, self.next_internal)
    }

    /// Scan the account for funds, then resume issuing after the highest
    /// funded index of each chain.
    pub fn discover(
        &mut self,
        source: Arc<dyn UtxoSource>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<DiscoveryResult, WalletError> {
        let retrier = Retrier::new(self.config.retry_policy(), sleeper);
        let result = {
            let mut scanner = FundScanner::new(
                &mut self.deriver,
                source,
                retrier,
                self.account,
                self.config.scan_options(),
            )?;
            scanner.discover_default()?
        };
        self.resume_after(&result);
        Ok(result)
    }

    /// Move both chain cursors past the highest funded indices in `result`.
    pub fn resume_after(&mut self, result: &DiscoveryResult) {
        if let Some(highest) = result.highest_external {
            self.next_external = self.next_external.max(highest.saturating_add(1));
        }
        if let Some(highest) = result.highest_internal {
            self.next_internal = self.next_internal.max(highest.saturating_add(1));
        }
    }

    /// First receiving address after everything `result` found funded.
    pub fn next_unused_address(
        &mut self,
        result: &DiscoveryResult,
    ) -> Result<DerivedAddress, WalletError> {
        self.resume_after(result);
        self.next_address()
    }

    /// A builder preset with this wallet's strategy, dust threshold, and
    /// input cap.
    pub fn builder(&self, fees: Arc<dyn FeeRateSource>) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new(self.codec.clone(), fees);
        builder
            .set_fee_strategy(self.config.fee_strategy)
            .set_dust_threshold(self.config.dust_threshold)
            .set_max_inputs(self.config.max_inputs);
        builder
    }

    /// Build a payment to `recipients`, sending change to the next internal
    /// address. The change cursor only advances when change is created.
    pub fn send(
        &mut self,
        utxos: &[Utxo],
        recipients: &[(&str, u64)],
        fees: Arc<dyn FeeRateSource>,
    ) -> Result<UnsignedTransaction, WalletError> {
        let change = self.address_at(false, self.next_internal)?;
        let mut builder = self.builder(fees);
        for (address, value) in recipients {
            builder.add_output(address, *value)?;
        }
        builder.set_change_address(&change.address)?;
        let tx = builder.build(utxos)?;
        if tx.change_index.is_some() {
            self.next_internal += 1;
        }
        info!(
            recipients = recipients.len(),
            inputs = tx.inputs.len(),
            fee = tx.fee,
            change = tx.change().map_or(0, |c| c.value),
            "payment built"
        );
        Ok(tx)
    }

    /// Extended private keys for every input of `tx`, in input order.
    pub fn signing_keys(&mut self, tx: &UnsignedTransaction) -> Result<Vec<Xpriv>, WalletError> {
        let mut keys = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let path = input.path.as_ref().ok_or_else(|| {
                WalletError::KeyDerivation(format!("input {} has no derivation path", input.outpoint))
            })?;
            let node = self
                .deriver
                .root_mut()
                .derive_through_parent(&path.private_path())?;
            let xpriv = node.xpriv().copied().ok_or_else(|| {
                WalletError::KeyDerivation(format!("no private key at {path}"))
            })?;
            keys.push(xpriv);
        }
        Ok(keys)
    }
}
