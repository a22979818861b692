//! Error-code entry points for host bindings
//!
//! Hosts that cannot catch Rust errors or hold Rust references talk to the
//! wallet through [`WalletBoundary`]. Every call:
//!
//! - writes an [`ErrorCode`] out-parameter, zero on success, and returns a
//!   neutral value (zero, empty, `false`) on failure
//! - lends values out as typed [`Handle`]s that the host must destroy
//! - returns 64-bit numbers as 8-byte big-endian buffers and accepts amounts
//!   as decimal text
//!
//! Nothing here holds wallet logic; it only converts and forwards.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::codec::{
    self, parse_u64_text, private_key_from_hex, public_key_from_hex, tx_id_from_bytes, U64_BYTES,
};
use crate::data_structures::{
    Balance, Commitment, CommitmentSignature, CompletedTransaction, Contact, FeePerGramStat,
    OutputFeatures, PendingInboundTransaction, PendingOutboundTransaction, PowerMode, PublicKey,
    SeedWordPush, SeedWords, Transaction, TransactionKind, TxId, KEY_LENGTH,
};
use crate::errors::{WalletError, WalletResult};
use crate::events::{ExecutionContext, WalletEventListener};
use crate::lifecycle::UtxoImport;
use crate::network::WalletConnectivity;
use crate::storage::{Handle, HandleRegistry};
use crate::wallet::{Wallet, WalletBuilder, WalletConfig};

/// Byte buffer used for every 64-bit value returned to the host
pub type U64Bytes = [u8; U64_BYTES];

/// Out-parameter written by every boundary call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(i32);

impl ErrorCode {
    pub const OK: ErrorCode = ErrorCode(0);

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }
}

impl From<&WalletError> for ErrorCode {
    fn from(err: &WalletError) -> Self {
        ErrorCode(err.code())
    }
}

/// Record the outcome of `result` in `error_out`
fn report<T>(error_out: &mut ErrorCode, result: WalletResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            *error_out = ErrorCode::OK;
            Some(value)
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "Boundary call failed");
            *error_out = ErrorCode::from(&err);
            None
        }
    }
}

/// Wallet creation arguments as supplied by a host
pub struct CreateWalletArgs<'a> {
    /// JSON-encoded [`WalletConfig`]
    pub config_json: &'a str,
    pub log_path: Option<&'a str>,
    pub max_log_files: u32,
    pub max_log_file_bytes: u64,
    pub passphrase: Option<&'a str>,
    /// Seed words to restore from; `None` generates a new wallet
    pub seed_words: Option<SeedWords>,
    pub connectivity: Arc<dyn WalletConnectivity>,
    pub listener: Box<dyn WalletEventListener>,
    pub execution_context: Option<Arc<dyn ExecutionContext>>,
}

/// Wallet plus the handle tables for everything lent to the host
pub struct WalletBoundary {
    wallet: Arc<Wallet>,
    handles: Mutex<HandleRegistry>,
}

impl WalletBoundary {
    /// Build a wallet; `None` (a null wallet) on any failure
    pub fn create(args: CreateWalletArgs<'_>, error_out: &mut ErrorCode) -> Option<Self> {
        let result = (|| -> WalletResult<_> {
            let mut config = WalletConfig::from_json(args.config_json)?;
            if let Some(path) = args.log_path {
                config = config.with_log_path(path);
            }
            config = config.with_log_rotation(args.max_log_files, args.max_log_file_bytes);
            if let Some(passphrase) = args.passphrase {
                config = config.with_passphrase(passphrase);
            }
            config.validate()?;
            crate::logging::init_logging(&config.logging)?;

            let mut builder = WalletBuilder::new()
                .with_config(config)
                .with_connectivity(args.connectivity)
                .with_event_listener(args.listener);
            if let Some(context) = args.execution_context {
                builder = builder.with_execution_context(context);
            }
            if let Some(words) = args.seed_words {
                builder = builder.from_seed_words(words);
            }
            Ok(builder.build()?)
        })();
        report(error_out, result).map(Self::from_wallet)
    }

    pub fn from_wallet(wallet: Wallet) -> Self {
        Self {
            wallet: Arc::new(wallet),
            handles: Mutex::new(HandleRegistry::new()),
        }
    }

    /// Shared wallet, e.g. for the threads feeding it protocol events
    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    fn handles(&self) -> MutexGuard<'_, HandleRegistry> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handles the host has not destroyed yet
    pub fn live_handles(&self) -> usize {
        self.handles().live_handles()
    }

    // ---- public keys ----

    pub fn public_key_from_hex(&self, hex: &str, error_out: &mut ErrorCode) -> Option<Handle<PublicKey>> {
        report(error_out, public_key_from_hex(hex)).map(|key| self.handles().public_keys.insert(key))
    }

    pub fn public_key_to_hex(&self, key: Handle<PublicKey>, error_out: &mut ErrorCode) -> String {
        let result = self.handles().public_keys.get(key).map(PublicKey::to_hex);
        report(error_out, result).unwrap_or_default()
    }

    pub fn wallet_public_key(&self, error_out: &mut ErrorCode) -> Option<Handle<PublicKey>> {
        *error_out = ErrorCode::OK;
        Some(self.handles().public_keys.insert(self.wallet.public_key()))
    }

    pub fn destroy_public_key(&self, key: Handle<PublicKey>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().public_keys.destroy(key).map(drop));
    }

    fn public_key(&self, key: Handle<PublicKey>) -> WalletResult<PublicKey> {
        self.handles().public_keys.get(key).copied()
    }

    // ---- transactions ----

    pub fn send_transaction(
        &self,
        destination: Handle<PublicKey>,
        amount: &str,
        fee_per_gram: &str,
        message: &str,
        one_sided: bool,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = (|| -> WalletResult<_> {
            let destination = self.public_key(destination)?;
            self.wallet.send_transaction(
                destination,
                parse_u64_text(amount)?,
                parse_u64_text(fee_per_gram)?,
                message,
                one_sided,
            )
        })();
        report(error_out, result)
            .map(codec::tx_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn cancel_pending_transaction(&self, tx_id: &[u8], error_out: &mut ErrorCode) -> bool {
        let result = tx_id_from_bytes(tx_id).and_then(|id| self.wallet.cancel_pending_transaction(id));
        report(error_out, result).unwrap_or(false)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn import_utxo(
        &self,
        amount: &str,
        spending_key_hex: &str,
        source_public_key: Handle<PublicKey>,
        features: OutputFeatures,
        signature_nonce_hex: &str,
        signature_u_hex: &str,
        signature_v_hex: &str,
        sender_public_key: Handle<PublicKey>,
        script_private_key_hex: &str,
        message: &str,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = (|| -> WalletResult<_> {
            let import_error = |e: WalletError| WalletError::ImportError(e.to_string());
            let spending_key = private_key_from_hex(spending_key_hex).map_err(import_error)?;
            let script_private_key =
                private_key_from_hex(script_private_key_hex).map_err(import_error)?;
            let nonce = codec::fixed_bytes_from_hex::<KEY_LENGTH>(signature_nonce_hex)
                .and_then(|b| Commitment::from_bytes(&b))
                .map_err(import_error)?;
            let u = codec::fixed_bytes_from_hex::<KEY_LENGTH>(signature_u_hex).map_err(import_error)?;
            let v = codec::fixed_bytes_from_hex::<KEY_LENGTH>(signature_v_hex).map_err(import_error)?;
            let commitment_signature = CommitmentSignature::new(nonce, u, v);

            self.wallet.import_utxo(UtxoImport {
                amount: parse_u64_text(amount)?,
                spending_key: &spending_key,
                source_public_key: self.public_key(source_public_key)?,
                features,
                commitment_signature: &commitment_signature,
                sender_public_key: self.public_key(sender_public_key)?,
                script_private_key: &script_private_key,
                message: message.to_string(),
            })
        })();
        report(error_out, result)
            .map(codec::tx_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn coin_split(
        &self,
        amount: &str,
        split_count: &str,
        fee: &str,
        message: &str,
        lock_height: &str,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = (|| -> WalletResult<_> {
            self.wallet.coin_split(
                parse_u64_text(amount)?,
                parse_u64_text(split_count)?,
                parse_u64_text(fee)?,
                message,
                parse_u64_text(lock_height)?,
            )
        })();
        report(error_out, result)
            .map(codec::tx_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn estimate_fee(
        &self,
        amount: &str,
        fee_per_gram: &str,
        kernel_count: &str,
        output_count: &str,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = (|| -> WalletResult<_> {
            self.wallet.estimate_fee(
                parse_u64_text(amount)?,
                parse_u64_text(fee_per_gram)?,
                parse_u64_text(kernel_count)?,
                parse_u64_text(output_count)?,
            )
        })();
        report(error_out, result)
            .map(codec::u64_to_bytes)
            .unwrap_or_default()
    }

    pub fn restart_transaction_broadcast(&self, error_out: &mut ErrorCode) -> U64Bytes {
        report(error_out, self.wallet.restart_transaction_broadcast())
            .map(codec::request_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn get_completed_transactions(
        &self,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Vec<CompletedTransaction>>> {
        *error_out = ErrorCode::OK;
        let list = self.wallet.completed_transactions();
        Some(self.handles().completed_lists.insert(list))
    }

    pub fn get_cancelled_transactions(
        &self,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Vec<CompletedTransaction>>> {
        *error_out = ErrorCode::OK;
        let list = self.wallet.cancelled_transactions();
        Some(self.handles().completed_lists.insert(list))
    }

    pub fn get_pending_inbound_transactions(
        &self,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Vec<PendingInboundTransaction>>> {
        *error_out = ErrorCode::OK;
        let list = self.wallet.pending_inbound_transactions();
        Some(self.handles().pending_inbound_lists.insert(list))
    }

    pub fn get_pending_outbound_transactions(
        &self,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Vec<PendingOutboundTransaction>>> {
        *error_out = ErrorCode::OK;
        let list = self.wallet.pending_outbound_transactions();
        Some(self.handles().pending_outbound_lists.insert(list))
    }

    /// Completed (or, with `cancelled`, cancelled) transaction by id
    pub fn get_completed_transaction_by_id(
        &self,
        tx_id: &[u8],
        cancelled: bool,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<CompletedTransaction>> {
        let kind = if cancelled {
            TransactionKind::Cancelled
        } else {
            TransactionKind::Completed
        };
        let result = tx_id_from_bytes(tx_id).and_then(|id| self.lookup(id, kind)).and_then(|tx| {
            tx.into_completed()
                .ok_or_else(|| WalletError::Internal("completed partition held a pending record".into()))
        });
        report(error_out, result).map(|tx| self.handles().completed.insert(tx))
    }

    pub fn get_pending_inbound_transaction_by_id(
        &self,
        tx_id: &[u8],
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PendingInboundTransaction>> {
        let result = tx_id_from_bytes(tx_id)
            .and_then(|id| self.lookup(id, TransactionKind::PendingInbound))
            .and_then(|tx| match tx {
                Transaction::PendingInbound(tx) => Ok(tx),
                _ => Err(WalletError::Internal("unexpected record shape".into())),
            });
        report(error_out, result).map(|tx| self.handles().pending_inbound.insert(tx))
    }

    pub fn get_pending_outbound_transaction_by_id(
        &self,
        tx_id: &[u8],
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PendingOutboundTransaction>> {
        let result = tx_id_from_bytes(tx_id)
            .and_then(|id| self.lookup(id, TransactionKind::PendingOutbound))
            .and_then(|tx| match tx {
                Transaction::PendingOutbound(tx) => Ok(tx),
                _ => Err(WalletError::Internal("unexpected record shape".into())),
            });
        report(error_out, result).map(|tx| self.handles().pending_outbound.insert(tx))
    }

    fn lookup(&self, tx_id: TxId, kind: TransactionKind) -> WalletResult<Transaction> {
        match self.wallet.transaction_kind(tx_id) {
            Some(found) if found == kind => self.wallet.transaction(tx_id),
            Some(found) => Err(WalletError::invalid_state(tx_id, format!("transaction is {found}"))),
            None => Err(WalletError::NotFound(format!("transaction {tx_id}"))),
        }
    }

    pub fn completed_list_length(
        &self,
        list: Handle<Vec<CompletedTransaction>>,
        error_out: &mut ErrorCode,
    ) -> u32 {
        let result = self.handles().completed_lists.get(list).map(|l| l.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn completed_list_get_at(
        &self,
        list: Handle<Vec<CompletedTransaction>>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<CompletedTransaction>> {
        let mut handles = self.handles();
        let result = handles.completed_lists.get(list).and_then(|l| {
            l.get(index as usize)
                .cloned()
                .ok_or_else(|| WalletError::NotFound(format!("completed transaction index {index}")))
        });
        report(error_out, result).map(|tx| handles.completed.insert(tx))
    }

    pub fn pending_inbound_list_length(
        &self,
        list: Handle<Vec<PendingInboundTransaction>>,
        error_out: &mut ErrorCode,
    ) -> u32 {
        let result = self.handles().pending_inbound_lists.get(list).map(|l| l.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn pending_inbound_list_get_at(
        &self,
        list: Handle<Vec<PendingInboundTransaction>>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PendingInboundTransaction>> {
        let mut handles = self.handles();
        let result = handles.pending_inbound_lists.get(list).and_then(|l| {
            l.get(index as usize)
                .cloned()
                .ok_or_else(|| WalletError::NotFound(format!("pending inbound index {index}")))
        });
        report(error_out, result).map(|tx| handles.pending_inbound.insert(tx))
    }

    pub fn pending_outbound_list_length(
        &self,
        list: Handle<Vec<PendingOutboundTransaction>>,
        error_out: &mut ErrorCode,
    ) -> u32 {
        let result = self.handles().pending_outbound_lists.get(list).map(|l| l.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn pending_outbound_list_get_at(
        &self,
        list: Handle<Vec<PendingOutboundTransaction>>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PendingOutboundTransaction>> {
        let mut handles = self.handles();
        let result = handles.pending_outbound_lists.get(list).and_then(|l| {
            l.get(index as usize)
                .cloned()
                .ok_or_else(|| WalletError::NotFound(format!("pending outbound index {index}")))
        });
        report(error_out, result).map(|tx| handles.pending_outbound.insert(tx))
    }

    pub fn completed_tx_id(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> U64Bytes {
        let result = self.handles().completed.get(tx).map(|t| codec::tx_id_to_bytes(t.tx_id));
        report(error_out, result).unwrap_or_default()
    }

    pub fn completed_amount(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> U64Bytes {
        let result = self.handles().completed.get(tx).map(|t| codec::u64_to_bytes(t.amount));
        report(error_out, result).unwrap_or_default()
    }

    pub fn completed_fee(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> U64Bytes {
        let result = self.handles().completed.get(tx).map(|t| codec::u64_to_bytes(t.fee));
        report(error_out, result).unwrap_or_default()
    }

    pub fn completed_confirmations(
        &self,
        tx: Handle<CompletedTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self
            .handles()
            .completed
            .get(tx)
            .map(|t| codec::u64_to_bytes(t.confirmations));
        report(error_out, result).unwrap_or_default()
    }

    pub fn completed_status(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> i32 {
        let result = self.handles().completed.get(tx).map(|t| i32::from(t.status));
        report(error_out, result).unwrap_or(-1)
    }

    /// Cancellation reason code, -1 if the transaction is not cancelled
    pub fn completed_cancellation_reason(
        &self,
        tx: Handle<CompletedTransaction>,
        error_out: &mut ErrorCode,
    ) -> i32 {
        let result = self
            .handles()
            .completed
            .get(tx)
            .map(|t| t.cancellation_reason.map_or(-1, |r| r as i32));
        report(error_out, result).unwrap_or(-1)
    }

    pub fn completed_message(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> String {
        let result = self.handles().completed.get(tx).map(|t| t.message.clone());
        report(error_out, result).unwrap_or_default()
    }

    pub fn completed_source_public_key(
        &self,
        tx: Handle<CompletedTransaction>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PublicKey>> {
        let mut handles = self.handles();
        let result = handles.completed.get(tx).map(|t| t.source_public_key);
        report(error_out, result).map(|key| handles.public_keys.insert(key))
    }

    pub fn completed_destination_public_key(
        &self,
        tx: Handle<CompletedTransaction>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PublicKey>> {
        let mut handles = self.handles();
        let result = handles.completed.get(tx).map(|t| t.destination_public_key);
        report(error_out, result).map(|key| handles.public_keys.insert(key))
    }

    /// Creation time in unix seconds
    pub fn completed_timestamp(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) -> U64Bytes {
        let result = self.handles().completed.get(tx).map(|t| codec::u64_to_bytes(t.timestamp));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_inbound_tx_id(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_inbound.get(tx).map(|t| codec::tx_id_to_bytes(t.tx_id));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_inbound_amount(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_inbound.get(tx).map(|t| codec::u64_to_bytes(t.amount));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_outbound_tx_id(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_outbound.get(tx).map(|t| codec::tx_id_to_bytes(t.tx_id));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_outbound_amount(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_outbound.get(tx).map(|t| codec::u64_to_bytes(t.amount));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_inbound_source_public_key(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PublicKey>> {
        let mut handles = self.handles();
        let result = handles.pending_inbound.get(tx).map(|t| t.source_public_key);
        report(error_out, result).map(|key| handles.public_keys.insert(key))
    }

    pub fn pending_inbound_timestamp(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_inbound.get(tx).map(|t| codec::u64_to_bytes(t.timestamp));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_inbound_status(&self, tx: Handle<PendingInboundTransaction>, error_out: &mut ErrorCode) -> i32 {
        let result = self.handles().pending_inbound.get(tx).map(|t| i32::from(t.status));
        report(error_out, result).unwrap_or(-1)
    }

    pub fn pending_inbound_message(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> String {
        let result = self.handles().pending_inbound.get(tx).map(|t| t.message.clone());
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_outbound_destination_public_key(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PublicKey>> {
        let mut handles = self.handles();
        let result = handles.pending_outbound.get(tx).map(|t| t.destination_public_key);
        report(error_out, result).map(|key| handles.public_keys.insert(key))
    }

    pub fn pending_outbound_fee(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_outbound.get(tx).map(|t| codec::u64_to_bytes(t.fee));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_outbound_timestamp(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> U64Bytes {
        let result = self.handles().pending_outbound.get(tx).map(|t| codec::u64_to_bytes(t.timestamp));
        report(error_out, result).unwrap_or_default()
    }

    pub fn pending_outbound_status(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> i32 {
        let result = self.handles().pending_outbound.get(tx).map(|t| i32::from(t.status));
        report(error_out, result).unwrap_or(-1)
    }

    pub fn pending_outbound_message(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) -> String {
        let result = self.handles().pending_outbound.get(tx).map(|t| t.message.clone());
        report(error_out, result).unwrap_or_default()
    }

    pub fn destroy_completed_transaction(&self, tx: Handle<CompletedTransaction>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().completed.destroy(tx).map(drop));
    }

    pub fn destroy_completed_transactions(
        &self,
        list: Handle<Vec<CompletedTransaction>>,
        error_out: &mut ErrorCode,
    ) {
        report(error_out, self.handles().completed_lists.destroy(list).map(drop));
    }

    pub fn destroy_pending_inbound_transaction(
        &self,
        tx: Handle<PendingInboundTransaction>,
        error_out: &mut ErrorCode,
    ) {
        report(error_out, self.handles().pending_inbound.destroy(tx).map(drop));
    }

    pub fn destroy_pending_inbound_transactions(
        &self,
        list: Handle<Vec<PendingInboundTransaction>>,
        error_out: &mut ErrorCode,
    ) {
        report(error_out, self.handles().pending_inbound_lists.destroy(list).map(drop));
    }

    pub fn destroy_pending_outbound_transaction(
        &self,
        tx: Handle<PendingOutboundTransaction>,
        error_out: &mut ErrorCode,
    ) {
        report(error_out, self.handles().pending_outbound.destroy(tx).map(drop));
    }

    pub fn destroy_pending_outbound_transactions(
        &self,
        list: Handle<Vec<PendingOutboundTransaction>>,
        error_out: &mut ErrorCode,
    ) {
        report(error_out, self.handles().pending_outbound_lists.destroy(list).map(drop));
    }

    // ---- balance and fees ----

    pub fn get_balance(&self, error_out: &mut ErrorCode) -> Option<Handle<Balance>> {
        *error_out = ErrorCode::OK;
        let balance = self.wallet.balance();
        Some(self.handles().balances.insert(balance))
    }

    /// Balance fields in order: available, pending incoming, pending outgoing, timelocked
    pub fn balance_fields(&self, balance: Handle<Balance>, error_out: &mut ErrorCode) -> [U64Bytes; 4] {
        let result = self.handles().balances.get(balance).map(|b| {
            [
                codec::u64_to_bytes(b.available),
                codec::u64_to_bytes(b.pending_incoming),
                codec::u64_to_bytes(b.pending_outgoing),
                codec::u64_to_bytes(b.timelocked),
            ]
        });
        report(error_out, result).unwrap_or_default()
    }

    pub fn destroy_balance(&self, balance: Handle<Balance>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().balances.destroy(balance).map(drop));
    }

    pub fn get_fee_per_gram_stats(
        &self,
        count: u32,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Vec<FeePerGramStat>>> {
        report(error_out, self.wallet.fee_per_gram_stats(count))
            .map(|stats| self.handles().fee_stats.insert(stats))
    }

    pub fn fee_per_gram_stats_length(
        &self,
        stats: Handle<Vec<FeePerGramStat>>,
        error_out: &mut ErrorCode,
    ) -> u32 {
        let result = self.handles().fee_stats.get(stats).map(|s| s.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn fee_per_gram_stat_at(
        &self,
        stats: Handle<Vec<FeePerGramStat>>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> Option<FeePerGramStat> {
        let result = self.handles().fee_stats.get(stats).and_then(|s| {
            s.get(index as usize)
                .copied()
                .ok_or_else(|| WalletError::NotFound(format!("fee statistic index {index}")))
        });
        report(error_out, result)
    }

    pub fn destroy_fee_per_gram_stats(&self, stats: Handle<Vec<FeePerGramStat>>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().fee_stats.destroy(stats).map(drop));
    }

    // ---- validation, recovery, network ----

    pub fn start_txo_validation(&self, error_out: &mut ErrorCode) -> U64Bytes {
        report(error_out, self.wallet.start_txo_validation())
            .map(codec::request_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn start_transaction_validation(&self, error_out: &mut ErrorCode) -> U64Bytes {
        report(error_out, self.wallet.start_transaction_validation())
            .map(codec::request_id_to_bytes)
            .unwrap_or_default()
    }

    pub fn start_recovery(
        &self,
        base_node: Handle<PublicKey>,
        output_message: &str,
        error_out: &mut ErrorCode,
    ) -> bool {
        let result = self
            .public_key(base_node)
            .and_then(|key| self.wallet.start_recovery(key, output_message));
        report(error_out, result).unwrap_or(false)
    }

    pub fn is_recovery_in_progress(&self, error_out: &mut ErrorCode) -> bool {
        *error_out = ErrorCode::OK;
        self.wallet.is_recovery_in_progress()
    }

    pub fn add_base_node_peer(
        &self,
        public_key: Handle<PublicKey>,
        address: &str,
        error_out: &mut ErrorCode,
    ) -> bool {
        let result = self
            .public_key(public_key)
            .and_then(|key| self.wallet.add_base_node_peer(key, address));
        report(error_out, result).unwrap_or(false)
    }

    pub fn set_power_mode(&self, low_power: bool, error_out: &mut ErrorCode) {
        let mode = if low_power { PowerMode::Low } else { PowerMode::Normal };
        report(error_out, self.wallet.set_power_mode(mode));
    }

    pub fn get_required_confirmations(&self, error_out: &mut ErrorCode) -> U64Bytes {
        *error_out = ErrorCode::OK;
        codec::u64_to_bytes(self.wallet.required_confirmations())
    }

    pub fn set_required_confirmations(&self, confirmations: &str, error_out: &mut ErrorCode) {
        let result = parse_u64_text(confirmations)
            .and_then(|n| self.wallet.set_required_confirmations(n));
        report(error_out, result);
    }

    // ---- contacts ----

    pub fn create_contact(
        &self,
        alias: &str,
        public_key: Handle<PublicKey>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Contact>> {
        let result = self.public_key(public_key).and_then(|key| {
            if alias.trim().is_empty() {
                Err(WalletError::InvalidArgument("contact alias must not be empty".into()))
            } else {
                Ok(Contact::new(alias, key))
            }
        });
        report(error_out, result).map(|contact| self.handles().contacts.insert(contact))
    }

    pub fn contact_alias(&self, contact: Handle<Contact>, error_out: &mut ErrorCode) -> String {
        let result = self.handles().contacts.get(contact).map(|c| c.alias.clone());
        report(error_out, result).unwrap_or_default()
    }

    pub fn contact_public_key(
        &self,
        contact: Handle<Contact>,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<PublicKey>> {
        let mut handles = self.handles();
        let result = handles.contacts.get(contact).map(|c| c.public_key);
        report(error_out, result).map(|key| handles.public_keys.insert(key))
    }

    /// `true` once the contact is stored, whether it was new or renamed
    pub fn upsert_contact(&self, contact: Handle<Contact>, error_out: &mut ErrorCode) -> bool {
        let result = self
            .handles()
            .contacts
            .get(contact)
            .cloned()
            .and_then(|c| self.wallet.upsert_contact(c));
        report(error_out, result).is_some()
    }

    pub fn remove_contact(&self, contact: Handle<Contact>, error_out: &mut ErrorCode) -> bool {
        let result = self
            .handles()
            .contacts
            .get(contact)
            .map(|c| self.wallet.remove_contact(&c.public_key));
        report(error_out, result).unwrap_or(false)
    }

    pub fn get_contacts(&self, error_out: &mut ErrorCode) -> Option<Handle<Vec<Contact>>> {
        *error_out = ErrorCode::OK;
        let contacts = self.wallet.contacts();
        Some(self.handles().contact_lists.insert(contacts))
    }

    pub fn contacts_length(&self, list: Handle<Vec<Contact>>, error_out: &mut ErrorCode) -> u32 {
        let result = self.handles().contact_lists.get(list).map(|l| l.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn contacts_get_at(
        &self,
        list: Handle<Vec<Contact>>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> Option<Handle<Contact>> {
        let mut handles = self.handles();
        let result = handles.contact_lists.get(list).and_then(|l| {
            l.get(index as usize)
                .cloned()
                .ok_or_else(|| WalletError::NotFound(format!("contact index {index}")))
        });
        report(error_out, result).map(|c| handles.contacts.insert(c))
    }

    pub fn destroy_contact(&self, contact: Handle<Contact>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().contacts.destroy(contact).map(drop));
    }

    pub fn destroy_contacts(&self, list: Handle<Vec<Contact>>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().contact_lists.destroy(list).map(drop));
    }

    // ---- seed words ----

    pub fn get_seed_words(&self, error_out: &mut ErrorCode) -> Option<Handle<SeedWords>> {
        *error_out = ErrorCode::OK;
        let words = self.wallet.seed_words();
        Some(self.handles().seed_words.insert(words))
    }

    pub fn create_seed_words(&self) -> Handle<SeedWords> {
        self.handles().seed_words.insert(SeedWords::new())
    }

    /// 1 when the word was pushed, 2 when it completed the phrase, 0 on failure
    pub fn seed_words_push_word(
        &self,
        words: Handle<SeedWords>,
        word: &str,
        error_out: &mut ErrorCode,
    ) -> u8 {
        let result = self
            .handles()
            .seed_words
            .get_mut(words)
            .and_then(|w| w.push_word(word));
        match report(error_out, result) {
            Some(SeedWordPush::Pushed) => 1,
            Some(SeedWordPush::Complete) => 2,
            None => 0,
        }
    }

    pub fn seed_words_length(&self, words: Handle<SeedWords>, error_out: &mut ErrorCode) -> u32 {
        let result = self.handles().seed_words.get(words).map(|w| w.len() as u32);
        report(error_out, result).unwrap_or(0)
    }

    pub fn seed_words_get_at(
        &self,
        words: Handle<SeedWords>,
        index: u32,
        error_out: &mut ErrorCode,
    ) -> String {
        let result = self
            .handles()
            .seed_words
            .get(words)
            .and_then(|w| w.get_at(index as usize).map(str::to_string));
        report(error_out, result).unwrap_or_default()
    }

    /// Take the word list back out, e.g. to restore another wallet from it
    pub fn take_seed_words(&self, words: Handle<SeedWords>, error_out: &mut ErrorCode) -> Option<SeedWords> {
        report(error_out, self.handles().seed_words.destroy(words))
    }

    pub fn destroy_seed_words(&self, words: Handle<SeedWords>, error_out: &mut ErrorCode) {
        report(error_out, self.handles().seed_words.destroy(words).map(drop));
    }

    // ---- key-value store and logging ----

    pub fn set_key_value(&self, key: &str, value: &str, error_out: &mut ErrorCode) -> bool {
        report(error_out, self.wallet.set_key_value(key, value)).is_some()
    }

    pub fn get_key_value(&self, key: &str, error_out: &mut ErrorCode) -> String {
        report(error_out, self.wallet.get_key_value(key)).unwrap_or_default()
    }

    pub fn remove_key_value(&self, key: &str, error_out: &mut ErrorCode) -> bool {
        *error_out = ErrorCode::OK;
        self.wallet.remove_key_value(key)
    }

    pub fn log_message(&self, message: &str, error_out: &mut ErrorCode) {
        *error_out = ErrorCode::OK;
        self.wallet.log_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::PrivateKey;
    use crate::events::listeners::MockEventListener;
    use crate::network::NoopConnectivity;

    fn boundary() -> WalletBoundary {
        let mut error = ErrorCode::OK;
        let boundary = WalletBoundary::create(
            CreateWalletArgs {
                config_json: r#"{ "network": "esmeralda" }"#,
                log_path: None,
                max_log_files: 2,
                max_log_file_bytes: 1024,
                passphrase: None,
                seed_words: None,
                connectivity: Arc::new(NoopConnectivity),
                listener: Box::new(MockEventListener::new()),
                execution_context: None,
            },
            &mut error,
        );
        assert!(error.is_ok());
        boundary.unwrap()
    }

    #[test]
    fn test_create_with_bad_config_returns_null() {
        let mut error = ErrorCode::OK;
        let boundary = WalletBoundary::create(
            CreateWalletArgs {
                config_json: "{ not json",
                log_path: None,
                max_log_files: 2,
                max_log_file_bytes: 1024,
                passphrase: None,
                seed_words: None,
                connectivity: Arc::new(NoopConnectivity),
                listener: Box::new(MockEventListener::new()),
                execution_context: None,
            },
            &mut error,
        );
        assert!(boundary.is_none());
        assert_eq!(error.value(), 8);
    }

    #[test]
    fn test_error_codes_for_failed_calls() {
        let boundary = boundary();
        let mut error = ErrorCode::OK;

        assert!(boundary.public_key_from_hex("zz", &mut error).is_none());
        assert_eq!(error.value(), 1);

        let dest = PrivateKey::random().public_key();
        let key = boundary.public_key_from_hex(&dest.to_hex(), &mut error).unwrap();
        assert!(error.is_ok());

        let tx_id = boundary.send_transaction(key, "1000", "5", "hi", false, &mut error);
        assert_eq!(error.value(), 5);
        assert_eq!(tx_id, [0u8; 8]);

        boundary.send_transaction(key, "-1", "5", "hi", false, &mut error);
        assert_eq!(error.value(), 1);

        assert!(!boundary.cancel_pending_transaction(&codec::u64_to_bytes(12), &mut error));
        assert_eq!(error.value(), 4);

        boundary.get_key_value("missing", &mut error);
        assert_eq!(error.value(), 4);
    }

    #[test]
    fn test_handles_are_destroyed_once() {
        let boundary = boundary();
        let mut error = ErrorCode::OK;
        let key = boundary.wallet_public_key(&mut error).unwrap();
        assert_eq!(
            boundary.public_key_to_hex(key, &mut error),
            boundary.wallet().public_key().to_hex()
        );
        boundary.destroy_public_key(key, &mut error);
        assert!(error.is_ok());
        boundary.destroy_public_key(key, &mut error);
        assert_eq!(error.value(), 4);
        assert_eq!(boundary.public_key_to_hex(key, &mut error), "");
        assert_eq!(error.value(), 4);
        assert_eq!(boundary.live_handles(), 0);
    }

    #[test]
    fn test_seed_words_round_trip_through_handles() {
        let boundary = boundary();
        let mut error = ErrorCode::OK;
        let backup = boundary.get_seed_words(&mut error).unwrap();
        let length = boundary.seed_words_length(backup, &mut error);
        assert_eq!(length, 24);

        let rebuilt = boundary.create_seed_words();
        let mut last = 0;
        for i in 0..length {
            let word = boundary.seed_words_get_at(backup, i, &mut error);
            last = boundary.seed_words_push_word(rebuilt, &word, &mut error);
            assert!(error.is_ok());
        }
        assert_eq!(last, 2);
        assert_eq!(boundary.seed_words_push_word(rebuilt, "abandon", &mut error), 0);
        assert_eq!(error.value(), 9);

        let words = boundary.take_seed_words(rebuilt, &mut error).unwrap();
        assert_eq!(words, boundary.wallet().seed_words());
        boundary.destroy_seed_words(backup, &mut error);
        assert_eq!(boundary.live_handles(), 0);
    }

    #[test]
    fn test_balance_and_contacts() {
        let boundary = boundary();
        let mut error = ErrorCode::OK;

        let balance = boundary.get_balance(&mut error).unwrap();
        assert_eq!(boundary.balance_fields(balance, &mut error), [[0u8; 8]; 4]);
        boundary.destroy_balance(balance, &mut error);

        let key = boundary
            .public_key_from_hex(&PrivateKey::random().public_key().to_hex(), &mut error)
            .unwrap();
        let contact = boundary.create_contact("bob", key, &mut error).unwrap();
        assert!(boundary.upsert_contact(contact, &mut error));
        let contacts = boundary.get_contacts(&mut error).unwrap();
        assert_eq!(boundary.contacts_length(contacts, &mut error), 1);
        let first = boundary.contacts_get_at(contacts, 0, &mut error).unwrap();
        assert_eq!(boundary.contact_alias(first, &mut error), "bob");
        assert!(boundary.contacts_get_at(contacts, 1, &mut error).is_none());
        assert_eq!(error.value(), 4);
        assert!(boundary.remove_contact(contact, &mut error));
    }
}
