//! Wallet facade
//!
//! [`Wallet`] ties the transaction store, lifecycle state machine, validation
//! and recovery coordinators and event dispatcher together. It is `Send + Sync`:
//! share it in an `Arc` between caller threads and the threads producing
//! [`ProtocolEvent`]s.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::data_structures::{
    Balance, BaseNodePeer, CompletedTransaction, ConnectivityStatus, Contact, FeePerGramStat,
    PendingInboundTransaction, PendingOutboundTransaction, PowerMode, PublicKey, RequestId,
    SeedWords, Transaction, TransactionKind, TxId,
};
use crate::errors::{WalletError, WalletResult};
use crate::events::{
    EventDispatcher, EventStats, ExecutionContext, ProtocolEvent, WalletEvent, WalletEventListener,
};
use crate::lifecycle::{ConfirmationUpdate, Finalization, TransactionLifecycle, UtxoImport};
use crate::network::WalletConnectivity;
use crate::recovery::RecoveryCoordinator;
use crate::storage::{KeyValueStore, TransactionStore};
use crate::validation::{ValidationCoordinator, ValidationKind};

pub mod builder;
pub mod config;

pub use builder::{WalletBuildError, WalletBuilder};
pub use config::{LoggingConfig, WalletConfig};

/// How long [`Wallet::flush_events`] waits for the listener to catch up
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Wallet {
    config: WalletConfig,
    seed_words: SeedWords,
    public_key: PublicKey,
    store: Arc<TransactionStore>,
    dispatcher: Arc<EventDispatcher>,
    connectivity: Arc<dyn WalletConnectivity>,
    lifecycle: TransactionLifecycle,
    validation: ValidationCoordinator,
    recovery: RecoveryCoordinator,
    contacts: RwLock<BTreeMap<PublicKey, Contact>>,
    key_values: KeyValueStore,
    base_node_peers: Mutex<Vec<BaseNodePeer>>,
    power_mode: Mutex<PowerMode>,
}

impl Wallet {
    /// Assemble a wallet from its parts; use [`WalletBuilder`] instead
    pub(crate) fn assemble(
        config: WalletConfig,
        seed_words: SeedWords,
        dispatcher: Arc<EventDispatcher>,
        connectivity: Arc<dyn WalletConnectivity>,
    ) -> WalletResult<Self> {
        config.validate()?;
        let public_key = seed_words
            .derive_master_key(config.passphrase.as_deref())?
            .public_key();
        let store = Arc::new(TransactionStore::new());
        let lifecycle = TransactionLifecycle::new(
            store.clone(),
            dispatcher.clone(),
            connectivity.clone(),
            public_key,
            config.lifecycle_settings(),
        );
        let recovery = RecoveryCoordinator::new(dispatcher.clone(), connectivity.clone());

        info!(network = %config.network, %public_key, "Wallet created");
        Ok(Self {
            config,
            seed_words,
            public_key,
            store,
            dispatcher,
            connectivity,
            lifecycle,
            validation: ValidationCoordinator::new(),
            recovery,
            contacts: RwLock::new(BTreeMap::new()),
            key_values: KeyValueStore::new(),
            base_node_peers: Mutex::new(Vec::new()),
            power_mode: Mutex::new(PowerMode::Normal),
        })
    }

    pub fn builder() -> WalletBuilder {
        WalletBuilder::new()
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Backup copy of the recovery phrase
    pub fn seed_words(&self) -> SeedWords {
        self.seed_words.clone()
    }

    // ---- events ----

    /// Register the wallet's only listener
    pub fn set_listener(
        &self,
        listener: Box<dyn WalletEventListener>,
        context: Option<Arc<dyn ExecutionContext>>,
    ) -> WalletResult<()> {
        self.dispatcher.set_listener(listener, context)
    }

    pub fn has_listener(&self) -> bool {
        self.dispatcher.has_listener()
    }

    /// Wait for every already-published notification to reach the listener
    pub fn flush_events(&self) -> bool {
        self.dispatcher.flush(DEFAULT_FLUSH_TIMEOUT)
    }

    pub fn event_stats(&self) -> EventStats {
        self.dispatcher.get_stats()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Apply one event produced by the network, mining or recovery threads
    ///
    /// Stale and duplicate events succeed without effect. Events for unknown
    /// transactions or validation requests are logged and returned as errors;
    /// they never disturb wallet state.
    pub fn handle_protocol_event(&self, event: ProtocolEvent) -> WalletResult<()> {
        let event_type = event.event_type();
        debug!(event_type, "Protocol event");
        match event {
            ProtocolEvent::TransactionReceived {
                tx_id,
                source_public_key,
                amount,
                message,
            } => {
                self.lifecycle
                    .on_received(tx_id, source_public_key, amount, message)?;
            }
            ProtocolEvent::TransactionReplyReceived { tx_id } => {
                self.lifecycle
                    .on_finalized(tx_id, Finalization::ReplyReceived)?;
            }
            ProtocolEvent::TransactionFinalized { tx_id } => {
                self.lifecycle.on_finalized(tx_id, Finalization::Finalized)?;
            }
            ProtocolEvent::TransactionBroadcast { tx_id } => {
                self.lifecycle
                    .on_confirmation_update(tx_id, ConfirmationUpdate::Broadcast)?;
            }
            ProtocolEvent::TransactionMined { tx_id } => {
                self.lifecycle
                    .on_confirmation_update(tx_id, ConfirmationUpdate::Mined)?;
            }
            ProtocolEvent::TransactionMinedUnconfirmed {
                tx_id,
                confirmations,
            } => {
                self.lifecycle.on_confirmation_update(
                    tx_id,
                    ConfirmationUpdate::MinedUnconfirmed(confirmations),
                )?;
            }
            ProtocolEvent::TransactionFauxConfirmed { tx_id } => {
                self.lifecycle
                    .on_confirmation_update(tx_id, ConfirmationUpdate::FauxConfirmed)?;
            }
            ProtocolEvent::TransactionFauxUnconfirmed {
                tx_id,
                confirmations,
            } => {
                self.lifecycle.on_confirmation_update(
                    tx_id,
                    ConfirmationUpdate::FauxUnconfirmed(confirmations),
                )?;
            }
            ProtocolEvent::TransactionCancelled { tx_id, reason } => {
                self.lifecycle.on_cancellation(tx_id, reason)?;
            }
            ProtocolEvent::DirectSendResult { tx_id, success } => {
                self.dispatcher
                    .publish(WalletEvent::DirectSendResult { tx_id, success });
            }
            ProtocolEvent::StoreAndForwardSendResult { tx_id, success } => {
                self.dispatcher
                    .publish(WalletEvent::StoreAndForwardSendResult { tx_id, success });
            }
            ProtocolEvent::TxoValidationComplete {
                request_id,
                success,
            } => {
                self.validation
                    .resolve(request_id, ValidationKind::TxoValidation, success)?;
                self.dispatcher.publish(WalletEvent::TxoValidationComplete {
                    request_id,
                    success,
                });
            }
            ProtocolEvent::TransactionValidationComplete {
                request_id,
                success,
            } => {
                self.validation.resolve(
                    request_id,
                    ValidationKind::TransactionValidation,
                    success,
                )?;
                self.dispatcher
                    .publish(WalletEvent::TransactionValidationComplete {
                        request_id,
                        success,
                    });
            }
            ProtocolEvent::ContactLivenessUpdated(liveness) => {
                self.dispatcher
                    .publish(WalletEvent::ContactLivenessUpdated(liveness));
            }
            ProtocolEvent::ConnectivityStatus(status) => {
                let status = ConnectivityStatus::from(status);
                if let ConnectivityStatus::Unknown(value) = status {
                    info!(value, "Unrecognised connectivity status");
                }
                self.dispatcher
                    .publish(WalletEvent::ConnectivityStatus(status));
            }
            ProtocolEvent::BaseNodeState { chain_tip } => {
                self.lifecycle.on_chain_tip(chain_tip);
            }
            ProtocolEvent::RecoveryProgress {
                phase,
                current,
                total,
            } => {
                self.recovery.on_progress(phase, current, total);
            }
            ProtocolEvent::OutputRecovered {
                amount,
                source_public_key,
                lock_height,
                message,
            } => {
                let tx_id = self.lifecycle.on_output_recovered(
                    amount,
                    source_public_key,
                    lock_height,
                    message,
                )?;
                info!(tx_id = %tx_id, amount, "Recovered output");
            }
        }
        Ok(())
    }

    // ---- transactions ----

    pub fn send_transaction(
        &self,
        destination: PublicKey,
        amount: u64,
        fee_per_gram: u64,
        message: impl Into<String>,
        one_sided: bool,
    ) -> WalletResult<TxId> {
        self.lifecycle
            .send(destination, amount, fee_per_gram, message.into(), one_sided)
    }

    /// Cancel a pending transaction; `Ok(false)` if it was already cancelled
    pub fn cancel_pending_transaction(&self, tx_id: TxId) -> WalletResult<bool> {
        self.lifecycle.cancel(tx_id)
    }

    pub fn import_utxo(&self, import: UtxoImport<'_>) -> WalletResult<TxId> {
        self.lifecycle.import_utxo(import)
    }

    pub fn coin_split(
        &self,
        amount: u64,
        split_count: u64,
        fee: u64,
        message: impl Into<String>,
        lock_height: u64,
    ) -> WalletResult<TxId> {
        self.lifecycle
            .coin_split(amount, split_count, fee, message.into(), lock_height)
    }

    pub fn estimate_fee(
        &self,
        amount: u64,
        fee_per_gram: u64,
        kernel_count: u64,
        output_count: u64,
    ) -> WalletResult<u64> {
        self.lifecycle
            .estimate_fee(amount, fee_per_gram, kernel_count, output_count)
    }

    pub fn fee_per_gram_stats(&self, count: u32) -> WalletResult<Vec<FeePerGramStat>> {
        if count == 0 {
            return Err(WalletError::InvalidArgument(
                "fee statistics count must be non-zero".into(),
            ));
        }
        self.connectivity.fee_per_gram_stats(count)
    }

    /// Re-submit every unconfirmed completed transaction
    pub fn restart_transaction_broadcast(&self) -> WalletResult<RequestId> {
        let request_id = self.validation.allocate_untracked();
        self.lifecycle.restart_broadcast(request_id)?;
        Ok(request_id)
    }

    pub fn balance(&self) -> Balance {
        self.store.balance()
    }

    /// Where a transaction currently sits in its lifecycle
    pub fn transaction_kind(&self, tx_id: TxId) -> Option<TransactionKind> {
        self.store.locate(tx_id)
    }

    pub fn transaction(&self, tx_id: TxId) -> WalletResult<Transaction> {
        let kind = self
            .store
            .locate(tx_id)
            .ok_or_else(|| WalletError::NotFound(format!("transaction {tx_id}")))?;
        self.store.lookup(tx_id, kind)
    }

    pub fn pending_inbound_transactions(&self) -> Vec<PendingInboundTransaction> {
        self.store
            .list(TransactionKind::PendingInbound)
            .into_iter()
            .filter_map(|tx| match tx {
                Transaction::PendingInbound(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }

    pub fn pending_outbound_transactions(&self) -> Vec<PendingOutboundTransaction> {
        self.store
            .list(TransactionKind::PendingOutbound)
            .into_iter()
            .filter_map(|tx| match tx {
                Transaction::PendingOutbound(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }

    pub fn completed_transactions(&self) -> Vec<CompletedTransaction> {
        self.completed_in(TransactionKind::Completed)
    }

    pub fn cancelled_transactions(&self) -> Vec<CompletedTransaction> {
        self.completed_in(TransactionKind::Cancelled)
    }

    fn completed_in(&self, kind: TransactionKind) -> Vec<CompletedTransaction> {
        self.store
            .list(kind)
            .into_iter()
            .filter_map(Transaction::into_completed)
            .collect()
    }

    pub fn required_confirmations(&self) -> u64 {
        self.lifecycle.required_confirmations()
    }

    pub fn set_required_confirmations(&self, confirmations: u64) -> WalletResult<()> {
        self.lifecycle.set_required_confirmations(confirmations)
    }

    // ---- validation and recovery ----

    pub fn start_txo_validation(&self) -> WalletResult<RequestId> {
        let request_id = self.validation.start(ValidationKind::TxoValidation);
        if let Err(e) = self.connectivity.request_txo_validation(request_id) {
            self.validation.abandon(request_id);
            return Err(e);
        }
        info!(%request_id, "TXO validation started");
        Ok(request_id)
    }

    pub fn start_transaction_validation(&self) -> WalletResult<RequestId> {
        let request_id = self.validation.start(ValidationKind::TransactionValidation);
        if let Err(e) = self.connectivity.request_transaction_validation(request_id) {
            self.validation.abandon(request_id);
            return Err(e);
        }
        info!(%request_id, "Transaction validation started");
        Ok(request_id)
    }

    pub fn is_validation_outstanding(&self, request_id: RequestId) -> bool {
        self.validation.is_outstanding(request_id)
    }

    pub fn start_recovery(&self, base_node: PublicKey, output_message: &str) -> WalletResult<bool> {
        self.recovery.start_recovery(base_node, output_message)
    }

    pub fn is_recovery_in_progress(&self) -> bool {
        self.recovery.is_running()
    }

    // ---- contacts ----

    /// Insert or rename a contact; returns `true` if it was new
    pub fn upsert_contact(&self, contact: Contact) -> WalletResult<bool> {
        if contact.alias.trim().is_empty() {
            return Err(WalletError::InvalidArgument(
                "contact alias must not be empty".into(),
            ));
        }
        if contact.public_key == self.public_key {
            return Err(WalletError::InvalidArgument(
                "cannot add this wallet as a contact".into(),
            ));
        }
        let mut contacts = self.contacts.write().unwrap_or_else(|e| e.into_inner());
        let public_key = contact.public_key;
        let is_new = contacts.insert(public_key, contact).is_none();
        debug!(%public_key, is_new, "Contact upserted");
        Ok(is_new)
    }

    pub fn remove_contact(&self, public_key: &PublicKey) -> bool {
        self.contacts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(public_key)
            .is_some()
    }

    /// Contacts ordered by public key
    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    // ---- base node and connectivity ----

    /// Add a base node peer; `address` must look like a multiaddr
    pub fn add_base_node_peer(&self, public_key: PublicKey, address: &str) -> WalletResult<bool> {
        let address = address.trim();
        if !address.starts_with('/') || address.len() < 2 {
            return Err(WalletError::InvalidArgument(format!(
                "'{address}' is not a multiaddr"
            )));
        }
        let peer = BaseNodePeer {
            public_key,
            address: address.to_string(),
        };
        let mut peers = self
            .base_node_peers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if peers.contains(&peer) {
            return Ok(false);
        }
        self.connectivity.add_base_node_peer(&peer)?;
        info!(%public_key, address, "Base node peer added");
        peers.push(peer);
        Ok(true)
    }

    pub fn base_node_peers(&self) -> Vec<BaseNodePeer> {
        self.base_node_peers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_power_mode(&self, mode: PowerMode) -> WalletResult<()> {
        let mut current = self.power_mode.lock().unwrap_or_else(|e| e.into_inner());
        if *current == mode {
            return Ok(());
        }
        self.connectivity.set_power_mode(mode)?;
        *current = mode;
        info!(?mode, "Power mode changed");
        Ok(())
    }

    pub fn power_mode(&self) -> PowerMode {
        *self.power_mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---- key-value store and host logging ----

    pub fn set_key_value(&self, key: &str, value: &str) -> WalletResult<()> {
        self.key_values.set(key, value)
    }

    pub fn get_key_value(&self, key: &str) -> WalletResult<String> {
        self.key_values.get(key)
    }

    pub fn remove_key_value(&self, key: &str) -> bool {
        self.key_values.remove(key)
    }

    /// Write a host-supplied line into the wallet log
    pub fn log_message(&self, message: &str) {
        if message.is_empty() {
            warn!(target: "wallet::host", "Empty log message from host");
            return;
        }
        info!(target: "wallet::host", "{message}");
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.config.network)
            .field("public_key", &self.public_key)
            .field("has_listener", &self.dispatcher.has_listener())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::PrivateKey;
    use crate::network::{ConnectivityCall, RecordingConnectivity};

    fn wallet_with(net: Arc<RecordingConnectivity>) -> Wallet {
        WalletBuilder::new()
            .generate_new()
            .with_connectivity(net)
            .build()
            .unwrap()
    }

    fn key() -> PublicKey {
        PrivateKey::random().public_key()
    }

    #[test]
    fn test_validation_requests_go_to_connectivity() {
        let net = Arc::new(RecordingConnectivity::new());
        let wallet = wallet_with(net.clone());
        let txo = wallet.start_txo_validation().unwrap();
        let tx = wallet.start_transaction_validation().unwrap();
        assert_ne!(txo, tx);
        assert_eq!(
            net.calls(),
            vec![
                ConnectivityCall::TxoValidation(txo),
                ConnectivityCall::TransactionValidation(tx)
            ]
        );

        wallet
            .handle_protocol_event(ProtocolEvent::TransactionValidationComplete {
                request_id: tx,
                success: true,
            })
            .unwrap();
        assert!(!wallet.is_validation_outstanding(tx));
        assert!(wallet.is_validation_outstanding(txo));

        // second resolution is dropped
        assert_eq!(
            wallet.handle_protocol_event(ProtocolEvent::TransactionValidationComplete {
                request_id: tx,
                success: true,
            }),
            Err(WalletError::UnknownRequest(tx))
        );
    }

    #[test]
    fn test_transport_and_liveness_events_are_forwarded() {
        use crate::data_structures::{ContactLiveness, ContactOnlineStatus};
        use crate::events::listeners::MockEventListener;

        let listener = MockEventListener::builder().unlimited_events().build();
        let wallet = WalletBuilder::new()
            .with_connectivity(Arc::new(RecordingConnectivity::new()))
            .with_event_listener(Box::new(listener.clone()))
            .build()
            .unwrap();

        let tx_id = TxId::new(77);
        let events = vec![
            ProtocolEvent::DirectSendResult {
                tx_id,
                success: false,
            },
            ProtocolEvent::StoreAndForwardSendResult {
                tx_id,
                success: true,
            },
            ProtocolEvent::ContactLivenessUpdated(ContactLiveness {
                public_key: key(),
                latency_ms: Some(120),
                last_seen: None,
                online_status: ContactOnlineStatus::Online,
            }),
            ProtocolEvent::ConnectivityStatus(1),
            ProtocolEvent::ConnectivityStatus(42),
        ];
        for event in events {
            wallet.handle_protocol_event(event).unwrap();
        }

        assert!(wallet.flush_events());
        listener
            .assert_tx_sequence(tx_id, &["DirectSendResult", "StoreAndForwardSendResult"])
            .unwrap();
        listener
            .assert_event_type_count("ContactLivenessUpdated", 1)
            .unwrap();
        let statuses: Vec<_> = listener
            .events()
            .into_iter()
            .filter_map(|e| match e {
                WalletEvent::ConnectivityStatus(status) => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![ConnectivityStatus::Online, ConnectivityStatus::Unknown(42)]
        );
    }

    #[test]
    fn test_contacts_upsert_and_remove() {
        let wallet = wallet_with(Arc::new(RecordingConnectivity::new()));
        let alice = key();
        assert!(wallet.upsert_contact(Contact::new("alice", alice)).unwrap());
        assert!(!wallet.upsert_contact(Contact::new("alice b", alice)).unwrap());
        assert_eq!(wallet.contacts(), vec![Contact::new("alice b", alice)]);
        assert!(wallet
            .upsert_contact(Contact::new("me", wallet.public_key()))
            .is_err());
        assert!(wallet.remove_contact(&alice));
        assert!(!wallet.remove_contact(&alice));
        assert!(wallet.contacts().is_empty());
    }

    #[test]
    fn test_base_node_peers_and_power_mode() {
        let net = Arc::new(RecordingConnectivity::new());
        let wallet = wallet_with(net.clone());
        let node = key();
        assert!(wallet
            .add_base_node_peer(node, "/onion3/abcdef:18141")
            .unwrap());
        assert!(!wallet
            .add_base_node_peer(node, "/onion3/abcdef:18141")
            .unwrap());
        assert!(matches!(
            wallet.add_base_node_peer(node, "abcdef:18141"),
            Err(WalletError::InvalidArgument(_))
        ));
        assert_eq!(wallet.base_node_peers().len(), 1);

        wallet.set_power_mode(PowerMode::Low).unwrap();
        wallet.set_power_mode(PowerMode::Low).unwrap();
        assert_eq!(wallet.power_mode(), PowerMode::Low);
        let power_calls = net
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ConnectivityCall::PowerMode(_)))
            .count();
        assert_eq!(power_calls, 1);
    }

    #[test]
    fn test_key_values() {
        let wallet = wallet_with(Arc::new(RecordingConnectivity::new()));
        wallet.set_key_value("theme", "dark").unwrap();
        assert_eq!(wallet.get_key_value("theme").unwrap(), "dark");
        assert!(wallet.remove_key_value("theme"));
        assert!(matches!(
            wallet.get_key_value("theme"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn test_chain_tip_releases_timelocked_funds() {
        let wallet = wallet_with(Arc::new(RecordingConnectivity::new()));
        wallet
            .handle_protocol_event(ProtocolEvent::OutputRecovered {
                amount: 700,
                source_public_key: key(),
                lock_height: 50,
                message: "recovered".into(),
            })
            .unwrap();
        assert_eq!(wallet.balance().timelocked, 700);
        wallet
            .handle_protocol_event(ProtocolEvent::BaseNodeState { chain_tip: 50 })
            .unwrap();
        let balance = wallet.balance();
        assert_eq!(balance.timelocked, 0);
        assert_eq!(balance.available, 700);
    }

    #[test]
    fn test_restart_broadcast_returns_fresh_request_ids() {
        let wallet = wallet_with(Arc::new(RecordingConnectivity::new()));
        let first = wallet.restart_transaction_broadcast().unwrap();
        let second = wallet.restart_transaction_broadcast().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_public_key_derives_from_seed_words() {
        let wallet = wallet_with(Arc::new(RecordingConnectivity::new()));
        let seed_words = wallet.seed_words();
        assert!(seed_words.is_complete());
        assert_eq!(
            seed_words.derive_master_key(None).unwrap().public_key(),
            wallet.public_key()
        );
    }
}
