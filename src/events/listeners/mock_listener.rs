//! Mock event listener for testing scenarios
//!
//! Captures every notification it receives, in delivery order, and provides
//! assertion helpers over the captured sequence.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use tari_wallet_core::events::listeners::MockEventListener;
//!
//! let mock = MockEventListener::new();
//! let captured = mock.get_captured_events();
//! let handle = mock.clone();
//! wallet.set_listener(Box::new(mock))?;
//!
//! // ... drive the wallet ...
//! wallet.flush_events();
//!
//! handle.assert_event_type_count("TransactionBroadcast", 1)?;
//! handle.assert_last_event_type("BalanceUpdated")?;
//! ```
//!
//! ## Error testing
//! ```rust,ignore
//! let mock = MockEventListener::builder()
//!     .fail_on_event_types(["BalanceUpdated"])
//!     .failure_message("listener offline")
//!     .build();
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::data_structures::{
    Balance, CancellationReason, CompletedTransaction, ConnectivityStatus, ContactLiveness,
    PendingInboundTransaction, RequestId, TxId,
};
use crate::events::listener::{ListenerResult, WalletEventListener};
use crate::events::types::{RecoveryProgress, WalletEvent};

/// Configuration for the mock event listener
#[derive(Debug, Clone)]
pub struct MockListenerConfig {
    /// Maximum number of events to keep; oldest are dropped first
    pub max_events: Option<usize>,
    /// Event types to capture (None means capture all)
    pub event_type_filter: Option<Vec<String>>,
    /// Event types the listener reports a failure for
    pub fail_on_event_types: Vec<String>,
    pub failure_message: String,
}

impl Default for MockListenerConfig {
    fn default() -> Self {
        Self {
            max_events: Some(10_000),
            event_type_filter: None,
            fail_on_event_types: Vec::new(),
            failure_message: "Mock listener test failure".to_string(),
        }
    }
}

/// A notification as the listener saw it
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub event_type: String,
    pub event: WalletEvent,
    pub capture_time: SystemTime,
}

/// Statistics about captured events
#[derive(Debug, Clone, Default)]
pub struct MockListenerStats {
    pub total_events: usize,
    pub events_by_type: HashMap<String, usize>,
    /// Deliveries the listener failed on purpose
    pub failed_events: usize,
}

/// Builder for configuring MockEventListener
#[derive(Debug, Default)]
pub struct MockListenerBuilder {
    config: MockListenerConfig,
}

impl MockListenerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_events(mut self, max: usize) -> Self {
        self.config.max_events = Some(max);
        self
    }

    pub fn unlimited_events(mut self) -> Self {
        self.config.max_events = None;
        self
    }

    /// Only capture the named event types
    pub fn capture_only<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.event_type_filter = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// Return an error (without capturing) for the named event types
    pub fn fail_on_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.fail_on_event_types = event_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.config.failure_message = message.into();
        self
    }

    pub fn build(self) -> MockEventListener {
        MockEventListener::with_config(self.config)
    }
}

/// Mock event listener that captures events for testing
///
/// Clones share the same capture buffer, so a test can keep one clone while
/// the wallet owns the other.
#[derive(Clone)]
pub struct MockEventListener {
    config: MockListenerConfig,
    captured_events: Arc<Mutex<Vec<CapturedEvent>>>,
    stats: Arc<Mutex<MockListenerStats>>,
}

impl MockEventListener {
    pub fn new() -> Self {
        Self::with_config(MockListenerConfig::default())
    }

    pub fn with_config(config: MockListenerConfig) -> Self {
        Self {
            config,
            captured_events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(MockListenerStats::default())),
        }
    }

    pub fn builder() -> MockListenerBuilder {
        MockListenerBuilder::new()
    }

    /// Shared handle to the captured events
    pub fn get_captured_events(&self) -> Arc<Mutex<Vec<CapturedEvent>>> {
        self.captured_events.clone()
    }

    pub fn get_stats(&self) -> MockListenerStats {
        lock(&self.stats).clone()
    }

    pub fn clear(&self) {
        lock(&self.captured_events).clear();
        *lock(&self.stats) = MockListenerStats::default();
    }

    /// Captured notifications in delivery order
    pub fn events(&self) -> Vec<WalletEvent> {
        lock(&self.captured_events)
            .iter()
            .map(|c| c.event.clone())
            .collect()
    }

    /// Captured notifications about one transaction, in delivery order
    pub fn events_for(&self, tx_id: TxId) -> Vec<WalletEvent> {
        lock(&self.captured_events)
            .iter()
            .filter(|c| c.event.tx_id() == Some(tx_id))
            .map(|c| c.event.clone())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.captured_events).len()
    }

    pub fn event_type_count(&self, event_type: &str) -> usize {
        lock(&self.captured_events)
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    pub fn get_events_of_type(&self, event_type: &str) -> Vec<CapturedEvent> {
        lock(&self.captured_events)
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn get_last_event(&self) -> Option<CapturedEvent> {
        lock(&self.captured_events).last().cloned()
    }

    /// Most recent balance delivered, if any
    pub fn last_balance(&self) -> Option<Balance> {
        lock(&self.captured_events)
            .iter()
            .rev()
            .find_map(|c| match &c.event {
                WalletEvent::BalanceUpdated { balance, .. } => Some(*balance),
                _ => None,
            })
    }

    // Assertion helpers

    pub fn assert_event_count(&self, expected: usize) -> Result<(), String> {
        let actual = self.event_count();
        if actual != expected {
            return Err(format!(
                "Expected {} events, but captured {}",
                expected, actual
            ));
        }
        Ok(())
    }

    pub fn assert_event_type_count(&self, event_type: &str, expected: usize) -> Result<(), String> {
        let actual = self.event_type_count(event_type);
        if actual != expected {
            return Err(format!(
                "Expected {} '{}' events, but captured {}",
                expected, event_type, actual
            ));
        }
        Ok(())
    }

    pub fn assert_last_event_type(&self, expected_type: &str) -> Result<(), String> {
        match self.get_last_event() {
            Some(event) if event.event_type == expected_type => Ok(()),
            Some(event) => Err(format!(
                "Last event was '{}', expected '{}'",
                event.event_type, expected_type
            )),
            None => Err("No events captured".to_string()),
        }
    }

    /// Assert the event types seen for one transaction, in order
    pub fn assert_tx_sequence(&self, tx_id: TxId, expected_types: &[&str]) -> Result<(), String> {
        let actual: Vec<&'static str> = self
            .events_for(tx_id)
            .iter()
            .map(|e| e.event_type())
            .collect();
        if actual != expected_types {
            return Err(format!(
                "Events for transaction {} were {:?}, expected {:?}",
                tx_id, actual, expected_types
            ));
        }
        Ok(())
    }

    fn should_capture_event_type(&self, event_type: &str) -> bool {
        match &self.config.event_type_filter {
            Some(filter) => filter.iter().any(|t| t == event_type),
            None => true,
        }
    }

    fn should_fail_on_event_type(&self, event_type: &str) -> bool {
        self.config
            .fail_on_event_types
            .iter()
            .any(|t| t == event_type)
    }

    fn record(&mut self, event: WalletEvent) -> ListenerResult {
        let event_type = event.event_type();
        if self.should_fail_on_event_type(event_type) {
            lock(&self.stats).failed_events += 1;
            return Err(self.config.failure_message.clone().into());
        }
        if !self.should_capture_event_type(event_type) {
            return Ok(());
        }

        {
            let mut stats = lock(&self.stats);
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event_type.to_string())
                .or_insert(0) += 1;
        }

        let mut events = lock(&self.captured_events);
        events.push(CapturedEvent {
            event_type: event_type.to_string(),
            event,
            capture_time: SystemTime::now(),
        });
        if let Some(max_events) = self.config.max_events {
            if events.len() > max_events {
                let excess = events.len() - max_events;
                events.drain(0..excess);
            }
        }
        Ok(())
    }
}

impl Default for MockEventListener {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl WalletEventListener for MockEventListener {
    async fn on_transaction_received(&mut self, tx: &PendingInboundTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionReceived(tx.clone()))
    }

    async fn on_transaction_reply_received(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionReplyReceived(tx.clone()))
    }

    async fn on_transaction_finalized(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionFinalized(tx.clone()))
    }

    async fn on_transaction_broadcast(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionBroadcast(tx.clone()))
    }

    async fn on_transaction_mined(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionMined(tx.clone()))
    }

    async fn on_transaction_mined_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult {
        self.record(WalletEvent::TransactionMinedUnconfirmed {
            transaction: tx.clone(),
            confirmations,
        })
    }

    async fn on_transaction_faux_confirmed(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        self.record(WalletEvent::TransactionFauxConfirmed(tx.clone()))
    }

    async fn on_transaction_faux_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult {
        self.record(WalletEvent::TransactionFauxUnconfirmed {
            transaction: tx.clone(),
            confirmations,
        })
    }

    async fn on_transaction_cancelled(
        &mut self,
        tx: &CompletedTransaction,
        reason: CancellationReason,
    ) -> ListenerResult {
        self.record(WalletEvent::TransactionCancelled {
            transaction: tx.clone(),
            reason,
        })
    }

    async fn on_direct_send_result(&mut self, tx_id: TxId, success: bool) -> ListenerResult {
        self.record(WalletEvent::DirectSendResult { tx_id, success })
    }

    async fn on_store_and_forward_send_result(
        &mut self,
        tx_id: TxId,
        success: bool,
    ) -> ListenerResult {
        self.record(WalletEvent::StoreAndForwardSendResult { tx_id, success })
    }

    async fn on_txo_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult {
        self.record(WalletEvent::TxoValidationComplete {
            request_id,
            success,
        })
    }

    async fn on_transaction_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult {
        self.record(WalletEvent::TransactionValidationComplete {
            request_id,
            success,
        })
    }

    async fn on_contact_liveness_updated(&mut self, liveness: &ContactLiveness) -> ListenerResult {
        self.record(WalletEvent::ContactLivenessUpdated(liveness.clone()))
    }

    async fn on_balance_updated(&mut self, balance: &Balance) -> ListenerResult {
        // the version is a dispatcher concern; listeners only see the balance
        self.record(WalletEvent::BalanceUpdated {
            balance: *balance,
            version: 0,
        })
    }

    async fn on_connectivity_status(&mut self, status: ConnectivityStatus) -> ListenerResult {
        self.record(WalletEvent::ConnectivityStatus(status))
    }

    async fn on_recovery_progress(&mut self, progress: &RecoveryProgress) -> ListenerResult {
        self.record(WalletEvent::RecoveryProgress(*progress))
    }

    fn name(&self) -> &'static str {
        "MockEventListener"
    }
}
