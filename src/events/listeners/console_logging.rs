//! Logging listener for development and debugging
//!
//! Writes every notification it is interested in to the `tracing` subscriber
//! under the `wallet::events` target, with configurable verbosity.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::data_structures::{
    Balance, CancellationReason, CompletedTransaction, ConnectivityStatus, ContactLiveness,
    PendingInboundTransaction, RequestId, TxId,
};
use crate::events::listener::{ListenerResult, WalletEventListener};
use crate::events::types::{RecoveryPhase, RecoveryProgress};
use crate::lifecycle::direction_label;

/// Verbosity levels for console logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Only failures and cancellations
    Minimal,
    /// Transaction milestones, validation results and recovery
    Normal,
    /// Everything, including balance and liveness updates
    Verbose,
    /// Everything, with full record dumps
    Debug,
}

impl LogLevel {
    /// Check if an event type should be logged at this level
    pub fn should_log(&self, event_type: &str) -> bool {
        const MINIMAL: &[&str] = &["TransactionCancelled", "RecoveryFailed"];
        const NORMAL: &[&str] = &[
            "TransactionReceived",
            "TransactionFinalized",
            "TransactionBroadcast",
            "TransactionMined",
            "TransactionFauxConfirmed",
            "TxoValidationComplete",
            "TransactionValidationComplete",
            "RecoveryProgress",
            "ConnectivityStatus",
        ];
        match self {
            LogLevel::Minimal => MINIMAL.contains(&event_type),
            LogLevel::Normal => MINIMAL.contains(&event_type) || NORMAL.contains(&event_type),
            LogLevel::Verbose | LogLevel::Debug => true,
        }
    }
}

/// Configuration for console logging output
#[derive(Debug, Clone)]
pub struct ConsoleLoggingConfig {
    pub log_level: LogLevel,
    /// Custom prefix for all log messages
    pub log_prefix: Option<String>,
    /// Maximum length for truncating long messages
    pub max_message_length: Option<usize>,
}

impl Default for ConsoleLoggingConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_prefix: None,
            max_message_length: None,
        }
    }
}

impl ConsoleLoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_message_length(mut self, max_length: usize) -> Self {
        self.max_message_length = Some(max_length);
        self
    }

    pub fn minimal() -> Self {
        Self::new().with_log_level(LogLevel::Minimal)
    }

    pub fn debug() -> Self {
        Self::new().with_log_level(LogLevel::Debug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Warn,
}

/// Listener that logs notifications through `tracing`
pub struct ConsoleLoggingListener {
    config: ConsoleLoggingConfig,
    events_logged: Arc<Mutex<usize>>,
}

impl ConsoleLoggingListener {
    pub fn new() -> Self {
        Self::with_config(ConsoleLoggingConfig::default())
    }

    pub fn with_config(config: ConsoleLoggingConfig) -> Self {
        Self {
            config,
            events_logged: Arc::new(Mutex::new(0)),
        }
    }

    pub fn minimal() -> Self {
        Self::with_config(ConsoleLoggingConfig::minimal())
    }

    pub fn debug() -> Self {
        Self::with_config(ConsoleLoggingConfig::debug())
    }

    /// Shared counter of lines written
    pub fn events_logged(&self) -> Arc<Mutex<usize>> {
        self.events_logged.clone()
    }

    fn truncate_message(&self, message: String) -> String {
        match self.config.max_message_length {
            Some(max) if message.chars().count() > max => {
                let truncated: String = message.chars().take(max).collect();
                format!("{truncated}...")
            }
            _ => message,
        }
    }

    fn format_transaction(&self, tx: &CompletedTransaction) -> String {
        if self.config.log_level == LogLevel::Debug {
            return format!("{tx:?}");
        }
        format!(
            "tx {} ({}) amount={} fee={} status={:?} confirmations={}",
            tx.tx_id,
            direction_label(tx),
            tx.amount,
            tx.fee,
            tx.status,
            tx.confirmations
        )
    }

    fn log(&self, event_type: &str, severity: Severity, message: String) -> ListenerResult {
        if !self.config.log_level.should_log(event_type) {
            return Ok(());
        }
        let message = self.truncate_message(message);
        let prefix = self.config.log_prefix.as_deref().unwrap_or("");
        match severity {
            Severity::Info => info!(target: "wallet::events", event_type, "{prefix}{message}"),
            Severity::Warn => warn!(target: "wallet::events", event_type, "{prefix}{message}"),
        }
        *self.events_logged.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

impl Default for ConsoleLoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletEventListener for ConsoleLoggingListener {
    async fn on_transaction_received(&mut self, tx: &PendingInboundTransaction) -> ListenerResult {
        self.log(
            "TransactionReceived",
            Severity::Info,
            format!(
                "Received tx {} for {} from {}",
                tx.tx_id, tx.amount, tx.source_public_key
            ),
        )
    }

    async fn on_transaction_reply_received(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        let message = format!("Reply received: {}", self.format_transaction(tx));
        self.log("TransactionReplyReceived", Severity::Info, message)
    }

    async fn on_transaction_finalized(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        let message = format!("Finalized: {}", self.format_transaction(tx));
        self.log("TransactionFinalized", Severity::Info, message)
    }

    async fn on_transaction_broadcast(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        let message = format!("Broadcast: {}", self.format_transaction(tx));
        self.log("TransactionBroadcast", Severity::Info, message)
    }

    async fn on_transaction_mined(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        let message = format!("Mined: {}", self.format_transaction(tx));
        self.log("TransactionMined", Severity::Info, message)
    }

    async fn on_transaction_mined_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult {
        let message = format!(
            "Mined unconfirmed ({confirmations}): {}",
            self.format_transaction(tx)
        );
        self.log("TransactionMinedUnconfirmed", Severity::Info, message)
    }

    async fn on_transaction_faux_confirmed(&mut self, tx: &CompletedTransaction) -> ListenerResult {
        let message = format!("Faux confirmed: {}", self.format_transaction(tx));
        self.log("TransactionFauxConfirmed", Severity::Info, message)
    }

    async fn on_transaction_faux_unconfirmed(
        &mut self,
        tx: &CompletedTransaction,
        confirmations: u64,
    ) -> ListenerResult {
        let message = format!(
            "Faux unconfirmed ({confirmations}): {}",
            self.format_transaction(tx)
        );
        self.log("TransactionFauxUnconfirmed", Severity::Info, message)
    }

    async fn on_transaction_cancelled(
        &mut self,
        tx: &CompletedTransaction,
        reason: CancellationReason,
    ) -> ListenerResult {
        let message = format!("Cancelled ({reason:?}): {}", self.format_transaction(tx));
        self.log("TransactionCancelled", Severity::Warn, message)
    }

    async fn on_direct_send_result(&mut self, tx_id: TxId, success: bool) -> ListenerResult {
        self.log(
            "DirectSendResult",
            if success { Severity::Info } else { Severity::Warn },
            format!("Direct send of tx {tx_id}: success={success}"),
        )
    }

    async fn on_store_and_forward_send_result(
        &mut self,
        tx_id: TxId,
        success: bool,
    ) -> ListenerResult {
        self.log(
            "StoreAndForwardSendResult",
            if success { Severity::Info } else { Severity::Warn },
            format!("Store-and-forward send of tx {tx_id}: success={success}"),
        )
    }

    async fn on_txo_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult {
        self.log(
            "TxoValidationComplete",
            if success { Severity::Info } else { Severity::Warn },
            format!("TXO validation {request_id}: success={success}"),
        )
    }

    async fn on_transaction_validation_complete(
        &mut self,
        request_id: RequestId,
        success: bool,
    ) -> ListenerResult {
        self.log(
            "TransactionValidationComplete",
            if success { Severity::Info } else { Severity::Warn },
            format!("Transaction validation {request_id}: success={success}"),
        )
    }

    async fn on_contact_liveness_updated(&mut self, liveness: &ContactLiveness) -> ListenerResult {
        self.log(
            "ContactLivenessUpdated",
            Severity::Info,
            format!(
                "Contact {} is {:?} (latency {:?} ms)",
                liveness.public_key, liveness.online_status, liveness.latency_ms
            ),
        )
    }

    async fn on_balance_updated(&mut self, balance: &Balance) -> ListenerResult {
        self.log(
            "BalanceUpdated",
            Severity::Info,
            format!(
                "Balance available={} incoming={} outgoing={} timelocked={}",
                balance.available,
                balance.pending_incoming,
                balance.pending_outgoing,
                balance.timelocked
            ),
        )
    }

    async fn on_connectivity_status(&mut self, status: ConnectivityStatus) -> ListenerResult {
        let severity = match status {
            ConnectivityStatus::Offline => Severity::Warn,
            _ => Severity::Info,
        };
        self.log(
            "ConnectivityStatus",
            severity,
            format!("Base node connectivity: {status:?}"),
        )
    }

    async fn on_recovery_progress(&mut self, progress: &RecoveryProgress) -> ListenerResult {
        let (event_type, severity) = match progress.phase {
            RecoveryPhase::RecoveryFailed => ("RecoveryFailed", Severity::Warn),
            RecoveryPhase::ConnectionFailed | RecoveryPhase::ScanningRoundFailed => {
                ("RecoveryProgress", Severity::Warn)
            }
            RecoveryPhase::Unknown(phase) => {
                debug!(phase, "Unrecognised recovery phase");
                ("RecoveryProgress", Severity::Info)
            }
            _ => ("RecoveryProgress", Severity::Info),
        };
        self.log(
            event_type,
            severity,
            format!(
                "Recovery {:?}: {}/{}",
                progress.phase, progress.current, progress.total
            ),
        )
    }

    fn name(&self) -> &'static str {
        "ConsoleLoggingListener"
    }
}
