//! Wallet recovery from seed words
//!
//! A recovery run is a long background scan performed by the connectivity
//! layer. It reports back through `ProtocolEvent::RecoveryProgress`, which the
//! coordinator forwards to the listener, and through
//! `ProtocolEvent::OutputRecovered` for each output it finds.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::data_structures::PublicKey;
use crate::errors::WalletResult;
use crate::events::{EventDispatcher, RecoveryPhase, RecoveryProgress, WalletEvent};
use crate::network::WalletConnectivity;

#[derive(Debug, Clone)]
pub struct RecoveryRun {
    pub base_node: PublicKey,
    pub started_at: Instant,
    pub last_progress: Option<RecoveryProgress>,
}

pub struct RecoveryCoordinator {
    dispatcher: Arc<EventDispatcher>,
    connectivity: Arc<dyn WalletConnectivity>,
    run: Mutex<Option<RecoveryRun>>,
}

impl RecoveryCoordinator {
    pub fn new(dispatcher: Arc<EventDispatcher>, connectivity: Arc<dyn WalletConnectivity>) -> Self {
        Self {
            dispatcher,
            connectivity,
            run: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<RecoveryRun>> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin scanning the chain through `base_node`
    ///
    /// Returns `Ok(false)` without starting anything when there is no listener
    /// to report progress to, or when a run is already in progress.
    pub fn start_recovery(&self, base_node: PublicKey, output_message: &str) -> WalletResult<bool> {
        if !self.dispatcher.has_listener() {
            warn!(%base_node, "Recovery not started: no listener to report progress to");
            return Ok(false);
        }

        let mut run = self.lock();
        if let Some(current) = run.as_ref() {
            warn!(
                base_node = %current.base_node,
                "Recovery not started: a recovery is already running"
            );
            return Ok(false);
        }

        self.connectivity
            .start_recovery_scan(&base_node, output_message)?;
        *run = Some(RecoveryRun {
            base_node,
            started_at: Instant::now(),
            last_progress: None,
        });
        info!(%base_node, "Wallet recovery started");
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    pub fn current_run(&self) -> Option<RecoveryRun> {
        self.lock().clone()
    }

    /// Forward a progress report; terminal phases end the run
    ///
    /// Unrecognised phase values are passed through as `RecoveryPhase::Unknown`.
    pub fn on_progress(&self, phase: u8, current: u64, total: u64) -> RecoveryProgress {
        let progress = RecoveryProgress {
            phase: RecoveryPhase::from(phase),
            current,
            total,
        };

        let mut run = self.lock();
        match run.as_mut() {
            Some(active) => active.last_progress = Some(progress),
            None => debug!(?progress, "Recovery progress without an active run"),
        }

        match progress.phase {
            RecoveryPhase::Unknown(value) => {
                info!(value, current, total, "Unrecognised recovery phase")
            }
            RecoveryPhase::ScanningRoundFailed | RecoveryPhase::ConnectionFailed => {
                warn!(phase = ?progress.phase, current, total, "Recovery round failed, retrying")
            }
            _ => debug!(phase = ?progress.phase, current, total, "Recovery progress"),
        }

        if progress.phase.is_terminal() {
            if let Some(finished) = run.take() {
                info!(
                    phase = ?progress.phase,
                    elapsed_ms = finished.started_at.elapsed().as_millis() as u64,
                    "Wallet recovery finished"
                );
            }
        }

        // published under the run lock so terminal reports stay last
        self.dispatcher
            .publish(WalletEvent::RecoveryProgress(progress));
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::PrivateKey;
    use crate::events::listeners::MockEventListener;
    use crate::network::{ConnectivityCall, RecordingConnectivity};
    use std::time::Duration;

    fn base_node() -> PublicKey {
        PrivateKey::random().public_key()
    }

    #[test]
    fn test_start_without_listener_is_refused() {
        let net = Arc::new(RecordingConnectivity::new());
        let recovery = RecoveryCoordinator::new(Arc::new(EventDispatcher::new()), net.clone());
        assert!(!recovery.start_recovery(base_node(), "recovered").unwrap());
        assert!(!recovery.is_running());
        assert!(net.calls().is_empty());
    }

    #[tokio::test]
    async fn test_progress_until_completion() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let listener = MockEventListener::new();
        dispatcher
            .set_listener(Box::new(listener.clone()), None)
            .unwrap();
        let net = Arc::new(RecordingConnectivity::new());
        let recovery = RecoveryCoordinator::new(dispatcher.clone(), net.clone());

        let node = base_node();
        assert!(recovery.start_recovery(node, "recovered").unwrap());
        assert!(!recovery.start_recovery(node, "recovered").unwrap());
        assert_eq!(net.calls(), vec![ConnectivityCall::RecoveryScan(node)]);

        recovery.on_progress(0, 0, 0);
        recovery.on_progress(3, 5, 10);
        let unknown = recovery.on_progress(42, 6, 10);
        assert_eq!(unknown.phase, RecoveryPhase::Unknown(42));
        assert!(recovery.is_running());
        assert_eq!(
            recovery.current_run().unwrap().last_progress,
            Some(unknown)
        );

        recovery.on_progress(4, 10, 10);
        assert!(!recovery.is_running());

        assert!(dispatcher.flush(Duration::from_secs(5)));
        listener
            .assert_event_type_count("RecoveryProgress", 4)
            .unwrap();
        // a new run may start once the previous one finished
        assert!(recovery.start_recovery(node, "again").unwrap());
    }
}
