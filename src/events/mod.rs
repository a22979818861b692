//! Event system for wallet notifications
//!
//! Native worker threads (network, mining status, base node sync, recovery)
//! produce [`ProtocolEvent`]s. Once the wallet has applied one, it publishes
//! the resulting [`WalletEvent`] to the [`EventDispatcher`], which serializes
//! delivery to the single registered [`WalletEventListener`].
//!
//! # Core Components
//!
//! - [`WalletEventListener`] trait: one async method per notification kind
//! - [`EventDispatcher`]: single-consumer queue drained on a dedicated thread
//! - [`ExecutionContext`]: attach hook run around every delivery
//! - [`listeners`]: built-in listeners for tests and logging
//!
//! # Delivery guarantees
//!
//! - Events published from one thread are delivered in publish order. The
//!   wallet publishes while holding its transaction store lock, so events for
//!   one transaction id reach the listener in the order they were applied.
//! - With no listener registered, events are dropped. They are not queued for
//!   a listener registered later.
//! - Delivery is at-most-once. Listener errors and attach failures are logged
//!   and the event is discarded.
//! - A balance update is never delivered after a newer one.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use tari_wallet_core::events::{EventDispatcher, listeners::MockEventListener};
//!
//! let dispatcher = EventDispatcher::new();
//! let listener = MockEventListener::new();
//! let captured = listener.get_captured_events();
//! dispatcher.set_listener(Box::new(listener), None)?;
//! ```

use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{WalletError, WalletResult};

pub mod context;
pub mod listener;
pub mod listeners;
pub mod types;

pub use context::{ContextAttachment, ContextError, ExecutionContext, OwnedThreadContext};
pub use listener::{deliver, ListenerResult, WalletEventListener};
pub use types::*;

/// Name of the delivery thread
pub const EVENT_THREAD_NAME: &str = "wallet-events";

/// Debug information about one delivery
#[derive(Debug, Clone)]
pub struct EventTrace {
    pub event_type: String,
    pub listener_name: String,
    pub processing_duration: Duration,
    pub success: bool,
    pub error_message: Option<String>,
    pub timestamp: Instant,
}

/// Statistics about event processing
#[derive(Debug, Default, Clone)]
pub struct EventStats {
    pub total_events_published: usize,
    pub dropped_no_listener: usize,
    pub total_delivered: usize,
    pub total_listener_errors: usize,
    pub attach_failures: usize,
    pub stale_balance_dropped: usize,
    pub events_by_type: HashMap<String, usize>,
}

enum Envelope {
    Event(WalletEvent),
    Flush(std_mpsc::SyncSender<()>),
}

struct Worker {
    sender: mpsc::UnboundedSender<Envelope>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

#[derive(Default)]
struct Shared {
    stats: Mutex<EventStats>,
    traces: Mutex<Vec<EventTrace>>,
}

impl Shared {
    fn stats(&self) -> std::sync::MutexGuard<'_, EventStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn add_trace(&self, trace: EventTrace, max_entries: usize) {
        let mut traces = self.traces.lock().unwrap_or_else(|e| e.into_inner());
        traces.push(trace);
        if traces.len() > max_entries {
            let excess = traces.len() - max_entries;
            traces.drain(0..excess);
        }
    }
}

/// Single-consumer dispatcher feeding one listener
///
/// The listener can be set once. It then lives on a dedicated thread running
/// a current-thread tokio runtime, which is the execution context that owns
/// every callback. Producers only ever push into an unbounded channel, so
/// publishing never blocks on a slow listener.
pub struct EventDispatcher {
    worker: Mutex<Option<Worker>>,
    listener_set: Mutex<bool>,
    shared: Arc<Shared>,
    debug_mode: bool,
    max_trace_entries: usize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            worker: Mutex::new(None),
            listener_set: Mutex::new(false),
            shared: Arc::new(Shared::default()),
            debug_mode: false,
            max_trace_entries: 1000,
        }
    }

    /// Dispatcher that records an [`EventTrace`] for every delivery
    pub fn new_with_debug() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.debug_mode = true;
        dispatcher
    }

    /// Register the listener and start the delivery thread
    ///
    /// `context` defaults to [`OwnedThreadContext`]. Fails with
    /// `InvalidWalletState` if a listener was already registered, even after
    /// shutdown: a wallet gets one listener for its whole lifetime.
    pub fn set_listener(
        &self,
        listener: Box<dyn WalletEventListener>,
        context: Option<Arc<dyn ExecutionContext>>,
    ) -> WalletResult<()> {
        let mut listener_set = self.listener_set.lock().unwrap_or_else(|e| e.into_inner());
        if *listener_set {
            return Err(WalletError::InvalidWalletState(
                "a listener is already registered for this wallet".into(),
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| WalletError::Internal(format!("event runtime: {e}")))?;
        let context = context.unwrap_or_else(|| Arc::new(OwnedThreadContext));
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.shared);
        let debug_mode = self.debug_mode;
        let max_trace_entries = self.max_trace_entries;
        let listener_name = listener.name();

        let handle = thread::Builder::new()
            .name(EVENT_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(run_worker(
                    listener,
                    context,
                    receiver,
                    shared,
                    debug_mode,
                    max_trace_entries,
                ))
            })
            .map_err(|e| WalletError::Internal(format!("event thread: {e}")))?;

        let thread_id = handle.thread().id();
        *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(Worker {
            sender,
            handle: Some(handle),
            thread_id,
        });
        *listener_set = true;
        info!(listener = listener_name, "Registered wallet event listener");
        Ok(())
    }

    pub fn has_listener(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Queue an event for delivery; returns whether it was queued
    pub fn publish(&self, event: WalletEvent) -> bool {
        let event_type = event.event_type();
        {
            let mut stats = self.shared.stats();
            stats.total_events_published += 1;
            *stats
                .events_by_type
                .entry(event_type.to_string())
                .or_insert(0) += 1;
        }

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        let queued = match worker.as_ref() {
            Some(worker) => worker.sender.send(Envelope::Event(event)).is_ok(),
            None => false,
        };
        drop(worker);

        if !queued {
            self.shared.stats().dropped_no_listener += 1;
            debug!(event_type, "No listener registered, dropping event");
        }
        queued
    }

    /// Block until every event queued before this call has been delivered
    ///
    /// Returns `false` on timeout, or when called from the delivery thread
    /// itself (which would otherwise wait on its own queue).
    pub fn flush(&self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = std_mpsc::sync_channel(1);
        {
            let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            let Some(worker) = worker.as_ref() else {
                return true;
            };
            if worker.thread_id == thread::current().id() {
                warn!("flush called from the event thread, skipping");
                return false;
            }
            if worker.sender.send(Envelope::Flush(ack_tx)).is_err() {
                return true;
            }
        }
        ack_rx.recv_timeout(timeout).is_ok()
    }

    /// Stop accepting events, let the queue drain and join the delivery thread
    pub fn shutdown(&self) {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut worker) = worker else {
            return;
        };
        drop(worker.sender);
        if worker.thread_id == thread::current().id() {
            // dropped from inside a callback; the thread exits once the queue drains
            return;
        }
        if let Some(handle) = worker.handle.take() {
            if handle.join().is_err() {
                error!("Event delivery thread panicked");
            }
        }
    }

    pub fn get_stats(&self) -> EventStats {
        self.shared.stats().clone()
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.debug_mode
    }

    /// Delivery traces, oldest first; empty unless debug mode is on
    pub fn get_traces(&self) -> Vec<EventTrace> {
        self.shared
            .traces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get_traces_for_event_type(&self, event_type: &str) -> Vec<EventTrace> {
        self.get_traces()
            .into_iter()
            .filter(|t| t.event_type == event_type)
            .collect()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(
    mut listener: Box<dyn WalletEventListener>,
    context: Arc<dyn ExecutionContext>,
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    shared: Arc<Shared>,
    debug_mode: bool,
    max_trace_entries: usize,
) {
    let listener_name = listener.name();
    let mut last_balance_version = 0u64;

    while let Some(envelope) = receiver.recv().await {
        let event = match envelope {
            Envelope::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
            Envelope::Event(event) => event,
        };
        let event_type = event.event_type();

        if let WalletEvent::BalanceUpdated { version, .. } = &event {
            if *version <= last_balance_version {
                shared.stats().stale_balance_dropped += 1;
                debug!(version, last_balance_version, "Dropping stale balance update");
                continue;
            }
            last_balance_version = *version;
        }

        let attachment = match ContextAttachment::enter(Arc::clone(&context)) {
            Ok(attachment) => attachment,
            Err(e) => {
                shared.stats().attach_failures += 1;
                warn!(event_type, error = %e, "Could not attach to listener context, dropping event");
                continue;
            }
        };

        let started = Instant::now();
        let result = deliver(listener.as_mut(), &event).await;
        drop(attachment);
        let processing_duration = started.elapsed();

        let error_message = match &result {
            Ok(()) => {
                shared.stats().total_delivered += 1;
                None
            }
            Err(e) => {
                shared.stats().total_listener_errors += 1;
                warn!(listener = listener_name, event_type, error = %e, "Event listener failed");
                Some(e.to_string())
            }
        };

        if debug_mode {
            debug!(
                listener = listener_name,
                event_type,
                ?processing_duration,
                success = error_message.is_none(),
                "Delivered event"
            );
            shared.add_trace(
                EventTrace {
                    event_type: event_type.to_string(),
                    listener_name: listener_name.to_string(),
                    processing_duration,
                    success: error_message.is_none(),
                    error_message,
                    timestamp: started,
                },
                max_trace_entries,
            );
        }
    }
    debug!(listener = listener_name, "Event delivery thread stopped");
}

#[cfg(test)]
mod tests {
    use super::context::tests::CountingContext;
    use super::listeners::MockEventListener;
    use super::*;
    use crate::data_structures::{Balance, ConnectivityStatus, TxId};
    use std::sync::atomic::Ordering;

    const WAIT: Duration = Duration::from_secs(5);

    fn balance_event(available: u64, version: u64) -> WalletEvent {
        WalletEvent::BalanceUpdated {
            balance: Balance {
                available,
                ..Balance::default()
            },
            version,
        }
    }

    #[tokio::test]
    async fn test_events_without_listener_are_dropped() {
        let dispatcher = EventDispatcher::new();
        assert!(!dispatcher.publish(balance_event(1, 1)));
        assert!(dispatcher.flush(WAIT));

        let listener = MockEventListener::new();
        let captured = listener.get_captured_events();
        dispatcher.set_listener(Box::new(listener), None).unwrap();
        assert!(dispatcher.flush(WAIT));

        // nothing published before registration is replayed
        assert!(captured.lock().unwrap().is_empty());
        assert_eq!(dispatcher.get_stats().dropped_no_listener, 1);
    }

    #[tokio::test]
    async fn test_listener_can_only_be_set_once() {
        let dispatcher = EventDispatcher::new();
        dispatcher
            .set_listener(Box::new(MockEventListener::new()), None)
            .unwrap();
        let err = dispatcher
            .set_listener(Box::new(MockEventListener::new()), None)
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidWalletState(_)));
    }

    #[tokio::test]
    async fn test_delivery_preserves_publish_order() {
        let dispatcher = EventDispatcher::new();
        let listener = MockEventListener::new();
        let captured = listener.get_captured_events();
        dispatcher.set_listener(Box::new(listener), None).unwrap();

        for id in 0..50u64 {
            dispatcher.publish(WalletEvent::DirectSendResult {
                tx_id: TxId::new(id),
                success: true,
            });
        }
        assert!(dispatcher.flush(WAIT));

        let ids: Vec<u64> = captured
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.event.tx_id())
            .map(|id| id.as_u64())
            .collect();
        assert_eq!(ids, (0..50).collect::<Vec<_>>());
        assert_eq!(dispatcher.get_stats().total_delivered, 50);
    }

    #[tokio::test]
    async fn test_stale_balance_is_not_delivered_after_newer() {
        let dispatcher = EventDispatcher::new();
        let listener = MockEventListener::new();
        let captured = listener.get_captured_events();
        dispatcher.set_listener(Box::new(listener), None).unwrap();

        dispatcher.publish(balance_event(10, 2));
        dispatcher.publish(balance_event(5, 1));
        dispatcher.publish(balance_event(20, 3));
        assert!(dispatcher.flush(WAIT));

        let available: Vec<u64> = captured
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match &e.event {
                WalletEvent::BalanceUpdated { balance, .. } => Some(balance.available),
                _ => None,
            })
            .collect();
        assert_eq!(available, vec![10, 20]);
        assert_eq!(dispatcher.get_stats().stale_balance_dropped, 1);
    }

    #[tokio::test]
    async fn test_listener_errors_are_isolated() {
        let dispatcher = EventDispatcher::new_with_debug();
        let listener = MockEventListener::builder().fail_on_event_types(vec!["ConnectivityStatus"]).build();
        let captured = listener.get_captured_events();
        dispatcher.set_listener(Box::new(listener), None).unwrap();

        dispatcher.publish(WalletEvent::ConnectivityStatus(ConnectivityStatus::Online));
        dispatcher.publish(balance_event(1, 1));
        assert!(dispatcher.flush(WAIT));

        let stats = dispatcher.get_stats();
        assert_eq!(stats.total_listener_errors, 1);
        assert_eq!(stats.total_delivered, 1);
        assert_eq!(captured.lock().unwrap().len(), 1);

        let traces = dispatcher.get_traces_for_event_type("ConnectivityStatus");
        assert_eq!(traces.len(), 1);
        assert!(!traces[0].success);
    }

    #[tokio::test]
    async fn test_attach_and_detach_are_paired() {
        let dispatcher = EventDispatcher::new();
        let context = Arc::new(CountingContext::default());
        let listener = MockEventListener::builder().fail_on_event_types(vec!["ConnectivityStatus"]).build();
        dispatcher
            .set_listener(Box::new(listener), Some(context.clone()))
            .unwrap();

        dispatcher.publish(balance_event(1, 1));
        dispatcher.publish(WalletEvent::ConnectivityStatus(ConnectivityStatus::Offline));
        assert!(dispatcher.flush(WAIT));

        assert_eq!(context.attaches.load(Ordering::SeqCst), 2);
        assert_eq!(context.detaches.load(Ordering::SeqCst), 2);
        assert!(!context.is_attached());
    }

    #[tokio::test]
    async fn test_attach_failure_drops_event() {
        let dispatcher = EventDispatcher::new();
        let context = Arc::new(CountingContext::default());
        context.refuse.store(true, Ordering::SeqCst);
        let listener = MockEventListener::new();
        let captured = listener.get_captured_events();
        dispatcher
            .set_listener(Box::new(listener), Some(context.clone()))
            .unwrap();

        dispatcher.publish(balance_event(1, 1));
        assert!(dispatcher.flush(WAIT));
        assert!(captured.lock().unwrap().is_empty());
        assert_eq!(dispatcher.get_stats().attach_failures, 1);
        assert_eq!(context.detaches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_stops_accepting() {
        let dispatcher = EventDispatcher::new();
        let listener = MockEventListener::new();
        let captured = listener.get_captured_events();
        dispatcher.set_listener(Box::new(listener), None).unwrap();
        dispatcher.publish(balance_event(1, 1));
        dispatcher.shutdown();

        assert_eq!(captured.lock().unwrap().len(), 1);
        assert!(!dispatcher.publish(balance_event(2, 2)));
        assert!(!dispatcher.has_listener());
    }
}
