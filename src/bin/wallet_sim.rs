//! Wallet simulator
//!
//! Drives a wallet against an in-process base node. Several producer threads
//! deliver inbound payments concurrently while the main thread sends outbound
//! transactions; the simulated base node walks every submission through
//! broadcast, mining and confirmation. Notifications are printed by the
//! console logging listener.
//!
//! ```bash
//! cargo run --bin wallet_sim --features cli -- --producers 4 --payments 5 --sends 3
//! RUST_LOG=debug cargo run --bin wallet_sim --features cli -- --verbose --one-sided
//! ```

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use clap::Parser;
use tracing::{error, info, warn};

use tari_wallet_core::data_structures::{
    BaseNodePeer, FeePerGramStat, PowerMode, PrivateKey, PublicKey, RequestId, Transaction, TxId,
};
use tari_wallet_core::events::listeners::{ConsoleLoggingConfig, ConsoleLoggingListener, LogLevel};
use tari_wallet_core::events::ProtocolEvent;
use tari_wallet_core::logging::init_logging;
use tari_wallet_core::network::WalletConnectivity;
use tari_wallet_core::{Wallet, WalletConfig, WalletResult};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Restore from this seed phrase instead of generating one
    #[arg(long)]
    seed_phrase: Option<String>,

    #[arg(long, default_value = "esmeralda")]
    network: String,

    /// Threads delivering inbound payments concurrently
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Inbound payments per producer thread
    #[arg(long, default_value_t = 5)]
    payments: u64,

    /// Amount of each inbound payment in microTari
    #[arg(long, default_value_t = 10_000)]
    payment_amount: u64,

    /// Outbound transactions sent once the inbound payments are mined
    #[arg(long, default_value_t = 3)]
    sends: u64,

    #[arg(long, default_value_t = 2_500)]
    send_amount: u64,

    #[arg(long, default_value_t = 5)]
    fee_per_gram: u64,

    /// Send outbound transactions one-sided
    #[arg(long)]
    one_sided: bool,

    /// Log every notification, including balance updates
    #[arg(long)]
    verbose: bool,
}

/// Work the simulated base node has been asked to do
enum NodeRequest {
    Submitted { tx_id: TxId, pending: bool },
    Validation { request_id: RequestId, txo: bool },
    Shutdown,
}

/// Connectivity that forwards every request to the simulated base node thread
struct SimulatedBaseNode {
    requests: Mutex<Sender<NodeRequest>>,
}

impl SimulatedBaseNode {
    fn new() -> (Self, Receiver<NodeRequest>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                requests: Mutex::new(tx),
            },
            rx,
        )
    }

    fn send(&self, request: NodeRequest) {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        if requests.send(request).is_err() {
            warn!("Simulated base node has stopped");
        }
    }
}

impl WalletConnectivity for SimulatedBaseNode {
    fn submit_transaction(&self, tx: &Transaction, _one_sided: bool) -> WalletResult<()> {
        self.send(NodeRequest::Submitted {
            tx_id: tx.tx_id(),
            pending: tx.as_completed().is_none(),
        });
        Ok(())
    }

    fn notify_cancelled(&self, tx_id: TxId) -> WalletResult<()> {
        info!(%tx_id, "Counterparty told about cancellation");
        Ok(())
    }

    fn request_txo_validation(&self, request_id: RequestId) -> WalletResult<()> {
        self.send(NodeRequest::Validation {
            request_id,
            txo: true,
        });
        Ok(())
    }

    fn request_transaction_validation(&self, request_id: RequestId) -> WalletResult<()> {
        self.send(NodeRequest::Validation {
            request_id,
            txo: false,
        });
        Ok(())
    }

    fn request_rebroadcast(&self, request_id: RequestId, tx_ids: &[TxId]) -> WalletResult<()> {
        info!(%request_id, count = tx_ids.len(), "Rebroadcast requested");
        Ok(())
    }

    fn start_recovery_scan(&self, _base_node: &PublicKey, _output_message: &str) -> WalletResult<()> {
        Ok(())
    }

    fn set_power_mode(&self, mode: PowerMode) -> WalletResult<()> {
        info!(?mode, "Power mode changed");
        Ok(())
    }

    fn fee_per_gram_stats(&self, count: u32) -> WalletResult<Vec<FeePerGramStat>> {
        Ok((0..u64::from(count))
            .map(|order| FeePerGramStat {
                order,
                min_fee_per_gram: 1,
                avg_fee_per_gram: 5 + order,
                max_fee_per_gram: 25,
            })
            .collect())
    }

    fn add_base_node_peer(&self, peer: &BaseNodePeer) -> WalletResult<()> {
        info!(public_key = %peer.public_key, address = %peer.address, "Base node peer added");
        Ok(())
    }
}

fn feed(wallet: &Wallet, event: ProtocolEvent) {
    let event_type = event.event_type();
    if let Err(e) = wallet.handle_protocol_event(event) {
        warn!(event_type, error = %e, "Protocol event rejected");
    }
}

/// Walk one transaction from submission to confirmation
fn confirm(wallet: &Wallet, tx_id: TxId, pending: bool, required_confirmations: u64) {
    if pending {
        feed(wallet, ProtocolEvent::TransactionReplyReceived { tx_id });
    }
    feed(wallet, ProtocolEvent::TransactionBroadcast { tx_id });
    for confirmations in 1..required_confirmations {
        feed(
            wallet,
            ProtocolEvent::TransactionMinedUnconfirmed {
                tx_id,
                confirmations,
            },
        );
    }
    feed(wallet, ProtocolEvent::TransactionMined { tx_id });
}

fn run_base_node(wallet: Arc<Wallet>, requests: Receiver<NodeRequest>) {
    let mut chain_tip = 100;
    for request in requests {
        match request {
            NodeRequest::Submitted { tx_id, pending } => {
                confirm(&wallet, tx_id, pending, wallet.required_confirmations());
                chain_tip += 1;
                feed(&wallet, ProtocolEvent::BaseNodeState { chain_tip });
            }
            NodeRequest::Validation { request_id, txo } => {
                let event = if txo {
                    ProtocolEvent::TxoValidationComplete {
                        request_id,
                        success: true,
                    }
                } else {
                    ProtocolEvent::TransactionValidationComplete {
                        request_id,
                        success: true,
                    }
                };
                feed(&wallet, event);
            }
            NodeRequest::Shutdown => break,
        }
    }
}

fn build_wallet(args: &Args, node: SimulatedBaseNode) -> WalletResult<Wallet> {
    let level = if args.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };
    let mut builder = Wallet::builder()
        .with_config(WalletConfig::new(args.network.clone()))
        .with_connectivity(Arc::new(node))
        .with_event_listener(Box::new(ConsoleLoggingListener::with_config(
            ConsoleLoggingConfig::new()
                .with_log_level(level)
                .with_prefix("sim"),
        )));
    if let Some(phrase) = &args.seed_phrase {
        builder = builder.from_seed_phrase(phrase.clone());
    }
    Ok(builder.build()?)
}

fn run(args: Args) -> WalletResult<()> {
    init_logging(&WalletConfig::default().logging)?;

    let (node, requests) = SimulatedBaseNode::new();
    let shutdown = node.requests.lock().unwrap_or_else(|e| e.into_inner()).clone();
    let wallet = Arc::new(build_wallet(&args, node)?);
    info!(public_key = %wallet.public_key(), network = %args.network, "Wallet ready");

    let base_node = {
        let wallet = wallet.clone();
        thread::Builder::new()
            .name("base-node".into())
            .spawn(move || run_base_node(wallet, requests))
            .map_err(|e| tari_wallet_core::WalletError::Internal(e.to_string()))?
    };

    // inbound payments from concurrent producers
    let producers: Vec<_> = (0..args.producers)
        .map(|producer| {
            let wallet = wallet.clone();
            let (payments, amount) = (args.payments, args.payment_amount);
            thread::spawn(move || {
                let sender = PrivateKey::random().public_key();
                for payment in 0..payments {
                    let tx_id = TxId::random();
                    feed(
                        &wallet,
                        ProtocolEvent::TransactionReceived {
                            tx_id,
                            source_public_key: sender,
                            amount,
                            message: format!("payment {payment} from producer {producer}"),
                        },
                    );
                    feed(&wallet, ProtocolEvent::TransactionFinalized { tx_id });
                    confirm(&wallet, tx_id, false, wallet.required_confirmations());
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.join().is_err() {
            error!("Producer thread panicked");
        }
    }

    let fee = wallet.estimate_fee(args.send_amount, args.fee_per_gram, 1, 2)?;
    info!(fee, "Estimated fee per send");

    for _ in 0..args.sends {
        let destination = PrivateKey::random().public_key();
        match wallet.send_transaction(
            destination,
            args.send_amount,
            args.fee_per_gram,
            "simulated send",
            args.one_sided,
        ) {
            Ok(tx_id) => info!(%tx_id, "Sent"),
            Err(e) => warn!(error = %e, "Send refused"),
        }
    }

    wallet.start_txo_validation()?;
    wallet.start_transaction_validation()?;

    if shutdown.send(NodeRequest::Shutdown).is_err() {
        warn!("Simulated base node stopped early");
    }
    if base_node.join().is_err() {
        error!("Base node thread panicked");
    }

    if !wallet.flush_events() {
        warn!("Timed out waiting for the listener to drain");
    }
    let balance = wallet.balance();
    let stats = wallet.event_stats();
    info!(
        available = balance.available,
        pending_incoming = balance.pending_incoming,
        pending_outgoing = balance.pending_outgoing,
        completed = wallet.completed_transactions().len(),
        pending = wallet.pending_outbound_transactions().len()
            + wallet.pending_inbound_transactions().len(),
        cancelled = wallet.cancelled_transactions().len(),
        delivered = stats.total_delivered,
        dropped = stats.dropped_no_listener,
        "Simulation finished"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("wallet_sim failed: {e}");
        std::process::exit(e.code());
    }
}
