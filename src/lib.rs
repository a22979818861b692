//! Transaction lifecycle and event delivery core for Tari wallets
//!
//! The crate owns the wallet's transaction state machine and the machinery
//! that reports state changes to a host application:
//!
//! - [`lifecycle`]: pending / completed / cancelled transitions, fees, imports
//! - [`events`]: the single-listener dispatcher and its delivery thread
//! - [`validation`] and [`recovery`]: asynchronous base node workflows
//! - [`wallet`]: the [`Wallet`] facade, its builder and configuration
//! - [`boundary`]: error-code entry points for hosts without Rust error handling
//!
//! Networking is out of scope. The host supplies a
//! [`network::WalletConnectivity`] implementation and feeds the wallet's
//! answers back in as [`events::ProtocolEvent`]s.
//!
//! ## Features
//!
//! - `cli`: builds the `wallet_sim` binary, a simulated base node driving a wallet

pub mod boundary;
pub mod codec;
pub mod data_structures;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod network;
pub mod recovery;
pub mod storage;
pub mod validation;
pub mod wallet;

pub use errors::*;
pub use events::{EventDispatcher, ProtocolEvent, WalletEvent, WalletEventListener};
pub use lifecycle::{ConfirmationUpdate, Finalization, TransactionLifecycle, UtxoImport};
pub use wallet::*;
