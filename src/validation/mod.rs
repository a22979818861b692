//! Base node validation workflows
//!
//! TXO validation confirms the wallet's known outputs still match chain
//! state; transaction validation re-checks completed transactions against the
//! chain. Both run asynchronously: starting one returns a [`RequestId`]
//! immediately, and the base node's answer arrives later as a protocol event.
//!
//! [`RequestId`]: crate::data_structures::RequestId

pub mod coordinator;

pub use coordinator::{ValidationCoordinator, ValidationKind, ValidationRequest};
