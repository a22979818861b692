//! In-memory storage for wallet state
//!
//! - [`TransactionStore`]: the four lifecycle partitions behind one lock
//! - [`HandleRegistry`]: generational handle tables for values lent to hosts
//! - [`KeyValueStore`]: free-form string settings owned by the host

pub mod handle_registry;
pub mod key_value;
pub mod transaction_store;

pub use handle_registry::*;
pub use key_value::*;
pub use transaction_store::*;
