//! Value types shared by every wallet component

pub mod seed_words;
pub mod transaction;
pub mod types;
pub mod wallet_data;

pub use seed_words::*;
pub use transaction::*;
pub use types::*;
pub use wallet_data::*;
