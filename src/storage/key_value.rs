//! Host-facing string key-value store kept alongside the wallet

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{WalletError, WalletResult};

#[derive(Debug, Default)]
pub struct KeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        if key.is_empty() {
            return Err(WalletError::InvalidArgument("key must not be empty".into()));
        }
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get(&self, key: &str) -> WalletResult<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| WalletError::NotFound(format!("key '{key}'")))
    }

    /// Returns whether the key existed
    pub fn remove(&self, key: &str) -> bool {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }
}
