//! Wallet configuration
//!
//! Hosts hand the wallet a pre-built configuration, usually parsed from JSON.
//! Missing fields fall back to their defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};
use crate::lifecycle::{FeeModel, LifecycleSettings};

/// Logging section of the wallet configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file; `None` logs to stderr
    pub log_path: Option<PathBuf>,
    pub max_log_files: u32,
    pub max_log_file_bytes: u64,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            max_log_files: 2,
            max_log_file_bytes: 10 * 1024 * 1024,
            default_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: String,
    pub datastore_path: PathBuf,
    #[serde(flatten)]
    pub logging: LoggingConfig,
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
    pub required_confirmations: u64,
    pub transaction_kernel_weight: u64,
    pub input_weight: u64,
    pub output_weight: u64,
    pub minimum_coin_split_fee: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let fees = FeeModel::default();
        Self {
            network: "esmeralda".to_string(),
            datastore_path: PathBuf::from("wallet_data"),
            logging: LoggingConfig::default(),
            passphrase: None,
            required_confirmations: 3,
            transaction_kernel_weight: fees.kernel_weight,
            input_weight: fees.input_weight,
            output_weight: fees.output_weight,
            minimum_coin_split_fee: 100,
        }
    }
}

impl WalletConfig {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> WalletResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> WalletResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_datastore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.datastore_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logging.log_path = Some(path.into());
        self
    }

    pub fn with_log_rotation(mut self, max_files: u32, max_file_bytes: u64) -> Self {
        self.logging.max_log_files = max_files;
        self.logging.max_log_file_bytes = max_file_bytes;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations;
        self
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.network.trim().is_empty() {
            return Err(WalletError::config("network", "must not be empty"));
        }
        if self.logging.max_log_files == 0 {
            return Err(WalletError::config("max_log_files", "must be at least 1"));
        }
        if self.logging.max_log_file_bytes == 0 {
            return Err(WalletError::config("max_log_file_bytes", "must be non-zero"));
        }
        if self.required_confirmations == 0 {
            return Err(WalletError::config(
                "required_confirmations",
                "must be at least 1",
            ));
        }
        for (field, weight) in [
            ("transaction_kernel_weight", self.transaction_kernel_weight),
            ("input_weight", self.input_weight),
            ("output_weight", self.output_weight),
        ] {
            if weight == 0 {
                return Err(WalletError::config(field, "must be non-zero"));
            }
        }
        Ok(())
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            fee_model: FeeModel {
                kernel_weight: self.transaction_kernel_weight,
                input_weight: self.input_weight,
                output_weight: self.output_weight,
            },
            minimum_coin_split_fee: self.minimum_coin_split_fee,
            required_confirmations: self.required_confirmations,
        }
    }
}
