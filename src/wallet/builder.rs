//! Wallet builder providing a fluent API for wallet construction with event system integration
//!
//! The builder gathers the configuration, the seed words to restore from (or
//! generates new ones), the connectivity collaborator and the optional
//! listener, then assembles a [`Wallet`]. A wallet gets at most one listener,
//! and it can only be supplied here or once through [`Wallet::set_listener`].

use std::sync::Arc;

use crate::data_structures::SeedWords;
use crate::errors::WalletError;
use crate::events::{EventDispatcher, ExecutionContext, WalletEventListener};
use crate::network::WalletConnectivity;
use crate::wallet::{Wallet, WalletConfig};

/// Errors that can occur during wallet building
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletBuildError {
    /// Seed words could not be generated, parsed or turned into keys
    WalletCreation(WalletError),
    /// Error during event listener registration
    EventListenerError(WalletError),
    /// Configuration validation error
    ConfigurationError(WalletError),
    /// Missing required parameters
    MissingParameter(String),
}

impl std::fmt::Display for WalletBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletBuildError::WalletCreation(err) => write!(f, "Wallet creation error: {}", err),
            WalletBuildError::EventListenerError(err) => {
                write!(f, "Event listener error: {}", err)
            }
            WalletBuildError::ConfigurationError(err) => {
                write!(f, "Configuration error: {}", err)
            }
            WalletBuildError::MissingParameter(param) => {
                write!(f, "Missing required parameter: {}", param)
            }
        }
    }
}

impl std::error::Error for WalletBuildError {}

impl From<WalletBuildError> for WalletError {
    fn from(err: WalletBuildError) -> Self {
        match err {
            WalletBuildError::WalletCreation(inner)
            | WalletBuildError::EventListenerError(inner)
            | WalletBuildError::ConfigurationError(inner) => inner,
            WalletBuildError::MissingParameter(param) => {
                WalletError::InvalidArgument(format!("missing required parameter: {param}"))
            }
        }
    }
}

/// Wallet creation methods supported by the builder
#[derive(Clone)]
enum WalletCreationMethod {
    /// Generate a new 24 word phrase
    GenerateNew,
    /// Restore from a space separated phrase
    FromSeedPhrase(String),
    /// Restore from a word list assembled word by word
    FromSeedWords(SeedWords),
}

/// Builder for creating wallets
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tari_wallet_core::events::listeners::ConsoleLoggingListener;
/// use tari_wallet_core::network::NoopConnectivity;
/// use tari_wallet_core::wallet::WalletBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let wallet = WalletBuilder::new()
///     .generate_new()
///     .with_network("esmeralda")
///     .with_connectivity(Arc::new(NoopConnectivity))
///     .with_event_listener(Box::new(ConsoleLoggingListener::new()))
///     .build()?;
/// assert!(wallet.has_listener());
/// # Ok(())
/// # }
/// ```
pub struct WalletBuilder {
    creation_method: Option<WalletCreationMethod>,
    config: WalletConfig,
    connectivity: Option<Arc<dyn WalletConnectivity>>,
    listener: Option<Box<dyn WalletEventListener>>,
    execution_context: Option<Arc<dyn ExecutionContext>>,
    debug_events: bool,
}

impl WalletBuilder {
    /// Without a creation method the builder generates new seed words
    pub fn new() -> Self {
        Self {
            creation_method: None,
            config: WalletConfig::default(),
            connectivity: None,
            listener: None,
            execution_context: None,
            debug_events: false,
        }
    }

    pub fn generate_new(mut self) -> Self {
        self.creation_method = Some(WalletCreationMethod::GenerateNew);
        self
    }

    pub fn from_seed_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.creation_method = Some(WalletCreationMethod::FromSeedPhrase(phrase.into()));
        self
    }

    pub fn from_seed_words(mut self, seed_words: SeedWords) -> Self {
        self.creation_method = Some(WalletCreationMethod::FromSeedWords(seed_words));
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: WalletConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_network<S: Into<String>>(mut self, network: S) -> Self {
        self.config.network = network.into();
        self
    }

    pub fn with_passphrase<S: Into<String>>(mut self, passphrase: S) -> Self {
        self.config.passphrase = Some(passphrase.into());
        self
    }

    /// Base node / transport collaborator; required
    pub fn with_connectivity(mut self, connectivity: Arc<dyn WalletConnectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Listener registered as part of the build
    ///
    /// If no listener is registered, the wallet still functions normally but
    /// its notifications are dropped.
    pub fn with_event_listener(mut self, listener: Box<dyn WalletEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Execution context the listener thread attaches to around each delivery
    pub fn with_execution_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.execution_context = Some(context);
        self
    }

    /// Keep per-delivery traces in the dispatcher
    pub fn with_debug_events(mut self) -> Self {
        self.debug_events = true;
        self
    }

    /// Build the wallet
    ///
    /// # Errors
    ///
    /// * `MissingParameter` - no connectivity collaborator, or an execution context without a listener
    /// * `ConfigurationError` - the configuration failed validation
    /// * `WalletCreation` - seed words could not be generated or restored
    /// * `EventListenerError` - the listener thread could not be started
    pub fn build(self) -> Result<Wallet, WalletBuildError> {
        let connectivity = self.connectivity.ok_or_else(|| {
            WalletBuildError::MissingParameter("connectivity (call with_connectivity)".to_string())
        })?;
        if self.execution_context.is_some() && self.listener.is_none() {
            return Err(WalletBuildError::MissingParameter(
                "event listener for the execution context".to_string(),
            ));
        }
        self.config
            .validate()
            .map_err(WalletBuildError::ConfigurationError)?;

        let seed_words = match self
            .creation_method
            .unwrap_or(WalletCreationMethod::GenerateNew)
        {
            WalletCreationMethod::GenerateNew => SeedWords::generate(),
            WalletCreationMethod::FromSeedPhrase(phrase) => SeedWords::from_phrase(&phrase),
            WalletCreationMethod::FromSeedWords(words) => Ok(words),
        }
        .map_err(WalletBuildError::WalletCreation)?;
        if !seed_words.is_complete() {
            return Err(WalletBuildError::WalletCreation(WalletError::SeedWords(
                format!("expected a complete phrase, got {} words", seed_words.len()),
            )));
        }

        let dispatcher = Arc::new(if self.debug_events {
            EventDispatcher::new_with_debug()
        } else {
            EventDispatcher::new()
        });
        let wallet = Wallet::assemble(self.config, seed_words, dispatcher, connectivity)
            .map_err(WalletBuildError::WalletCreation)?;

        if let Some(listener) = self.listener {
            wallet
                .set_listener(listener, self.execution_context)
                .map_err(WalletBuildError::EventListenerError)?;
        }
        Ok(wallet)
    }
}

impl Default for WalletBuilder {
    fn default() -> Self {
        Self::new()
    }
}
