//! Built-in event listeners
//!
//! - [`MockEventListener`]: captures notifications for tests and assertions
//! - [`ConsoleLoggingListener`]: writes notifications to the `tracing` subscriber

pub mod console_logging;
pub mod mock_listener;

pub use console_logging::{ConsoleLoggingConfig, ConsoleLoggingListener, LogLevel};
pub use mock_listener::{
    CapturedEvent, MockEventListener, MockListenerBuilder, MockListenerConfig, MockListenerStats,
};
