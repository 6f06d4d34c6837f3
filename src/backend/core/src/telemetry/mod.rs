//! Telemetry: structured logging setup.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobwire_core::telemetry::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! ```

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
