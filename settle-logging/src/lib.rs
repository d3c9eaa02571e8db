//! Logging initialisation for settle
//!
//! Everything in the workspace logs through `tracing`; this crate installs
//! the global subscriber from a [`LoggingConfig`].

pub mod init;

pub use init::{init_logging_from_config, init_simple_tracing};
pub use settle_config::LoggingConfig;
