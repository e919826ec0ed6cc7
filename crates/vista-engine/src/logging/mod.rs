//! Logging utilities.
//!
//! The engine logs through the `log` facade only. Hosts that want the stock
//! `env_logger` backend call [`init_logging`] early in `main`.

mod init;

pub use init::{init_logging, LoggingConfig};
