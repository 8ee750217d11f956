//! Kraepelin test content: question generation and the configuration
//! lifecycle.

/// Snapshot-based test configuration.
pub mod config;
/// Random question pairs.
pub mod generator;

pub use config::{TestConfigService, TestDefaults};
pub use generator::generate_pairs;
