//! Configuration utilities.

/// TOML configuration (`kraepelin.toml`).
pub mod toml_config;
