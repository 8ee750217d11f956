//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Login, logout and current identity.
pub mod auth;
/// Test configuration read, update and history.
pub mod config;
/// Liveness check.
pub mod health;
/// Test result storage and statistics.
pub mod results;
