//! # Kraepelin Server
//!
//! Backend for a timed Kraepelin arithmetic test. Participants repeatedly add
//! pairs of single-digit numbers against the clock; administrators tune the
//! test and review submitted results.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `kraepelin-server` binary
//! 2. **As a library** - Mount [`api::routes::app`] in your own Axum service
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use kraepelin::{api::routes::app, utils::toml_config::AppConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load("kraepelin.toml")?;
//!     let state = AppState::from_config(config).await?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Credentials, tokens, token extraction and route guards
//! - [`db`] - Persistence traits and the libsql implementation
//! - [`quiz`] - Question generation and the configuration lifecycle
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Authentication and access control.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Persistence traits and the libsql client.
pub mod db;
/// Question pairs and test configuration.
pub mod quiz;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{DatabaseClient, DatabaseProvider, TursoClient};
pub use types::{AppError, Result};
pub use utils::toml_config::AppConfig;

use crate::auth::{
    credentials::{CredentialVerifier, PrivilegedIdentity},
    extract::TokenExtractor,
    jwt::TokenCodec,
    middleware::Authenticator,
};
use crate::quiz::TestConfigService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration, fixed for the life of the process
    pub config: Arc<AppConfig>,
    /// Database client
    pub db: Arc<dyn DatabaseClient>,
    /// Token lookup and verification for the guards
    pub authenticator: Arc<Authenticator>,
    /// Email/password verification
    pub credentials: Arc<CredentialVerifier>,
    /// Test configuration lifecycle
    pub test_config: Arc<TestConfigService>,
}

impl AppState {
    /// Wires the services together from already resolved parts.
    pub fn new(
        config: AppConfig,
        db: Arc<dyn DatabaseClient>,
        codec: TokenCodec,
        privileged: Option<PrivilegedIdentity>,
    ) -> Self {
        let extractor =
            TokenExtractor::standard(&config.auth.cookie_name, &config.auth.query_param);
        let authenticator = Arc::new(Authenticator::new(extractor, Arc::new(codec)));
        let credentials = Arc::new(CredentialVerifier::new(
            privileged,
            db.clone().as_identity_store(),
        ));
        let test_config = Arc::new(TestConfigService::new(
            db.clone().as_config_store(),
            config.quiz,
        ));

        Self {
            config: Arc::new(config),
            db,
            authenticator,
            credentials,
            test_config,
        }
    }

    /// Resolves secrets, opens the database and builds the state.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let secret = config
            .jwt_secret()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let codec = TokenCodec::new(
            &secret,
            &config.deprecated_secrets(),
            config.auth.token_ttl_secs,
        );

        let privileged = match config
            .admin_password()
            .map_err(|e| AppError::Internal(e.to_string()))?
        {
            Some((email, password)) => Some(PrivilegedIdentity::from_secret(&email, &password)?),
            None => {
                tracing::warn!("no [auth.admin] configured; only stored accounts can log in");
                None
            }
        };

        let db = DatabaseProvider::from_url(&config.database.url)
            .create_client()
            .await?;

        Ok(Self::new(config, db, codec, privileged))
    }
}
