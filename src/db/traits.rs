//! Persistence abstraction traits
//!
//! The core only ever talks to storage through these traits:
//!
//! - [`IdentityStore`] - stored accounts, looked up by email at login
//! - [`ConfigStore`] - append-only test configuration snapshots
//! - [`ResultStore`] - submitted test results and their aggregate statistics
//!
//! [`DatabaseClient`] bundles all three and is what the application state
//! holds. Unit tests mock the narrow traits individually.
//!
//! # Example
//!
//! ```rust,ignore
//! use kraepelin::db::{DatabaseClient, DatabaseProvider};
//!
//! // In-memory database (tests, demos)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // File-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data/kraepelin.db".into() }.create_client().await?;
//! ```

use crate::types::{
    ConfigSnapshot, NewConfigSnapshot, NewTestResult, Result, ResultStatistics, Role, TestResult,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
}

impl DatabaseProvider {
    /// Maps a configured database URL onto a provider.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim();
        if trimmed.is_empty() || trimmed == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: trimmed.trim_start_matches("sqlite://").to_string(),
            }
        }
    }

    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<Arc<dyn DatabaseClient>> {
        match self {
            DatabaseProvider::Memory => {
                let client = super::turso::TursoClient::new_memory().await?;
                Ok(Arc::new(client))
            }
            DatabaseProvider::SQLite { path } => {
                let client = super::turso::TursoClient::new_local(path).await?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// Account record as stored. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Unix milliseconds
    pub created_at: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Get an identity by its (unique) email
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<StoredIdentity>>;

    /// Insert or replace the identity with this email
    async fn upsert_identity(&self, email: &str, password_hash: &str, role: Role) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Most recent snapshot by creation time, if any
    async fn find_latest_config_snapshot(&self) -> Result<Option<ConfigSnapshot>>;

    /// Append a snapshot; the store assigns `id` and `created_at`
    async fn create_config_snapshot(&self, fields: NewConfigSnapshot) -> Result<ConfigSnapshot>;

    /// Snapshots newest first
    async fn list_config_snapshots(&self, limit: u32) -> Result<Vec<ConfigSnapshot>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create_test_result(&self, result: &NewTestResult) -> Result<TestResult>;

    /// Results newest first
    async fn list_test_results(&self, limit: u32) -> Result<Vec<TestResult>>;

    async fn get_test_result(&self, id: &str) -> Result<Option<TestResult>>;

    async fn list_test_results_by_email(&self, email: &str) -> Result<Vec<TestResult>>;

    /// Returns whether a row was deleted
    async fn delete_test_result(&self, id: &str) -> Result<bool>;

    async fn result_statistics(&self) -> Result<ResultStatistics>;
}

/// Everything the HTTP layer needs from storage.
pub trait DatabaseClient: IdentityStore + ConfigStore + ResultStore {
    /// Upcast for components that only need identity lookups
    fn as_identity_store(self: Arc<Self>) -> Arc<dyn IdentityStore>;

    /// Upcast for components that only need configuration snapshots
    fn as_config_store(self: Arc<Self>) -> Arc<dyn ConfigStore>;
}

impl<T> DatabaseClient for T
where
    T: IdentityStore + ConfigStore + ResultStore + 'static,
{
    fn as_identity_store(self: Arc<Self>) -> Arc<dyn IdentityStore> {
        self
    }

    fn as_config_store(self: Arc<Self>) -> Arc<dyn ConfigStore> {
        self
    }
}
