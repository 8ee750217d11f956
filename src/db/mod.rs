//! Persistence for identities, configuration snapshots and test results.
//!
//! - [`traits`] - storage traits the rest of the crate depends on
//! - [`turso`] - libsql implementation (local file or in-memory)

#![allow(missing_docs)]

pub mod traits;
pub mod turso;

pub use traits::{
    ConfigStore, DatabaseClient, DatabaseProvider, IdentityStore, ResultStore, StoredIdentity,
};
pub use turso::TursoClient;
