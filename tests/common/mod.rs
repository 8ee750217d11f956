//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use axum_test::TestServer;
use kraepelin::{
    api::routes::app,
    auth::{credentials::PrivilegedIdentity, jwt::TokenCodec, password::hash_password},
    db::IdentityStore,
    types::Role,
    AppConfig, AppState, DatabaseProvider,
};

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const OLD_SECRET: &str = "retired-integration-secret-32-characters";
pub const ADMIN_EMAIL: &str = "admin@kraepelin.test";
pub const ADMIN_PASSWORD: &str = "admin-password-123";
pub const USER_EMAIL: &str = "proctor@kraepelin.test";
pub const USER_PASSWORD: &str = "proctor-password-123";

/// In-memory state with the privileged admin and one stored user account.
pub async fn test_state_with(config: AppConfig) -> AppState {
    let db = DatabaseProvider::Memory
        .create_client()
        .await
        .expect("Failed to create in-memory database");

    let hash = hash_password(USER_PASSWORD).expect("Failed to hash password");
    db.upsert_identity(USER_EMAIL, &hash, Role::User)
        .await
        .expect("Failed to seed user");

    let codec = TokenCodec::new(SECRET, &[OLD_SECRET], config.auth.token_ttl_secs);
    let admin = PrivilegedIdentity::from_secret(ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("Failed to hash admin password");

    AppState::new(config, db, codec, Some(admin))
}

pub async fn test_state() -> AppState {
    test_state_with(AppConfig::default()).await
}

pub async fn create_test_server() -> (TestServer, AppState) {
    let state = test_state().await;
    let server = TestServer::new(app(state.clone())).expect("Failed to create test server");
    (server, state)
}

/// Signs a token directly, bypassing the login endpoint.
pub fn token_for(state: &AppState, email: &str, role: Role) -> String {
    state
        .authenticator
        .codec()
        .sign(email, role)
        .expect("Failed to sign token")
        .token
}
