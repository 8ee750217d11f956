//! Authentication and access control
//!
//! # Module Structure
//!
//! - [`auth::credentials`](crate::auth::credentials) - email/password verification (privileged + stored identities)
//! - [`auth::password`](crate::auth::password) - Argon2id hashing
//! - [`auth::jwt`](crate::auth::jwt) - token signing and multi-key verification
//! - [`auth::extract`](crate::auth::extract) - token lookup: header, cookie, query
//! - [`auth::middleware`](crate::auth::middleware) - axum guards and the `AuthUser` extractor
//!
//! # Tokens
//!
//! Tokens are stateless HS256 JWTs carrying `{email, role, iat, exp}`. There
//! is no server-side session and no revocation; a token is valid until `exp`.
//!
//! Key rotation: put the new secret in the primary slot and list the old
//! ones under `deprecated_secret_envs`. Tokens signed with any listed key keep
//! verifying until they expire.
//!
//! ```toml
//! [auth]
//! jwt_secret_env = "JWT_SECRET"
//! deprecated_secret_envs = ["JWT_SECRET_2025"]
//! token_ttl_secs = 86400
//! ```
//!
//! # Guards
//!
//! ```ignore
//! use kraepelin::auth::middleware::{require_admin, Authenticator};
//!
//! let admin_routes = Router::new()
//!     .route("/config", post(update_config))
//!     .layer(middleware::from_fn_with_state(authenticator, require_admin));
//! ```

/// Email/password verification.
pub mod credentials;
/// Token lookup across header, cookie and query string.
pub mod extract;
/// Token signing and verification.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Argon2 password hashing.
pub mod password;
