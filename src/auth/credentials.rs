use crate::auth::password::{hash_password, verify_password};
use crate::db::traits::IdentityStore;
use crate::types::{AppError, Result, Role};
use std::sync::Arc;
use tracing::{debug, warn};

/// The single administrator account that lives in configuration rather than
/// in the database. Its secret is hashed once at start-up so that it goes
/// through the same comparison as stored accounts.
#[derive(Debug, Clone)]
pub struct PrivilegedIdentity {
    email: String,
    password_hash: String,
}

impl PrivilegedIdentity {
    /// Hashes `secret` and builds the identity.
    pub fn from_secret(email: &str, secret: &str) -> Result<Self> {
        Ok(Self {
            email: email.trim().to_string(),
            password_hash: hash_password(secret)?,
        })
    }

    /// Uses an existing Argon2 PHC hash.
    pub fn from_hash(email: &str, password_hash: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password_hash: password_hash.to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Outcome of a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub role: Role,
}

/// Checks email/password pairs against the privileged identity and the
/// identity store.
pub struct CredentialVerifier {
    privileged: Option<PrivilegedIdentity>,
    store: Arc<dyn IdentityStore>,
}

impl CredentialVerifier {
    pub fn new(privileged: Option<PrivilegedIdentity>, store: Arc<dyn IdentityStore>) -> Self {
        Self { privileged, store }
    }

    /// Verifies credentials.
    ///
    /// A privileged match returns immediately without touching the store.
    /// Every other failure, including unknown email, is
    /// [`AppError::InvalidCredentials`].
    pub async fn verify(&self, email: &str, password: &str) -> Result<VerifiedIdentity> {
        let email = email.trim();

        if let Some(privileged) = &self.privileged {
            if privileged.email == email && password_matches(password, &privileged.password_hash)
            {
                debug!("privileged identity authenticated");
                return Ok(VerifiedIdentity {
                    email: privileged.email.clone(),
                    role: Role::Admin,
                });
            }
        }

        let Some(identity) = self.store.find_identity_by_email(email).await? else {
            return Err(AppError::InvalidCredentials);
        };

        if password_matches(password, &identity.password_hash) {
            Ok(VerifiedIdentity {
                email: identity.email,
                role: identity.role,
            })
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

fn password_matches(password: &str, hash: &str) -> bool {
    match verify_password(password, hash) {
        Ok(matched) => matched,
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::traits::{MockIdentityStore, StoredIdentity};

    const ADMIN_EMAIL: &str = "admin@kraepelin.test";
    const ADMIN_SECRET: &str = "admin-secret";

    fn stored(email: &str, password: &str, role: Role) -> StoredIdentity {
        StoredIdentity {
            id: "id-1".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            role,
            created_at: 0,
        }
    }

    fn privileged() -> Option<PrivilegedIdentity> {
        Some(PrivilegedIdentity::from_secret(ADMIN_EMAIL, ADMIN_SECRET).unwrap())
    }

    #[tokio::test]
    async fn test_privileged_login_never_consults_store() {
        let mut store = MockIdentityStore::new();
        store.expect_find_identity_by_email().never();

        let verifier = CredentialVerifier::new(privileged(), Arc::new(store));
        let identity = verifier.verify(ADMIN_EMAIL, ADMIN_SECRET).await.unwrap();

        assert_eq!(identity.email, ADMIN_EMAIL);
        assert_eq!(identity.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_privileged_email_with_wrong_password_falls_through_to_store() {
        let mut store = MockIdentityStore::new();
        store
            .expect_find_identity_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let verifier = CredentialVerifier::new(privileged(), Arc::new(store));
        let result = verifier.verify(ADMIN_EMAIL, "not-the-secret").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_stored_identity_keeps_its_role() {
        let record = stored("user@example.com", "hunter22", Role::User);
        let mut store = MockIdentityStore::new();
        store
            .expect_find_identity_by_email()
            .withf(|email| email == "user@example.com")
            .returning(move |_| Ok(Some(record.clone())));

        let verifier = CredentialVerifier::new(privileged(), Arc::new(store));
        let identity = verifier.verify("user@example.com", "hunter22").await.unwrap();

        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let record = stored("user@example.com", "hunter22", Role::User);
        let mut store = MockIdentityStore::new();
        store
            .expect_find_identity_by_email()
            .returning(move |email| {
                if email == "user@example.com" {
                    Ok(Some(record.clone()))
                } else {
                    Ok(None)
                }
            });

        let verifier = CredentialVerifier::new(None, Arc::new(store));
        let wrong_password = verifier.verify("user@example.com", "nope").await.unwrap_err();
        let unknown = verifier.verify("ghost@example.com", "nope").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert!(matches!(wrong_password, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockIdentityStore::new();
        store
            .expect_find_identity_by_email()
            .returning(|_| Err(AppError::Database("connection reset".into())));

        let verifier = CredentialVerifier::new(None, Arc::new(store));
        let result = verifier.verify("user@example.com", "pw").await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_unreadable_hash_is_a_mismatch() {
        let mut store = MockIdentityStore::new();
        store.expect_find_identity_by_email().returning(|email| {
            Ok(Some(StoredIdentity {
                id: "id-2".into(),
                email: email.to_string(),
                password_hash: "plaintext".into(),
                role: Role::Admin,
                created_at: 0,
            }))
        });

        let verifier = CredentialVerifier::new(None, Arc::new(store));
        let result = verifier.verify("legacy@example.com", "plaintext").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }
}
