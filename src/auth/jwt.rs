use crate::types::{AppError, Claims, Result, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies HS256 identity tokens.
///
/// Tokens are always signed with the primary key. Verification tries the
/// primary key first and then every deprecated key in order, so tokens
/// issued before a key rotation stay valid until they expire.
pub struct TokenCodec {
    primary: SigningKey,
    deprecated: Vec<SigningKey>,
    ttl_secs: i64,
}

impl TokenCodec {
    /// Creates a codec.
    ///
    /// # Arguments
    /// * `primary_secret` - Secret used for signing and first in the verification order
    /// * `deprecated_secrets` - Older secrets still accepted for verification; empty entries are skipped
    /// * `ttl_secs` - Token validity in seconds
    pub fn new<S: AsRef<str>>(primary_secret: &str, deprecated_secrets: &[S], ttl_secs: i64) -> Self {
        let deprecated = deprecated_secrets
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty() && *s != primary_secret)
            .map(SigningKey::from_secret)
            .collect();

        Self {
            primary: SigningKey::from_secret(primary_secret),
            deprecated,
            ttl_secs: ttl_secs.max(1),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issues a token for `email` with `role`, valid from now for the configured TTL.
    pub fn sign(&self, email: &str, role: Role) -> Result<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
        };

        let token = self.encode_claims(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.primary.encoding,
        )
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a token against every known key and returns its claims.
    ///
    /// All failures collapse into [`AppError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let keys = std::iter::once(&self.primary).chain(self.deprecated.iter());

        for (index, key) in keys.enumerate() {
            match decode::<Claims>(token, &key.decoding, &validation) {
                Ok(data) => {
                    let claims = data.claims;
                    let now = Utc::now().timestamp();
                    if claims.exp <= now || claims.exp <= claims.iat {
                        return Err(AppError::InvalidToken);
                    }
                    if index > 0 {
                        tracing::debug!("token accepted by a deprecated signing key");
                    }
                    return Ok(claims);
                }
                Err(e) => match e.kind() {
                    // Signature matched but the token is past its lifetime.
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        return Err(AppError::InvalidToken);
                    }
                    _ => continue,
                },
            }
        }

        Err(AppError::InvalidToken)
    }
}
