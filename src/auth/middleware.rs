use crate::auth::extract::TokenExtractor;
use crate::auth::jwt::TokenCodec;
use crate::types::{AppError, Claims, Result};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// What a guarded route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any verified identity
    Authenticated,
    /// Verified identity with the admin role
    Admin,
}

/// Token lookup plus verification; shared by both guards.
pub struct Authenticator {
    extractor: TokenExtractor,
    codec: Arc<TokenCodec>,
}

impl Authenticator {
    pub fn new(extractor: TokenExtractor, codec: Arc<TokenCodec>) -> Self {
        Self { extractor, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolves the caller's claims and checks them against `access`.
    ///
    /// Missing token → `MissingToken`, bad or expired token → `InvalidToken`,
    /// wrong role → `Forbidden`.
    pub fn authorize(&self, headers: &HeaderMap, uri: &Uri, access: Access) -> Result<Claims> {
        let token = self
            .extractor
            .extract(headers, uri)
            .ok_or(AppError::MissingToken)?;

        let claims = self.codec.verify(&token)?;

        if access == Access::Admin && !claims.role.is_admin() {
            tracing::info!(email = %claims.email, "non-admin identity refused");
            return Err(AppError::Forbidden);
        }

        Ok(claims)
    }
}

async fn guard(
    authenticator: &Authenticator,
    access: Access,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let claims = authenticator.authorize(req.headers(), req.uri(), access)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Requires any verified identity.
pub async fn require_auth(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    guard(&authenticator, Access::Authenticated, req, next).await
}

/// Requires a verified administrator.
pub async fn require_admin(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    guard(&authenticator, Access::Admin, req, next).await
}

/// Claims attached by a guard.
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use axum::http::{header, HeaderValue};

    fn authenticator() -> Authenticator {
        let codec = TokenCodec::new::<&str>("middleware-test-secret-32-chars-long", &[], 3600);
        Authenticator::new(TokenExtractor::default(), Arc::new(codec))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_token() {
        let auth = authenticator();
        let err = auth
            .authorize(&HeaderMap::new(), &Uri::from_static("/"), Access::Admin)
            .unwrap_err();

        assert!(matches!(err, AppError::MissingToken));
    }

    #[test]
    fn test_invalid_token() {
        let auth = authenticator();
        let err = auth
            .authorize(&bearer("nope"), &Uri::from_static("/"), Access::Authenticated)
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_user_token_is_forbidden_for_admin_routes() {
        let auth = authenticator();
        let token = auth.codec().sign("user@example.com", Role::User).unwrap().token;

        let plain = auth.authorize(&bearer(&token), &Uri::from_static("/"), Access::Authenticated);
        let admin = auth.authorize(&bearer(&token), &Uri::from_static("/"), Access::Admin);

        assert!(plain.is_ok());
        assert!(matches!(admin, Err(AppError::Forbidden)));
    }

    #[test]
    fn test_admin_token_passes_admin_guard() {
        let auth = authenticator();
        let token = auth.codec().sign("admin@example.com", Role::Admin).unwrap().token;

        let claims = auth
            .authorize(&bearer(&token), &Uri::from_static("/"), Access::Admin)
            .unwrap();

        assert_eq!(claims.role, Role::Admin);
    }
}
