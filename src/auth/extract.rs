//! Token lookup across request transports.
//!
//! Browser clients send the token in a cookie; scripts and debugging tools
//! use the `Authorization` header or a query parameter. Each location is a
//! [`TokenSource`]; [`TokenExtractor`] asks them in order and keeps the first
//! non-empty answer.

use axum::extract::Query;
use axum::http::{header, HeaderMap, Uri};
use std::collections::HashMap;

/// Default cookie carrying the identity token.
pub const AUTH_COOKIE_NAME: &str = "auth_token";
/// Default query parameter carrying the identity token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// One place a token may be found.
pub trait TokenSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    fn extract(&self, headers: &HeaderMap, uri: &Uri) -> Option<String>;
}

/// `Authorization: Bearer <token>`
pub struct BearerHeader;

impl TokenSource for BearerHeader {
    fn name(&self) -> &'static str {
        "authorization-header"
    }

    fn extract(&self, headers: &HeaderMap, _uri: &Uri) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let trimmed = value.trim();
        let token = trimmed
            .strip_prefix("Bearer ")
            .or_else(|| trimmed.strip_prefix("bearer "))?
            .trim();
        non_empty(token)
    }
}

/// Named cookie in the `Cookie` header(s).
pub struct AuthCookie {
    name: String,
}

impl AuthCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenSource for AuthCookie {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn extract(&self, headers: &HeaderMap, _uri: &Uri) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| {
                let (key, val) = pair.trim().split_once('=')?;
                (key.trim() == self.name).then(|| val.trim().trim_matches('"'))
            })
            .find_map(non_empty)
    }
}

/// Named query-string parameter.
pub struct QueryParam {
    name: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenSource for QueryParam {
    fn name(&self) -> &'static str {
        "query"
    }

    fn extract(&self, _headers: &HeaderMap, uri: &Uri) -> Option<String> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
        params.get(&self.name).and_then(|token| non_empty(token))
    }
}

fn non_empty(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Ordered chain of token sources.
pub struct TokenExtractor {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenExtractor {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Header, then cookie `cookie_name`, then query parameter `query_param`.
    pub fn standard(cookie_name: &str, query_param: &str) -> Self {
        Self::new(vec![
            Box::new(BearerHeader),
            Box::new(AuthCookie::new(cookie_name)),
            Box::new(QueryParam::new(query_param)),
        ])
    }

    /// First non-empty token, or `None` when no source has one.
    pub fn extract(&self, headers: &HeaderMap, uri: &Uri) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let token = source.extract(headers, uri)?;
            tracing::trace!(source = source.name(), "token located");
            Some(token)
        })
    }
}

impl Default for TokenExtractor {
    fn default() -> Self {
        Self::standard(AUTH_COOKIE_NAME, TOKEN_QUERY_PARAM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_header_wins_over_cookie_and_query() {
        let extractor = TokenExtractor::default();
        let headers = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "auth_token=from-cookie"),
        ]);

        let token = extractor.extract(&headers, &uri("/api/me?token=from-query"));

        assert_eq!(token.as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_wins_over_query() {
        let extractor = TokenExtractor::default();
        let headers = headers(&[(header::COOKIE, "theme=dark; auth_token=from-cookie")]);

        let token = extractor.extract(&headers, &uri("/api/me?token=from-query"));

        assert_eq!(token.as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_query_is_last_resort() {
        let extractor = TokenExtractor::default();

        let token = extractor.extract(&HeaderMap::new(), &uri("/api/me?x=1&token=from-query"));

        assert_eq!(token.as_deref(), Some("from-query"));
    }

    #[test]
    fn test_nothing_found() {
        let extractor = TokenExtractor::default();

        assert_eq!(extractor.extract(&HeaderMap::new(), &uri("/api/me")), None);
    }

    #[test]
    fn test_empty_candidates_are_skipped() {
        let extractor = TokenExtractor::default();
        let headers = headers(&[
            (header::AUTHORIZATION, "Bearer   "),
            (header::COOKIE, "auth_token="),
        ]);

        let token = extractor.extract(&headers, &uri("/api/me?token=fallback"));

        assert_eq!(token.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_non_bearer_scheme_is_ignored() {
        let headers = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwdw==")]);

        assert_eq!(BearerHeader.extract(&headers, &uri("/")), None);
    }

    #[test]
    fn test_lowercase_bearer_is_accepted() {
        let headers = headers(&[(header::AUTHORIZATION, "bearer abc")]);

        assert_eq!(BearerHeader.extract(&headers, &uri("/")).as_deref(), Some("abc"));
    }

    #[test]
    fn test_custom_cookie_name() {
        let source = AuthCookie::new("session");
        let headers = headers(&[(header::COOKIE, "auth_token=nope; session=yes")]);

        assert_eq!(source.extract(&headers, &uri("/")).as_deref(), Some("yes"));
    }

    #[test]
    fn test_percent_encoded_query_token() {
        let source = QueryParam::new("token");

        assert_eq!(
            source.extract(&HeaderMap::new(), &uri("/?token=a%2Eb%2Ec")).as_deref(),
            Some("a.b.c")
        );
    }
}
