//! Principal resolution.
//!
//! The gateway never verifies credentials itself beyond a static token
//! table; deployments behind an auth proxy pass the verified subject id in
//! a trusted header instead.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use codeweaver_config::AuthConfig;

/// Maps request headers to the subject id of an authenticated caller.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// `Authorization: Bearer <token>` looked up in a static table.
pub struct BearerTokenResolver {
    tokens: HashMap<String, String>,
}

impl BearerTokenResolver {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl PrincipalResolver for BearerTokenResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .trim();
        self.tokens.get(token).cloned()
    }
}

/// Subject id set by an upstream proxy that has already authenticated the
/// caller. Only safe when the gateway is not reachable directly.
pub struct TrustedHeaderResolver {
    header: String,
}

impl TrustedHeaderResolver {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }
}

impl PrincipalResolver for TrustedHeaderResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(self.header.as_str())?.to_str().ok()?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// First resolver to produce a principal wins.
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn PrincipalResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Arc<dyn PrincipalResolver>>) -> Self {
        Self { resolvers }
    }

    /// Bearer tokens first, then the trusted header when one is configured.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut resolvers: Vec<Arc<dyn PrincipalResolver>> =
            vec![Arc::new(BearerTokenResolver::new(config.tokens.clone()))];
        if let Some(header) = trusted_header(config) {
            resolvers.push(Arc::new(TrustedHeaderResolver::new(header)));
        }
        Self::new(resolvers)
    }
}

/// The configured proxy header, ignoring a blank value.
pub fn trusted_header(config: &AuthConfig) -> Option<&str> {
    config
        .principal_header
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
}

impl PrincipalResolver for ChainResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        self.resolvers.iter().find_map(|r| r.resolve(headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn config() -> AuthConfig {
        AuthConfig {
            tokens: HashMap::from([("tok_1".to_string(), "user_1".to_string())]),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn bearer_known_token() {
        let resolver = BearerTokenResolver::new(config().tokens);
        let h = headers(&[("authorization", "Bearer tok_1")]);
        assert_eq!(resolver.resolve(&h).as_deref(), Some("user_1"));
    }

    #[test]
    fn bearer_unknown_or_malformed() {
        let resolver = BearerTokenResolver::new(config().tokens);
        assert!(resolver.resolve(&headers(&[("authorization", "Bearer nope")])).is_none());
        assert!(resolver.resolve(&headers(&[("authorization", "tok_1")])).is_none());
        assert!(resolver.resolve(&HeaderMap::new()).is_none());
    }

    #[test]
    fn trusted_header_ignores_blank() {
        let resolver = TrustedHeaderResolver::new("X-Principal-Id");
        let h = headers(&[("x-principal-id", "user_42")]);
        assert_eq!(resolver.resolve(&h).as_deref(), Some("user_42"));
        assert!(resolver.resolve(&headers(&[("x-principal-id", "  ")])).is_none());
    }

    #[test]
    fn chain_ignores_header_unless_configured() {
        let resolver = ChainResolver::from_config(&config());
        let h = headers(&[("x-principal-id", "user_from_proxy")]);
        assert!(resolver.resolve(&h).is_none());

        let blank = AuthConfig {
            principal_header: Some("  ".into()),
            ..config()
        };
        assert!(trusted_header(&blank).is_none());
        assert!(ChainResolver::from_config(&blank).resolve(&h).is_none());
    }

    #[test]
    fn chain_prefers_bearer() {
        let config = AuthConfig {
            principal_header: Some("x-principal-id".into()),
            ..config()
        };
        let resolver = ChainResolver::from_config(&config);
        let h = headers(&[
            ("authorization", "Bearer tok_1"),
            ("x-principal-id", "user_from_proxy"),
        ]);
        assert_eq!(resolver.resolve(&h).as_deref(), Some("user_1"));

        let h = headers(&[("x-principal-id", "user_from_proxy")]);
        assert_eq!(resolver.resolve(&h).as_deref(), Some("user_from_proxy"));

        assert!(resolver.resolve(&HeaderMap::new()).is_none());
    }
}
