//! Session/SSO coordinator.
//!
//! Establishes one authenticated session usable across every subdomain of a
//! registered parent domain. The refresh token travels as an `HttpOnly`
//! cookie scoped to the shared parent domain; return URLs are validated
//! against a domain allow-list before any redirect is built.

use std::sync::Arc;

use cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use url::Url;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::{CookieConfig, SsoConfig};
use crate::error::AuthError;
use crate::token::service::{TokenPair, TokenService};

/// A completed login: the token pair plus the cookie directive carrying the
/// refresh token.
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Signed access token for bearer use.
    pub access_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// `Set-Cookie` value carrying the refresh token.
    pub refresh_cookie: String,
}

/// Coordinates cross-subdomain login sessions.
pub struct SsoCoordinator {
    token_service: Arc<TokenService>,
    sso_config: SsoConfig,
    cookie_config: CookieConfig,
}

impl SsoCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        token_service: Arc<TokenService>,
        sso_config: SsoConfig,
        cookie_config: CookieConfig,
    ) -> Self {
        Self {
            token_service,
            sso_config,
            cookie_config,
        }
    }

    /// Validates a return URL before it is embedded in any redirect.
    ///
    /// A URL is trusted when it is HTTPS (unless insecure URLs are allowed
    /// for local development) and its host equals, or is a subdomain of, a
    /// registered domain.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UntrustedReturnUrl` otherwise. This is the
    /// open-redirect guard; it fails closed on anything unparseable.
    pub fn start_login(&self, return_url: &str) -> AuthResult<Url> {
        let url = Url::parse(return_url)
            .map_err(|_| AuthError::untrusted_return_url(return_url))?;

        match url.scheme() {
            "https" => {}
            "http" if self.sso_config.allow_insecure_return_urls => {}
            _ => return Err(AuthError::untrusted_return_url(return_url)),
        }

        let host = url
            .host_str()
            .ok_or_else(|| AuthError::untrusted_return_url(return_url))?;

        let trusted = self.sso_config.allowed_domains.iter().any(|domain| {
            let domain = domain.trim_start_matches('.');
            host == domain || host.ends_with(&format!(".{}", domain))
        });

        if trusted {
            Ok(url)
        } else {
            tracing::warn!(url = return_url, "Rejected untrusted return URL");
            Err(AuthError::untrusted_return_url(return_url))
        }
    }

    /// Completes a login: issues a token pair and builds the cross-domain
    /// refresh cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if token issuance fails.
    pub async fn complete_login(
        &self,
        user_id: Uuid,
        role: &str,
        email: Option<&str>,
    ) -> AuthResult<LoginSession> {
        let pair = self
            .token_service
            .issue_token_pair(user_id, role, email)
            .await?;

        Ok(self.session_from_pair(pair))
    }

    /// Builds a login session around an already-issued token pair
    /// (used by the refresh endpoint, which rotates instead of issuing).
    #[must_use]
    pub fn session_from_pair(&self, pair: TokenPair) -> LoginSession {
        let cookie = self.build_refresh_cookie(&pair.refresh_token);
        LoginSession {
            access_token: pair.access_token,
            expires_in: pair.expires_in,
            refresh_cookie: cookie,
        }
    }

    /// Logs out: revokes the refresh token and returns the clearing cookie
    /// directive.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; revoking an unknown token
    /// succeeds.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<String> {
        self.token_service.revoke_refresh_token(refresh_token).await?;
        Ok(self.build_clear_cookie())
    }

    /// Builds the `Set-Cookie` value carrying a refresh token.
    #[must_use]
    pub fn build_refresh_cookie(&self, refresh_token: &str) -> String {
        let mut cookie = Cookie::new(self.cookie_config.name.clone(), refresh_token.to_string());
        self.apply_cookie_attributes(&mut cookie);
        cookie.to_string()
    }

    /// Builds the `Set-Cookie` value that clears the refresh cookie.
    #[must_use]
    pub fn build_clear_cookie(&self) -> String {
        let mut cookie = Cookie::new(self.cookie_config.name.clone(), String::new());
        self.apply_cookie_attributes(&mut cookie);
        cookie.set_max_age(CookieDuration::ZERO);
        cookie.to_string()
    }

    /// Name of the refresh cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_config.name
    }

    fn apply_cookie_attributes(&self, cookie: &mut Cookie<'_>) {
        cookie.set_http_only(true);
        cookie.set_secure(self.cookie_config.secure);
        cookie.set_path(self.cookie_config.path.clone());
        if !self.cookie_config.domain.is_empty() {
            cookie.set_domain(self.cookie_config.domain.trim_start_matches('.').to_string());
        }
        cookie.set_same_site(match self.cookie_config.same_site.as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::refresh_token::RefreshTokenStorage;
    use crate::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};
    use crate::token::service::TokenServiceConfig;
    use crate::types::RefreshToken;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    struct MemoryTokenStorage {
        tokens: RwLock<HashMap<String, RefreshToken>>,
    }

    #[async_trait]
    impl RefreshTokenStorage for MemoryTokenStorage {
        async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
            self.tokens
                .write()
                .await
                .insert(token.token_hash.clone(), token.clone());
            Ok(())
        }
        async fn find_by_hash(&self, hash: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(self.tokens.read().await.get(hash).cloned())
        }
        async fn consume(&self, hash: &str) -> AuthResult<Option<RefreshToken>> {
            let mut tokens = self.tokens.write().await;
            let token = tokens
                .get_mut(hash)
                .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;
            if token.revoked_at.is_some() {
                return Ok(None);
            }
            let before = token.clone();
            token.revoked_at = Some(time::OffsetDateTime::now_utc());
            Ok(Some(before))
        }
        async fn revoke(&self, hash: &str) -> AuthResult<()> {
            if let Some(token) = self.tokens.write().await.get_mut(hash) {
                token.revoked_at.get_or_insert(time::OffsetDateTime::now_utc());
            }
            Ok(())
        }
        async fn revoke_chain(&self, _chain_id: Uuid) -> AuthResult<u64> {
            Ok(0)
        }
        async fn revoke_by_user(&self, _user_id: Uuid) -> AuthResult<u64> {
            Ok(0)
        }
        async fn list_by_user(&self, _user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
            Ok(Vec::new())
        }
        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }
    }

    fn build_coordinator() -> SsoCoordinator {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let jwt_service = Arc::new(JwtService::new(key_pair, "https://auth.company.com"));
        let token_service = Arc::new(TokenService::new(
            jwt_service,
            Arc::new(MemoryTokenStorage {
                tokens: RwLock::new(HashMap::new()),
            }),
            TokenServiceConfig::new("https://auth.company.com"),
        ));

        let sso_config = SsoConfig {
            allowed_domains: vec!["company.com".to_string()],
            allow_insecure_return_urls: false,
        };
        let cookie_config = CookieConfig {
            name: "idport_refresh".to_string(),
            domain: ".company.com".to_string(),
            path: "/auth".to_string(),
            secure: true,
            same_site: "lax".to_string(),
        };

        SsoCoordinator::new(token_service, sso_config, cookie_config)
    }

    #[test]
    fn test_start_login_allows_registered_domain() {
        let sso = build_coordinator();
        assert!(sso.start_login("https://company.com/dashboard").is_ok());
        assert!(sso.start_login("https://app.company.com/dashboard").is_ok());
        assert!(sso.start_login("https://deep.app.company.com/x").is_ok());
    }

    #[test]
    fn test_start_login_rejects_untrusted() {
        let sso = build_coordinator();

        let err = sso.start_login("https://evil.example.com").unwrap_err();
        assert!(matches!(err, AuthError::UntrustedReturnUrl { .. }));

        // Suffix tricks must not pass
        assert!(sso.start_login("https://evilcompany.com/").is_err());
        assert!(sso.start_login("https://company.com.evil.net/").is_err());

        // Plain HTTP rejected unless explicitly allowed
        assert!(sso.start_login("http://app.company.com/").is_err());

        // Garbage fails closed
        assert!(sso.start_login("not a url").is_err());
        assert!(sso.start_login("javascript:alert(1)").is_err());
    }

    #[tokio::test]
    async fn test_complete_login_builds_cookie() {
        let sso = build_coordinator();
        let session = sso
            .complete_login(Uuid::new_v4(), "user", Some("a@company.com"))
            .await
            .unwrap();

        assert!(!session.access_token.is_empty());
        let cookie = &session.refresh_cookie;
        assert!(cookie.starts_with("idport_refresh="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Domain=company.com"));
        assert!(cookie.contains("Path=/auth"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let sso = build_coordinator();
        let session = sso
            .complete_login(Uuid::new_v4(), "user", None)
            .await
            .unwrap();

        // The session cookie value is the refresh token itself
        let token_value = session
            .refresh_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap();

        let clear = sso.logout(&token_value).await.unwrap();
        assert!(clear.starts_with("idport_refresh=;"));
        assert!(clear.contains("Max-Age=0"));
    }

    #[test]
    fn test_same_site_none_supported() {
        let mut sso = build_coordinator();
        sso.cookie_config.same_site = "none".to_string();
        let cookie = sso.build_refresh_cookie("token");
        assert!(cookie.contains("SameSite=None"));
    }
}
