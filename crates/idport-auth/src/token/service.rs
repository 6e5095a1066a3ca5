//! Token authority.
//!
//! This module owns the refresh token lifecycle and access token minting:
//!
//! - Token pair issuance at login
//! - Access token verification (pure, no I/O)
//! - Refresh token rotation with reuse detection
//! - Revocation (single token, chain, or all sessions of a user)
//!
//! # Usage
//!
//! ```ignore
//! use idport_auth::token::{TokenService, TokenServiceConfig};
//!
//! let config = TokenServiceConfig::new("https://auth.example.com");
//! let service = TokenService::new(jwt_service, refresh_storage, config);
//!
//! let pair = service.issue_token_pair(user_id, "user", None).await?;
//! let claims = service.verify_access_token(&pair.access_token)?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::token::jwt::{AccessTokenClaims, JwtError, JwtService};
use crate::types::refresh_token::RefreshToken;

/// An issued token pair.
///
/// `refresh_token` is the plaintext value; it is handed to the client once
/// and never stored.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Signed access token (JWT).
    pub access_token: String,

    /// Plaintext refresh token.
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Server issuer URL (included in tokens as `iss`).
    pub issuer: String,

    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,
}

impl TokenServiceConfig {
    /// Creates a new configuration with defaults.
    ///
    /// # Arguments
    ///
    /// * `issuer` - The authority's issuer URL
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::minutes(15),
            refresh_token_lifetime: Duration::days(30),
        }
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Creates a configuration from the lifetime section of `AuthConfig`.
    #[must_use]
    pub fn from_lifetimes(
        issuer: impl Into<String>,
        lifetimes: &crate::config::TokenLifetimes,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: to_time_duration(lifetimes.access_token_lifetime),
            refresh_token_lifetime: to_time_duration(lifetimes.refresh_token_lifetime),
        }
    }
}

fn to_time_duration(duration: std::time::Duration) -> Duration {
    Duration::seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}

/// Token service for issuing and rotating tokens.
pub struct TokenService {
    /// JWT service for encoding/decoding access tokens.
    jwt_service: Arc<JwtService>,

    /// Refresh token storage.
    refresh_token_storage: Arc<dyn RefreshTokenStorage>,

    /// Service configuration.
    config: TokenServiceConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        jwt_service: Arc<JwtService>,
        refresh_token_storage: Arc<dyn RefreshTokenStorage>,
        config: TokenServiceConfig,
    ) -> Self {
        Self {
            jwt_service,
            refresh_token_storage,
            config,
        }
    }

    /// Issues a fresh token pair for a user.
    ///
    /// Mints a signed access token and a new refresh token that starts a
    /// new rotation chain (`rotated_from = None`).
    ///
    /// # Arguments
    ///
    /// * `user_id` - The authenticated user
    /// * `role` - The user's role name, embedded in the access token
    /// * `email` - Optional email claim
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding or storage fails.
    ///
    /// # Security
    ///
    /// Only the SHA-256 hash of the refresh token is persisted. Tokens are
    /// never logged.
    pub async fn issue_token_pair(
        &self,
        user_id: Uuid,
        role: &str,
        email: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let access_token = self.mint_access_token(user_id, role, email)?;

        let now = OffsetDateTime::now_utc();
        let refresh_value = RefreshToken::generate_token();
        let record = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&refresh_value),
            user_id,
            chain_id: Uuid::new_v4(),
            rotated_from: None,
            client_fingerprint: None,
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
        };
        self.refresh_token_storage.create(&record).await?;

        tracing::debug!(
            user_id = %user_id,
            chain_id = %record.chain_id,
            "Issued new token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token: refresh_value,
            expires_in: self.config.access_token_lifetime.whole_seconds() as u64,
        })
    }

    /// Verifies an access token and returns its claims.
    ///
    /// Pure computation: checks signature, expiry, and issuer against the
    /// service's public key. No storage lookup.
    ///
    /// # Errors
    ///
    /// - `AuthError::TokenExpired` if the token is past its `exp`
    /// - `AuthError::InvalidSignature` if the signature does not verify
    /// - `AuthError::InvalidToken` for malformed tokens or claims
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let data = self
            .jwt_service
            .decode::<AccessTokenClaims>(token)
            .map_err(map_jwt_error)?;
        Ok(data.claims)
    }

    /// Rotates a refresh token, returning a new token pair.
    ///
    /// The old token is consumed atomically: under a race, exactly one
    /// caller succeeds. Presenting an already-consumed token is treated as
    /// theft evidence and revokes the whole rotation chain.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The plaintext refresh token being spent
    /// * `role` - Current role of the owning user
    /// * `email` - Optional email claim for the new access token
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidGrant` if the token is unknown
    /// - `AuthError::TokenExpired` if the token is past its expiry
    /// - `AuthError::ReuseDetected` if the token was already rotated; every
    ///   token in its chain is revoked before this error returns
    ///
    /// # Security
    ///
    /// A stolen-then-reused token is detectable because the legitimate
    /// client will also present the now-revoked token. Both holders lose
    /// the session, forcing re-authentication.
    pub async fn rotate_refresh_token(
        &self,
        refresh_token: &str,
        role: &str,
        email: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let token_hash = RefreshToken::hash_token(refresh_token);

        let consumed = self.refresh_token_storage.consume(&token_hash).await?;

        let old_token = match consumed {
            Some(token) => token,
            None => {
                // The token exists but was already revoked: either an
                // attacker replayed a rotated token, or the legitimate
                // client is retrying after theft. Revoke the whole chain.
                let stored = self
                    .refresh_token_storage
                    .find_by_hash(&token_hash)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

                let revoked = self
                    .refresh_token_storage
                    .revoke_chain(stored.chain_id)
                    .await?;

                tracing::warn!(
                    user_id = %stored.user_id,
                    chain_id = %stored.chain_id,
                    revoked_count = revoked,
                    "Refresh token reuse detected, chain revoked"
                );

                return Err(AuthError::ReuseDetected);
            }
        };

        if old_token.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        let access_token = self.mint_access_token(old_token.user_id, role, email)?;

        // Successor inherits the chain; expiry window restarts.
        let now = OffsetDateTime::now_utc();
        let refresh_value = RefreshToken::generate_token();
        let new_token = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&refresh_value),
            user_id: old_token.user_id,
            chain_id: old_token.chain_id,
            rotated_from: Some(old_token.id),
            client_fingerprint: old_token.client_fingerprint.clone(),
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
        };
        self.refresh_token_storage.create(&new_token).await?;

        tracing::debug!(
            user_id = %old_token.user_id,
            chain_id = %old_token.chain_id,
            "Rotated refresh token"
        );

        Ok(TokenPair {
            access_token,
            refresh_token: refresh_value,
            expires_in: self.config.access_token_lifetime.whole_seconds() as u64,
        })
    }

    /// Looks up the owner of a refresh token without consuming it.
    ///
    /// Used by the refresh endpoint to load the user's current role before
    /// rotation, so freshly minted access tokens reflect role changes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if the token is unknown.
    pub async fn refresh_token_owner(&self, refresh_token: &str) -> AuthResult<Uuid> {
        let token_hash = RefreshToken::hash_token(refresh_token);
        let token = self
            .refresh_token_storage
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;
        Ok(token.user_id)
    }

    /// Revokes a single refresh token. Idempotent; used on logout.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails. Revoking an unknown token
    /// succeeds silently so logout never leaks token validity.
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        let token_hash = RefreshToken::hash_token(refresh_token);
        self.refresh_token_storage.revoke(&token_hash).await
    }

    /// Revokes all refresh tokens for a user.
    ///
    /// Used on password change, account deletion, and security events.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        let revoked = self.refresh_token_storage.revoke_by_user(user_id).await?;
        tracing::info!(
            user_id = %user_id,
            revoked_count = revoked,
            "Revoked all sessions for user"
        );
        Ok(revoked)
    }

    /// Lists active sessions (non-revoked, non-expired refresh tokens) for
    /// a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn list_sessions(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
        self.refresh_token_storage.list_by_user(user_id).await
    }

    /// Deletes expired and revoked tokens.
    ///
    /// Optional maintenance task; expiry is enforced lazily at use time.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.refresh_token_storage.cleanup_expired().await
    }

    /// Returns the JWKS containing the verification key(s).
    #[must_use]
    pub fn jwks(&self) -> crate::token::jwt::Jwks {
        self.jwt_service.jwks()
    }

    fn mint_access_token(
        &self,
        user_id: Uuid,
        role: &str,
        email: Option<&str>,
    ) -> AuthResult<String> {
        let mut claims = AccessTokenClaims::new(
            self.jwt_service.issuer(),
            user_id.to_string(),
            role,
            self.config.access_token_lifetime.whole_seconds(),
        );
        if let Some(email) = email {
            claims = claims.with_email(email);
        }

        self.jwt_service
            .encode(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode access token: {}", e)))
    }
}

fn map_jwt_error(err: JwtError) -> AuthError {
    match err {
        JwtError::Expired => AuthError::TokenExpired,
        JwtError::InvalidSignature => AuthError::InvalidSignature,
        other => AuthError::invalid_token(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
