//! OAuth account linking flow.
//!
//! Orchestrates the provider round-trip: initiate binds a CSRF state entry
//! to the caller's return URL, the callback verifies the state, exchanges
//! the code, and resolves the provider profile to a local user.
//!
//! Resolution policy, in order:
//!
//! 1. An existing link for `(provider, provider_user_id)` wins.
//! 2. Otherwise, an existing user with a matching verified email is linked
//!    automatically, but only when the provider also asserts a verified
//!    email. Any ambiguity fails instead of silently merging accounts.
//! 3. Otherwise a new user plus link is created.

use std::collections::HashMap;
use std::sync::Arc;

use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::provider::ProviderClient;
use crate::oauth::state::OAuthState;
use crate::storage::oauth_account::OAuthAccountStorage;
use crate::storage::oauth_state::OAuthStateStorage;
use crate::storage::user::UserStorage;
use crate::types::{OAuthAccount, Provider, User};

/// How the callback resolved the provider identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// The provider identity was already linked to a user.
    ExistingLink,
    /// A user with a matching verified email was linked.
    LinkedByEmail,
    /// A new user was created for this identity.
    Created,
}

/// Successful callback result.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    /// The resolved local user.
    pub user: User,

    /// How the identity was resolved.
    pub action: LinkAction,

    /// Return URL bound at initiation.
    pub return_url: String,
}

/// Configuration for the linking flow.
#[derive(Debug, Clone)]
pub struct LinkingConfig {
    /// State entry lifetime.
    pub state_lifetime: Duration,

    /// Role assigned to users created through OAuth.
    pub default_role: String,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            state_lifetime: Duration::minutes(10),
            default_role: "user".to_string(),
        }
    }
}

impl LinkingConfig {
    /// Sets the state entry lifetime from a config duration.
    #[must_use]
    pub fn with_state_lifetime(mut self, lifetime: std::time::Duration) -> Self {
        self.state_lifetime =
            Duration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX));
        self
    }
}

/// OAuth linking service.
pub struct OAuthLinkService {
    clients: HashMap<Provider, Arc<dyn ProviderClient>>,
    state_storage: Arc<dyn OAuthStateStorage>,
    user_storage: Arc<dyn UserStorage>,
    account_storage: Arc<dyn OAuthAccountStorage>,
    config: LinkingConfig,
}

impl OAuthLinkService {
    /// Creates a linking service.
    #[must_use]
    pub fn new(
        clients: Vec<Arc<dyn ProviderClient>>,
        state_storage: Arc<dyn OAuthStateStorage>,
        user_storage: Arc<dyn UserStorage>,
        account_storage: Arc<dyn OAuthAccountStorage>,
        config: LinkingConfig,
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|c| (c.provider(), c))
            .collect();
        Self {
            clients,
            state_storage,
            user_storage,
            account_storage,
            config,
        }
    }

    /// Starts an OAuth flow: stores a state entry bound to `return_url` and
    /// builds the provider authorization URL.
    ///
    /// The caller must have validated `return_url` against the SSO
    /// allow-list before this point.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for an unconfigured provider, or a
    /// storage error.
    pub async fn initiate(&self, provider: Provider, return_url: &str) -> AuthResult<Url> {
        let client = self.client_for(provider)?;

        let entry = OAuthState::new(provider, return_url, self.config.state_lifetime);
        let url = client.authorization_url(&entry.state)?;
        self.state_storage.create(&entry).await?;

        tracing::debug!(provider = %provider, "Initiated OAuth flow");
        Ok(url)
    }

    /// Completes an OAuth flow.
    ///
    /// Verifies the state, exchanges the code, fetches the profile, and
    /// resolves it to a local user. No user or link row is written before
    /// the provider response has been fully validated.
    ///
    /// # Errors
    ///
    /// - `AuthError::StateMismatch` if the state is unknown, expired, or
    ///   bound to a different provider
    /// - `AuthError::Upstream` if the provider exchange fails
    /// - `AuthError::Conflict` when automatic linking would be ambiguous
    pub async fn handle_callback(
        &self,
        provider: Provider,
        code: &str,
        state: &str,
    ) -> AuthResult<LinkOutcome> {
        let client = self.client_for(provider)?;

        // State is consumed before any network call so a replayed callback
        // fails immediately.
        let entry = self
            .state_storage
            .consume(state)
            .await?
            .filter(|e| !e.is_expired() && e.provider == provider)
            .ok_or(AuthError::StateMismatch)?;

        let token = client.exchange_code(code).await?;
        let profile = client.fetch_profile(&token).await?;

        // (a) Known provider identity
        if let Some(account) = self
            .account_storage
            .find_by_provider_identity(provider, &profile.provider_user_id)
            .await?
        {
            let user = self
                .user_storage
                .find_by_id(account.user_id)
                .await?
                .filter(User::is_active)
                .ok_or_else(|| AuthError::storage("Linked user missing"))?;

            return Ok(LinkOutcome {
                user,
                action: LinkAction::ExistingLink,
                return_url: entry.return_url,
            });
        }

        let email = profile
            .email
            .as_deref()
            .map(User::normalize_email)
            .ok_or_else(|| {
                AuthError::validation("Provider did not supply an email address")
            })?;

        // (b) Match by email
        if let Some(existing) = self.user_storage.find_by_email(&email).await? {
            if !profile.email_verified {
                return Err(AuthError::conflict(
                    "An account with this email exists; the provider could not \
                     verify the address, so explicit confirmation is required",
                ));
            }
            if !existing.email_verified {
                // Auto-linking here would hand the session to whoever
                // registered the unverified address.
                return Err(AuthError::conflict(
                    "An unverified account with this email exists; verify it \
                     before linking a provider",
                ));
            }

            let account =
                OAuthAccount::new(existing.id, provider, &profile.provider_user_id, &email);
            self.account_storage.create(&account).await?;

            tracing::info!(
                user_id = %existing.id,
                provider = %provider,
                "Linked provider identity by verified email"
            );

            return Ok(LinkOutcome {
                user: existing,
                action: LinkAction::LinkedByEmail,
                return_url: entry.return_url,
            });
        }

        // (c) New user
        let mut builder = User::builder(&email)
            .with_email_verified(profile.email_verified)
            .with_role(&self.config.default_role);
        if let Some(name) = &profile.name {
            builder = builder.with_first_name(name);
        }
        let user = builder.build();
        self.user_storage.create(&user).await?;

        let account = OAuthAccount::new(user.id, provider, &profile.provider_user_id, &email);
        self.account_storage.create(&account).await?;

        tracing::info!(
            user_id = %user.id,
            provider = %provider,
            "Created new user from provider identity"
        );

        Ok(LinkOutcome {
            user,
            action: LinkAction::Created,
            return_url: entry.return_url,
        })
    }

    /// Removes a provider link from a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if removing the link would leave the
    /// user with no credential at all (no password and no other link).
    pub async fn unlink(&self, user_id: Uuid, provider: Provider) -> AuthResult<()> {
        let user = self
            .user_storage
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::storage("User not found"))?;

        let links = self.account_storage.list_by_user(user_id).await?;
        if !links.iter().any(|l| l.provider == provider) {
            return Err(AuthError::validation("Provider is not linked"));
        }

        let remaining = links.len() - 1;
        if !user.has_password() && remaining == 0 {
            return Err(AuthError::conflict(
                "Cannot unlink the only remaining credential",
            ));
        }

        self.account_storage.delete(user_id, provider).await?;
        tracing::info!(user_id = %user_id, provider = %provider, "Unlinked provider");
        Ok(())
    }

    /// Lists the providers linked to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn linked_providers(&self, user_id: Uuid) -> AuthResult<Vec<OAuthAccount>> {
        self.account_storage.list_by_user(user_id).await
    }

    fn client_for(&self, provider: Provider) -> AuthResult<&Arc<dyn ProviderClient>> {
        self.clients.get(&provider).ok_or_else(|| {
            AuthError::validation(format!("Provider '{}' is not configured", provider))
        })
    }
}
