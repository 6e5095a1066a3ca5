//! External provider clients.
//!
//! One capability interface covers every provider: exchange an
//! authorization code for an access token, then fetch the user's profile.
//! The linking flow depends only on this interface, so providers are
//! swappable and tests can substitute a fake.

use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::AuthResult;
use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::types::Provider;

/// Profile returned by a provider after a successful code exchange.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Stable subject identifier issued by the provider.
    pub provider_user_id: String,

    /// Email address, if the provider disclosed one.
    pub email: Option<String>,

    /// Whether the provider asserts the email is verified.
    /// Fail-closed: absent or ambiguous means `false`.
    pub email_verified: bool,

    /// Display name, if available.
    pub name: Option<String>,
}

/// Result of exchanging an authorization code.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderToken {
    /// Bearer token for the provider's API.
    pub access_token: String,
}

/// Capability interface for one external provider.
///
/// Implementations must have bounded timeouts: a provider outage shows up
/// as `AuthError::Upstream`, never as a hung request.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> Provider;

    /// Builds the provider authorization URL embedding `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is not a valid URL.
    fn authorization_url(&self, state: &str) -> AuthResult<Url>;

    /// Exchanges an authorization code for a provider access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Upstream` if the provider is unreachable or
    /// rejects the code.
    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken>;

    /// Fetches the user's profile with a provider access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Upstream` if the provider is unreachable or the
    /// response cannot be parsed.
    async fn fetch_profile(&self, token: &ProviderToken) -> AuthResult<ProviderProfile>;
}

/// Well-known endpoints for one provider.
///
/// Defaults point at the real services; tests override them to point at a
/// local mock server.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Authorization endpoint the user is redirected to.
    pub authorize_url: String,

    /// Token endpoint for the code exchange.
    pub token_url: String,

    /// Userinfo/profile endpoint.
    pub userinfo_url: String,
}

impl ProviderEndpoints {
    /// Default endpoints for a provider.
    #[must_use]
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Google => Self {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            },
            Provider::Github => Self {
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
            },
            Provider::Microsoft => Self {
                authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                    .to_string(),
                token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                    .to_string(),
                userinfo_url: "https://graph.microsoft.com/v1.0/me".to_string(),
            },
        }
    }
}

/// HTTP-backed provider client.
pub struct HttpProviderClient {
    config: ProviderConfig,
    endpoints: ProviderEndpoints,
    http_client: reqwest::Client,
}

impl HttpProviderClient {
    /// Creates a client with the default endpoints for the configured
    /// provider and a 10 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> AuthResult<Self> {
        let endpoints = ProviderEndpoints::for_provider(config.provider);
        Self::with_endpoints(config, endpoints)
    }

    /// Creates a client with explicit endpoints.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn with_endpoints(config: ProviderConfig, endpoints: ProviderEndpoints) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            endpoints,
            http_client,
        })
    }

    /// Overrides the request timeout (10 seconds by default).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be
    /// rebuilt.
    pub fn with_request_timeout(mut self, timeout: Duration) -> AuthResult<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Posts the code exchange form, retrying once on transient transport
    /// errors.
    async fn post_token_request(&self, code: &str) -> AuthResult<reqwest::Response> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let send = || {
            self.http_client
                .post(&self.endpoints.token_url)
                .header(reqwest::header::ACCEPT, "application/json")
                .form(&params)
                .send()
        };

        self.send_with_retry("Code exchange failed", send).await
    }

    /// Sends a provider request, retrying once on transient transport
    /// errors (timeout or failed connect). Anything else is surfaced as
    /// `Upstream` immediately.
    async fn send_with_retry<F, Fut>(&self, context: &str, send: F) -> AuthResult<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        match send().await {
            Ok(response) => Ok(response),
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::debug!(
                    provider = %self.config.provider,
                    request = context,
                    "Transient provider error, retrying once"
                );
                send()
                    .await
                    .map_err(|e| self.upstream(format!("{}: {}", context, e)))
            }
            Err(e) => Err(self.upstream(format!("{}: {}", context, e))),
        }
    }

    fn upstream(&self, message: String) -> AuthError {
        AuthError::upstream(self.config.provider.as_str(), message)
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    fn authorization_url(&self, state: &str) -> AuthResult<Url> {
        let mut url = Url::parse(&self.endpoints.authorize_url)
            .map_err(|e| AuthError::configuration(format!("Invalid authorize URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken> {
        let response = self.post_token_request(code).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Surface the OAuth error code when the body carries one
            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(self.upstream(format!(
                    "{}: {}",
                    oauth_error.error,
                    oauth_error.error_description.unwrap_or_default()
                )));
            }

            return Err(self.upstream(format!("Code exchange failed: HTTP {}", status)));
        }

        response
            .json::<ProviderToken>()
            .await
            .map_err(|e| self.upstream(format!("Failed to parse token response: {}", e)))
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> AuthResult<ProviderProfile> {
        let send = || {
            self.http_client
                .get(&self.endpoints.userinfo_url)
                .bearer_auth(&token.access_token)
                .header(reqwest::header::ACCEPT, "application/json")
                .header(reqwest::header::USER_AGENT, "idport-auth")
                .send()
        };
        let response = self.send_with_retry("Profile fetch failed", send).await?;

        if !response.status().is_success() {
            return Err(self.upstream(format!(
                "Profile fetch failed: HTTP {}",
                response.status()
            )));
        }

        let profile = match self.config.provider {
            Provider::Google => {
                let raw: GoogleUserinfo = response
                    .json()
                    .await
                    .map_err(|e| self.upstream(format!("Failed to parse profile: {}", e)))?;
                ProviderProfile {
                    provider_user_id: raw.sub,
                    email: raw.email,
                    email_verified: raw.email_verified.unwrap_or(false),
                    name: raw.name,
                }
            }
            Provider::Github => {
                let raw: GithubUser = response
                    .json()
                    .await
                    .map_err(|e| self.upstream(format!("Failed to parse profile: {}", e)))?;
                // GitHub exposes only confirmed addresses on the profile; an
                // absent email means we cannot assert anything.
                let email_verified = raw.email.is_some();
                ProviderProfile {
                    provider_user_id: raw.id.to_string(),
                    email: raw.email,
                    email_verified,
                    name: raw.name,
                }
            }
            Provider::Microsoft => {
                let raw: MicrosoftUser = response
                    .json()
                    .await
                    .map_err(|e| self.upstream(format!("Failed to parse profile: {}", e)))?;
                let email = raw.mail.or(raw.user_principal_name);
                let email_verified = email.is_some();
                ProviderProfile {
                    provider_user_id: raw.id,
                    email,
                    email_verified,
                    name: raw.display_name,
                }
            }
        };

        Ok(profile)
    }
}

/// Standard OAuth error body.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserinfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MicrosoftUser {
    id: String,
    mail: Option<String>,
    user_principal_name: Option<String>,
    display_name: Option<String>,
}
