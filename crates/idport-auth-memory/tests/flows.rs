//! End-to-end flows through the HTTP surface with the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;
use url::Url;

use idport_auth::account::AccountService;
use idport_auth::authz::AuthorizationEngine;
use idport_auth::config::{AuthConfig, CookieConfig, ProviderConfig, SsoConfig};
use idport_auth::http::{AppState, router};
use idport_auth::middleware::{AuthState, require_scope};
use idport_auth::oauth::{
    LinkingConfig, OAuthLinkService, ProviderClient, ProviderProfile, ProviderToken,
};
use idport_auth::sso::SsoCoordinator;
use idport_auth::token::{
    JwtService, SigningAlgorithm, SigningKeyPair, TokenService, TokenServiceConfig,
};
use idport_auth::types::Provider;
use idport_auth::{AuthError, AuthResult};
use idport_auth_memory::MemoryAuthStorage;

const ISSUER: &str = "https://auth.company.com";

// =============================================================================
// Test Fixtures
// =============================================================================

struct FakeGoogle {
    profile: ProviderProfile,
}

#[async_trait]
impl ProviderClient for FakeGoogle {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> AuthResult<Url> {
        Url::parse(&format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id=test&state={state}"
        ))
        .map_err(|e| AuthError::configuration(e.to_string()))
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken> {
        if code == "good-code" {
            Ok(ProviderToken {
                access_token: "provider-access-token".to_string(),
            })
        } else {
            Err(AuthError::upstream("google", "invalid authorization code"))
        }
    }

    async fn fetch_profile(&self, _token: &ProviderToken) -> AuthResult<ProviderProfile> {
        Ok(self.profile.clone())
    }
}

fn google_profile() -> ProviderProfile {
    ProviderProfile {
        provider_user_id: "google-sub-1".to_string(),
        email: Some("carol@gmail.com".to_string()),
        email_verified: true,
        name: Some("Carol".to_string()),
    }
}

fn build_app() -> (Router, AppState) {
    let storage = MemoryAuthStorage::new();

    let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
    let jwt_service = Arc::new(JwtService::new(key_pair, ISSUER));
    let tokens = Arc::new(TokenService::new(
        jwt_service,
        storage.refresh_tokens(),
        TokenServiceConfig::new(ISSUER),
    ));

    let accounts = Arc::new(AccountService::new(
        storage.users(),
        storage.refresh_tokens(),
    ));

    let sso = Arc::new(SsoCoordinator::new(
        tokens.clone(),
        SsoConfig {
            allowed_domains: vec!["company.com".to_string()],
            allow_insecure_return_urls: false,
        },
        CookieConfig {
            name: "idport_refresh".to_string(),
            domain: ".company.com".to_string(),
            path: "/auth".to_string(),
            secure: true,
            same_site: "lax".to_string(),
        },
    ));

    let linking = Arc::new(OAuthLinkService::new(
        vec![Arc::new(FakeGoogle {
            profile: google_profile(),
        }) as Arc<dyn ProviderClient>],
        storage.oauth_states(),
        storage.users(),
        storage.oauth_accounts(),
        LinkingConfig::default(),
    ));

    let state = AppState::new(accounts, tokens, sso, linking);
    (router(state.clone()), state)
}

// =============================================================================
// Request Helpers
// =============================================================================

async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn post_with_cookie(app: &Router, path: &str, cookie: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post(path)
                .header(header::COOKIE, format!("idport_refresh={cookie}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, path: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pulls the refresh token value out of a `Set-Cookie` header.
fn refresh_cookie_value(response: &axum::response::Response) -> String {
    let header = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    header
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .expect("cookie value")
}

async fn register_and_login(app: &Router, email: &str) -> (serde_json::Value, String, String) {
    let response = post_json(
        app,
        "/auth/register",
        serde_json::json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;

    let response = post_json(
        app,
        "/auth/login",
        serde_json::json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let refresh = refresh_cookie_value(&response);
    let session = body_json(response).await;
    let access = session["accessToken"].as_str().unwrap().to_string();
    (user, access, refresh)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_register_login_validate() {
    let (app, _) = build_app();

    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({
            "email": "Alice@Company.com",
            "password": "password123",
            "firstName": "Alice"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["email"], "alice@company.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("passwordHash").is_none());

    // Duplicate email conflicts
    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({"email": "alice@company.com", "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Short password is rejected
    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({"email": "bob@company.com", "password": "short"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Login sets the refresh cookie and returns an access token
    let response = post_json(
        &app,
        "/auth/login",
        serde_json::json!({"email": "alice@company.com", "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("idport_refresh="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Domain=company.com"));

    let session = body_json(response).await;
    let access = session["accessToken"].as_str().unwrap().to_string();
    assert_eq!(session["tokenType"], "Bearer");
    // Login delivers the refresh token only through the cookie
    assert!(session.get("refreshToken").is_none());

    // The access token validates and carries the user's identity
    let response = post_json(&app, "/auth/validate", serde_json::json!({"token": access})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let claims = body_json(response).await;
    assert_eq!(claims["sub"], user["id"]);
    assert_eq!(claims["role"], "user");
    assert_eq!(claims["iss"], ISSUER);
}

#[tokio::test]
async fn test_login_failures_are_uniform_401() {
    let (app, _) = build_app();
    register_and_login(&app, "alice@company.com").await;

    let wrong_password = post_json(
        &app,
        "/auth/login",
        serde_json::json!({"email": "alice@company.com", "password": "wrong-password"}),
    )
    .await;
    let unknown_email = post_json(
        &app,
        "/auth/login",
        serde_json::json!({"email": "ghost@company.com", "password": "password123"}),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_email).await
    );
}

#[tokio::test]
async fn test_refresh_rotation_and_reuse_detection() {
    let (app, _) = build_app();
    let (_, _, first) = register_and_login(&app, "alice@company.com").await;

    // Rotation succeeds once and hands out a different token
    let response = post_with_cookie(&app, "/auth/refresh", &first).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = refresh_cookie_value(&response);
    assert_ne!(first, second);

    // The body echoes the new token for clients that do not use the cookie
    let session = body_json(response).await;
    assert_eq!(session["refreshToken"].as_str().unwrap(), second);

    // Presenting the consumed token again is reuse
    let response = post_with_cookie(&app, "/auth/refresh", &first).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Reuse revoked the whole chain, so the successor is dead too
    let response = post_with_cookie(&app, "/auth/refresh", &second).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token_is_401() {
    let (app, _) = build_app();

    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_and_clears_cookie() {
    let (app, _) = build_app();
    let (_, _, refresh) = register_and_login(&app, "alice@company.com").await;

    let response = post_with_cookie(&app, "/auth/logout", &refresh).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let clear = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(clear.starts_with("idport_refresh=;"));
    assert!(clear.contains("Max-Age=0"));

    // The revoked token can no longer rotate
    let response = post_with_cookie(&app, "/auth/refresh", &refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logging out again is still 204
    let response = post_with_cookie(&app, "/auth/logout", &refresh).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_validate_rejects_garbage() {
    let (app, _) = build_app();

    let response = post_json(
        &app,
        "/auth/validate",
        serde_json::json!({"token": "not-a-jwt"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response
            .headers()
            .contains_key(header::WWW_AUTHENTICATE)
    );
}

#[tokio::test]
async fn test_oauth_flow_creates_user_and_session() {
    let (app, _) = build_app();

    // Initiation redirects to the provider with a bound state
    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://app.company.com/welcome",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let authorize_url = Url::parse(location).unwrap();
    assert_eq!(authorize_url.host_str(), Some("accounts.google.com"));
    let state = authorize_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .expect("state param");

    // Callback resolves the profile, creates the user, and redirects back
    let response = get(
        &app,
        &format!("/auth/oauth/google/callback?code=good-code&state={state}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://app.company.com/welcome"
    );
    let refresh = refresh_cookie_value(&response);

    // The session is real: the refresh token rotates
    let response = post_with_cookie(&app, "/auth/refresh", &refresh).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Replaying the state renders an error page, not a redirect
    let response = get(
        &app,
        &format!("/auth/oauth/google/callback?code=good-code&state={state}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn test_oauth_callback_resolves_existing_link() {
    let (app, _) = build_app();

    // First pass creates the user
    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://app.company.com/",
    )
    .await;
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let state = Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .unwrap();
    let response = get(
        &app,
        &format!("/auth/oauth/google/callback?code=good-code&state={state}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    // Second pass logs the same user in through the existing link
    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://app.company.com/",
    )
    .await;
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let state = Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .unwrap();
    let response = get(
        &app,
        &format!("/auth/oauth/google/callback?code=good-code&state={state}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    // Only one user exists for the provider identity: logging in with the
    // session proves it is the same account
    let refresh = refresh_cookie_value(&response);
    let response = post_with_cookie(&app, "/auth/refresh", &refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_oauth_initiate_rejects_untrusted_return_url() {
    let (app, _) = build_app();

    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://evil.example.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Suffix trick
    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://evilcompany.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Plain HTTP
    let response = get(
        &app,
        "/auth/oauth/google?return_url=http://app.company.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_unknown_provider_rejected() {
    let (app, _) = build_app();

    let response = get(
        &app,
        "/auth/oauth/facebook?return_url=https://app.company.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_scope_enforcement_end_to_end() {
    let (app, state) = build_app();
    let (user, access, _) = register_and_login(&app, "alice@company.com").await;

    let auth_state = AuthState::new(
        state.tokens.clone(),
        AuthorizationEngine::with_builtin_roles(),
    );
    let protected = Router::new()
        .route("/users", axum::routing::get(|| async { "ok" }))
        .layer(axum::middleware::from_fn_with_state(
            (auth_state.clone(), "users:admin"),
            require_scope,
        ))
        .with_state(auth_state);

    // No token
    let response = protected
        .clone()
        .oneshot(Request::get("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A plain user lacks users:admin
    let response = protected
        .clone()
        .oneshot(
            Request::get("/users")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An admin token passes; admin inherits everything below it
    let user_id = user["id"].as_str().unwrap().parse().unwrap();
    let pair = state
        .tokens
        .issue_token_pair(user_id, "admin", None)
        .await
        .unwrap();
    let response = protected
        .clone()
        .oneshot(
            Request::get("/users")
                .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_jwks_endpoint_serves_public_key() {
    let (app, _) = build_app();

    for path in ["/auth/jwks", "/.well-known/jwks.json"] {
        let response = get(&app, path).await;
        assert_eq!(response.status(), StatusCode::OK);
        let jwks = body_json(response).await;
        let keys = jwks["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["kty"], "RSA");
        assert_eq!(keys[0]["use"], "sig");
        assert_eq!(keys[0]["alg"], "RS256");
    }
}

#[tokio::test]
async fn test_app_state_from_config_wires_every_service() {
    let storage = MemoryAuthStorage::new();

    let mut config = AuthConfig::default();
    config.issuer = ISSUER.to_string();
    config.token.access_token_lifetime = std::time::Duration::from_secs(60);
    config.cookie.name = "company_session".to_string();
    config.cookie.domain = ".company.com".to_string();
    config.sso.allowed_domains = vec!["company.com".to_string()];
    config.providers.push(ProviderConfig::new(
        Provider::Google,
        "google-client",
        "google-secret",
        "https://auth.company.com/auth/oauth/google/callback",
    ));
    config.providers.push(
        ProviderConfig::new(
            Provider::Github,
            "github-client",
            "github-secret",
            "https://auth.company.com/auth/oauth/github/callback",
        )
        .with_enabled(false),
    );

    let state = AppState::from_config(
        &config,
        storage.users(),
        storage.oauth_accounts(),
        storage.refresh_tokens(),
        storage.oauth_states(),
    )
    .unwrap();
    let app = router(state);

    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({"email": "dave@company.com", "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The configured access lifetime and cookie name reach issued sessions
    let response = post_json(
        &app,
        "/auth/login",
        serde_json::json!({"email": "dave@company.com", "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("company_session="));
    assert!(cookie.contains("Domain=company.com"));
    let session = body_json(response).await;
    assert_eq!(session["expiresIn"], 60);

    // The issued token verifies against the configured issuer
    let access = session["accessToken"].as_str().unwrap();
    let response = post_json(&app, "/auth/validate", serde_json::json!({"token": access})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let claims = body_json(response).await;
    assert_eq!(claims["iss"], ISSUER);

    // The enabled provider redirects to its authorization endpoint
    let response = get(
        &app,
        "/auth/oauth/google?return_url=https://app.company.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://accounts.google.com/"));

    // The disabled provider was never wired
    let response = get(
        &app,
        "/auth/oauth/github?return_url=https://app.company.com/",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
