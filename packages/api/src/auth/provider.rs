//! # OpenID Connect provider
//!
//! [`IdentityProvider`] is the seam between the authorization gate and the
//! outside world. It covers the four calls the gate needs:
//!
//! - [`authorization_url`](IdentityProvider::authorization_url): where to send a
//!   browser that has no usable session.
//! - [`exchange_code`](IdentityProvider::exchange_code): trade the `code` from
//!   the `/authorize` callback for tokens.
//! - [`refresh`](IdentityProvider::refresh): trade a refresh token for a new
//!   identity token.
//! - [`verify`](IdentityProvider::verify): check an identity token's
//!   signature, issuer, audience and expiry and return its claims.
//!
//! [`OidcProvider`] implements it with `openidconnect`. The provider metadata
//! and signing keys are fetched once by [`OidcProvider::discover`], so
//! verification never leaves the process.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openidconnect::core::{
    CoreAuthenticationFlow, CoreClient, CoreIdToken, CoreProviderMetadata, CoreTokenResponse,
};
use openidconnect::{
    AuthorizationCode, CsrfToken, EndpointMaybeSet, EndpointNotSet, EndpointSet, ErrorResponse,
    Nonce, OAuth2TokenResponse, RefreshToken, RequestTokenError, Scope, TokenResponse,
};

use super::config::OidcConfig;

/// Tokens handed out by the provider's token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Claims the application reads from a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub email: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with an OAuth error, e.g. an expired grant.
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("could not reach provider: {0}")]
    Transport(String),
    #[error("invalid identity token: {0}")]
    InvalidToken(String),
    #[error("invalid provider configuration: {0}")]
    Configuration(String),
    #[error("could not discover provider: {0}")]
    Discovery(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Issuer URL as configured, used to build logout URLs.
    fn issuer(&self) -> &str;

    fn authorization_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError>;

    fn verify(&self, id_token: &str) -> Result<IdentityClaims, ProviderError>;
}

/// OIDC client type as returned by discovery.
type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

pub struct OidcProvider {
    issuer: String,
    client: DiscoveredClient,
    http_client: reqwest::Client,
}

impl OidcProvider {
    /// Fetch provider metadata and signing keys and build the client.
    pub async fn discover(config: OidcConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let metadata = CoreProviderMetadata::discover_async(config.issuer_url.clone(), &http_client)
            .await
            .map_err(|e| ProviderError::Discovery(e.to_string()))?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            config.client_id,
            config.client_secret,
        )
        .set_redirect_uri(config.redirect_url);

        Ok(Self {
            issuer: config.issuer_url.as_str().to_string(),
            client,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn authorization_url(&self) -> String {
        // State and nonce are not persisted: the session lives entirely in
        // the two credential cookies.
        let (url, _state, _nonce) = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("offline_access".to_string()))
            .url();

        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| ProviderError::Configuration(e.to_string()))?
            .request_async(&self.http_client)
            .await
            .map_err(classify)?;

        Ok(token_set(&response))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError> {
        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?
            .request_async(&self.http_client)
            .await
            .map_err(classify)?;

        Ok(token_set(&response))
    }

    fn verify(&self, id_token: &str) -> Result<IdentityClaims, ProviderError> {
        let id_token = CoreIdToken::from_str(id_token)
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;

        let verifier = self.client.id_token_verifier();
        let claims = id_token
            .claims(&verifier, |_: Option<&Nonce>| -> Result<(), String> { Ok(()) })
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;

        Ok(IdentityClaims {
            email: claims.email().map(|email| email.as_str().to_string()),
            email_verified: claims.email_verified().unwrap_or(false),
        })
    }
}

fn token_set(response: &CoreTokenResponse) -> TokenSet {
    TokenSet {
        id_token: response.id_token().map(|token| token.to_string()),
        refresh_token: response
            .refresh_token()
            .map(|token| token.secret().to_string()),
        expires_at: response
            .expires_in()
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .map(|lifetime| Utc::now() + lifetime),
    }
}

fn classify<RE, T>(err: RequestTokenError<RE, T>) -> ProviderError
where
    RE: std::error::Error + 'static,
    T: ErrorResponse + std::fmt::Display + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => ProviderError::Rejected(response.to_string()),
        RequestTokenError::Request(e) => ProviderError::Transport(e.to_string()),
        RequestTokenError::Parse(e, _) => ProviderError::Transport(e.to_string()),
        RequestTokenError::Other(message) => ProviderError::Transport(message),
    }
}
