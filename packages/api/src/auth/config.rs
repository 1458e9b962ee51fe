//! OIDC client configuration derived from [`Settings`].

use std::time::Duration;

use openidconnect::{ClientId, ClientSecret, IssuerUrl, RedirectUrl};

use super::provider::ProviderError;
use crate::settings::Settings;

/// OIDC provider configuration.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer_url: IssuerUrl,
    pub client_id: ClientId,
    pub client_secret: Option<ClientSecret>,
    pub redirect_url: RedirectUrl,
    pub timeout: Duration,
}

impl OidcConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        Ok(Self {
            issuer_url: IssuerUrl::new(settings.oidc_issuer.trim().to_string())
                .map_err(|e| ProviderError::Configuration(format!("issuer: {e}")))?,
            client_id: ClientId::new(settings.oidc_client_id.trim().to_string()),
            client_secret: settings
                .client_secret()
                .map(|secret| ClientSecret::new(secret.to_string())),
            redirect_url: RedirectUrl::new(settings.oidc_redirect_url.trim().to_string())
                .map_err(|e| ProviderError::Configuration(format!("redirect URL: {e}")))?,
            timeout: settings.provider_timeout(),
        })
    }
}
