//! # Authorization gate
//!
//! Runs in front of every protected route and decides whether the caller is an
//! authenticated user with a verified e-mail address.
//!
//! 1. No refresh token, or no identity token: redirect to the provider.
//! 2. The identity token verifies: read its claims.
//! 3. It does not verify: exchange the refresh token once. A rejected
//!    exchange, a response without an identity token or a new token that does
//!    not verify either all end in a redirect. The renewed credentials are
//!    handed back so the caller can overwrite the cookies.
//! 4. `email_verified` must be `true`; otherwise the request fails with
//!    [`AuthError::EmailNotVerified`] and no redirect.
//!
//! The e-mail address becomes the namespace for every query the request makes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::provider::{IdentityClaims, IdentityProvider, ProviderError};
use super::session::{IssuedSession, Session};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub logout_url: String,
}

#[derive(Debug)]
pub enum Authorization {
    /// Send the browser to `location`; nothing else is written.
    Redirect { location: String },
    Granted {
        identity: Identity,
        renewed: Option<IssuedSession>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email not verified")]
    EmailNotVerified,
    #[error("identity token has no email claim")]
    MissingEmail,
    #[error("provider returned no identity token")]
    MissingIdToken,
    #[error("provider returned no refresh token")]
    MissingRefreshToken,
    #[error("invalid issuer URL: {0}")]
    InvalidIssuer(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct Gate {
    provider: Arc<dyn IdentityProvider>,
    redirect_url: String,
}

impl Gate {
    /// `redirect_url` is both the OIDC redirect URL and the page the provider
    /// returns to after logout.
    pub fn new(provider: Arc<dyn IdentityProvider>, redirect_url: impl Into<String>) -> Self {
        Self {
            provider,
            redirect_url: redirect_url.into(),
        }
    }

    pub async fn authorize(&self, session: &Session) -> Result<Authorization, AuthError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            debug!("no refresh token, redirecting to provider");
            return Ok(self.redirect());
        };
        let Some(id_token) = session.id_token.as_deref() else {
            debug!("no identity token, redirecting to provider");
            return Ok(self.redirect());
        };

        let (id_token, claims, renewed) = match self.provider.verify(id_token) {
            Ok(claims) => (id_token.to_string(), claims, None),
            Err(e) => {
                debug!("identity token did not verify, renewing: {}", e);
                match self.renew(refresh_token).await? {
                    Some((issued, claims)) => (issued.id_token.clone(), claims, Some(issued)),
                    None => return Ok(self.redirect()),
                }
            }
        };

        if !claims.email_verified {
            return Err(AuthError::EmailNotVerified);
        }
        let email = claims.email.ok_or(AuthError::MissingEmail)?;
        let logout_url = self.logout_url(&id_token)?;

        Ok(Authorization::Granted {
            identity: Identity { email, logout_url },
            renewed,
        })
    }

    /// One refresh-token exchange. `None` means the session is beyond repair
    /// and the browser has to log in again.
    async fn renew(
        &self,
        refresh_token: &str,
    ) -> Result<Option<(IssuedSession, IdentityClaims)>, AuthError> {
        let tokens = match self.provider.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e @ ProviderError::Transport(_)) => return Err(e.into()),
            Err(e) => {
                info!("could not renew session: {}", e);
                return Ok(None);
            }
        };

        let Some(id_token) = tokens.id_token.filter(|token| !token.is_empty()) else {
            warn!("renewal response has no identity token");
            return Ok(None);
        };

        let claims = match self.provider.verify(&id_token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("renewed identity token did not verify: {}", e);
                return Ok(None);
            }
        };

        let issued = IssuedSession {
            id_token,
            refresh_token: tokens.refresh_token.filter(|token| !token.is_empty()),
            expires_at: tokens.expires_at,
        };
        Ok(Some((issued, claims)))
    }

    /// Exchange an authorization code from the `/authorize` callback. The
    /// returned identity token has already been verified.
    pub async fn sign_in(&self, code: &str) -> Result<IssuedSession, AuthError> {
        let tokens = self.provider.exchange_code(code).await?;

        let id_token = tokens
            .id_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingIdToken)?;
        self.provider.verify(&id_token)?;

        // Without a refresh cookie every later request would bounce back to
        // the provider.
        let Some(refresh_token) = tokens.refresh_token.filter(|token| !token.is_empty()) else {
            warn!("provider issued no refresh token, is offline_access allowed for this client?");
            return Err(AuthError::MissingRefreshToken);
        };

        Ok(IssuedSession {
            id_token,
            refresh_token: Some(refresh_token),
            expires_at: tokens.expires_at,
        })
    }

    fn redirect(&self) -> Authorization {
        Authorization::Redirect {
            location: self.provider.authorization_url(),
        }
    }

    /// `<issuer>/oidc/logout?id_token_hint=..&post_logout_redirect_uri=..`
    fn logout_url(&self, id_token: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(self.provider.issuer())
            .map_err(|e| AuthError::InvalidIssuer(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| AuthError::InvalidIssuer(self.provider.issuer().to_string()))?
            .pop_if_empty()
            .extend(["oidc", "logout"]);
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token)
            .append_pair("post_logout_redirect_uri", &self.redirect_url);

        Ok(url.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::provider::TokenSet;

    pub(crate) const AUTHORIZATION_URL: &str =
        "https://login.example.com/authorize?client_id=senbara&response_type=code";
    pub(crate) const REDIRECT_URL: &str = "http://localhost:1337/authorize";

    /// In-memory provider. Tokens listed in `tokens` verify with the given
    /// claims, everything else is treated as expired.
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub tokens: Mutex<HashMap<String, IdentityClaims>>,
        pub refresh_result: Mutex<Option<Result<TokenSet, ProviderError>>>,
        pub code_result: Mutex<Option<Result<TokenSet, ProviderError>>>,
        pub refresh_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn with_token(self, token: &str, email: &str, verified: bool) -> Self {
            self.tokens.lock().unwrap().insert(
                token.to_string(),
                IdentityClaims {
                    email: Some(email.to_string()),
                    email_verified: verified,
                },
            );
            self
        }

        pub fn refreshing_to(self, result: Result<TokenSet, ProviderError>) -> Self {
            *self.refresh_result.lock().unwrap() = Some(result);
            self
        }

        pub fn exchanging_to(self, result: Result<TokenSet, ProviderError>) -> Self {
            *self.code_result.lock().unwrap() = Some(result);
            self
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn issuer(&self) -> &str {
            "https://login.example.com/"
        }

        fn authorization_url(&self) -> String {
            AUTHORIZATION_URL.to_string()
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenSet, ProviderError> {
            self.code_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ProviderError::Rejected("invalid_grant".to_string())))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, ProviderError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ProviderError::Rejected("invalid_grant".to_string())))
        }

        fn verify(&self, id_token: &str) -> Result<IdentityClaims, ProviderError> {
            self.tokens
                .lock()
                .unwrap()
                .get(id_token)
                .cloned()
                .ok_or_else(|| ProviderError::InvalidToken("token expired".to_string()))
        }
    }

    fn gate_with(provider: FakeProvider) -> (Gate, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (Gate::new(provider.clone(), REDIRECT_URL), provider)
    }

    fn session(refresh_token: Option<&str>, id_token: Option<&str>) -> Session {
        Session {
            refresh_token: refresh_token.map(str::to_string),
            id_token: id_token.map(str::to_string),
        }
    }

    fn assert_redirect(authorization: Authorization) {
        match authorization {
            Authorization::Redirect { location } => assert_eq!(location, AUTHORIZATION_URL),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_cookies_redirects() {
        let (gate, provider) = gate_with(FakeProvider::default());
        assert_redirect(gate.authorize(&session(None, None)).await.unwrap());
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_token_only_redirects() {
        let (gate, provider) = gate_with(FakeProvider::default());
        assert_redirect(gate.authorize(&session(Some("R1"), None)).await.unwrap());
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_id_token_only_redirects() {
        let (gate, _) = gate_with(FakeProvider::default().with_token("I1", "jane@example.com", true));
        assert_redirect(gate.authorize(&session(None, Some("I1"))).await.unwrap());
    }

    #[tokio::test]
    async fn test_valid_token_grants_identity() {
        let (gate, provider) =
            gate_with(FakeProvider::default().with_token("I1", "jane@example.com", true));

        let Authorization::Granted { identity, renewed } =
            gate.authorize(&session(Some("R1"), Some("I1"))).await.unwrap()
        else {
            panic!("expected grant");
        };

        assert_eq!(identity.email, "jane@example.com");
        assert_eq!(
            identity.logout_url,
            "https://login.example.com/oidc/logout?id_token_hint=I1&post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A1337%2Fauthorize"
        );
        assert!(renewed.is_none());
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed_once() {
        let (gate, provider) = gate_with(
            FakeProvider::default()
                .with_token("I2", "jane@example.com", true)
                .refreshing_to(Ok(TokenSet {
                    id_token: Some("I2".to_string()),
                    refresh_token: Some("R2".to_string()),
                    expires_at: None,
                })),
        );

        let Authorization::Granted { identity, renewed } =
            gate.authorize(&session(Some("R1"), Some("expired"))).await.unwrap()
        else {
            panic!("expected grant");
        };

        assert_eq!(identity.email, "jane@example.com");
        assert!(identity.logout_url.contains("id_token_hint=I2"));
        let renewed = renewed.unwrap();
        assert_eq!(renewed.id_token, "I2");
        assert_eq!(renewed.refresh_token.as_deref(), Some("R2"));
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_renewed_token_that_fails_verification_redirects() {
        let (gate, provider) = gate_with(FakeProvider::default().refreshing_to(Ok(TokenSet {
            id_token: Some("also-expired".to_string()),
            refresh_token: None,
            expires_at: None,
        })));

        assert_redirect(
            gate.authorize(&session(Some("R1"), Some("expired")))
                .await
                .unwrap(),
        );
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_redirects() {
        let (gate, provider) = gate_with(FakeProvider::default());
        assert_redirect(
            gate.authorize(&session(Some("R1"), Some("expired")))
                .await
                .unwrap(),
        );
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_id_token_redirects() {
        let (gate, _) = gate_with(FakeProvider::default().refreshing_to(Ok(TokenSet {
            id_token: None,
            refresh_token: Some("R2".to_string()),
            expires_at: None,
        })));
        assert_redirect(
            gate.authorize(&session(Some("R1"), Some("expired")))
                .await
                .unwrap(),
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_an_error() {
        let (gate, _) = gate_with(
            FakeProvider::default()
                .refreshing_to(Err(ProviderError::Transport("timed out".to_string()))),
        );
        let err = gate
            .authorize(&session(Some("R1"), Some("expired")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Provider(ProviderError::Transport(_))));
    }

    #[tokio::test]
    async fn test_unverified_email_is_rejected() {
        let (gate, _) =
            gate_with(FakeProvider::default().with_token("I1", "jane@example.com", false));
        let err = gate
            .authorize(&session(Some("R1"), Some("I1")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));
    }

    #[tokio::test]
    async fn test_unverified_email_after_renewal_is_rejected() {
        let (gate, _) = gate_with(
            FakeProvider::default()
                .with_token("I2", "jane@example.com", false)
                .refreshing_to(Ok(TokenSet {
                    id_token: Some("I2".to_string()),
                    refresh_token: None,
                    expires_at: None,
                })),
        );
        let err = gate
            .authorize(&session(Some("R1"), Some("expired")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));
    }

    #[tokio::test]
    async fn test_sign_in_verifies_id_token() {
        let (gate, _) = gate_with(
            FakeProvider::default()
                .with_token("I1", "jane@example.com", true)
                .exchanging_to(Ok(TokenSet {
                    id_token: Some("I1".to_string()),
                    refresh_token: Some("R1".to_string()),
                    expires_at: None,
                })),
        );
        let issued = gate.sign_in("code").await.unwrap();
        assert_eq!(issued.id_token, "I1");
        assert_eq!(issued.refresh_token.as_deref(), Some("R1"));

        let (gate, _) = gate_with(FakeProvider::default().exchanging_to(Ok(TokenSet {
            id_token: Some("forged".to_string()),
            refresh_token: Some("R1".to_string()),
            expires_at: None,
        })));
        let err = gate.sign_in("code").await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(ProviderError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_sign_in_without_id_token_fails() {
        let (gate, _) = gate_with(FakeProvider::default().exchanging_to(Ok(TokenSet::default())));
        assert!(matches!(
            gate.sign_in("code").await.unwrap_err(),
            AuthError::MissingIdToken
        ));
    }

    #[tokio::test]
    async fn test_sign_in_without_refresh_token_fails() {
        let (gate, _) = gate_with(
            FakeProvider::default()
                .with_token("I1", "jane@example.com", true)
                .exchanging_to(Ok(TokenSet {
                    id_token: Some("I1".to_string()),
                    refresh_token: None,
                    expires_at: None,
                })),
        );
        assert!(matches!(
            gate.sign_in("code").await.unwrap_err(),
            AuthError::MissingRefreshToken
        ));
    }

    #[test]
    fn test_logout_url_keeps_issuer_path() {
        struct Issuer;

        #[async_trait]
        impl IdentityProvider for Issuer {
            fn issuer(&self) -> &str {
                "https://example.com/tenant"
            }
            fn authorization_url(&self) -> String {
                String::new()
            }
            async fn exchange_code(&self, _: &str) -> Result<TokenSet, ProviderError> {
                unreachable!()
            }
            async fn refresh(&self, _: &str) -> Result<TokenSet, ProviderError> {
                unreachable!()
            }
            fn verify(&self, _: &str) -> Result<IdentityClaims, ProviderError> {
                unreachable!()
            }
        }

        let gate = Gate::new(Arc::new(Issuer), "https://app.example.com/authorize");
        assert_eq!(
            gate.logout_url("tok").unwrap(),
            "https://example.com/tenant/oidc/logout?id_token_hint=tok&post_logout_redirect_uri=https%3A%2F%2Fapp.example.com%2Fauthorize"
        );
    }
}
