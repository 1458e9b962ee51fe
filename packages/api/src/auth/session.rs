//! Session cookies.
//!
//! A browser session is nothing but two cookies: the provider's refresh token
//! and the current identity token. All cookie attributes are decided here.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use cookie::{Cookie, CookieBuilder, SameSite};
use time::OffsetDateTime;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const ID_TOKEN_COOKIE: &str = "id_token";

const REFRESH_TOKEN_LIFETIME: time::Duration = time::Duration::days(365);

/// Credentials presented by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

impl Session {
    /// Read both credentials from the request's `Cookie` headers. Empty
    /// values count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut session = Self::default();

        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };

            for cookie in Cookie::split_parse(value).flatten() {
                let slot = match cookie.name() {
                    REFRESH_TOKEN_COOKIE => &mut session.refresh_token,
                    ID_TOKEN_COOKIE => &mut session.id_token,
                    _ => continue,
                };
                if !cookie.value().is_empty() {
                    *slot = Some(cookie.value().to_string());
                }
            }
        }

        session
    }
}

/// Credentials freshly issued by the provider, either at sign-in or after a
/// silent renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub id_token: String,
    /// Only present when the provider rotated the refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssuedSession {
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        let mut cookies = Vec::with_capacity(2);
        if let Some(refresh_token) = &self.refresh_token {
            cookies.push(refresh_token_cookie(refresh_token.clone()));
        }
        cookies.push(id_token_cookie(self.id_token.clone(), self.expires_at));
        cookies
    }
}

fn credential_cookie(name: &'static str, value: String) -> CookieBuilder<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
}

pub fn refresh_token_cookie(value: String) -> Cookie<'static> {
    credential_cookie(REFRESH_TOKEN_COOKIE, value)
        .expires(OffsetDateTime::now_utc() + REFRESH_TOKEN_LIFETIME)
        .build()
}

/// Without a provider-issued expiry the cookie lives for the browser session.
pub fn id_token_cookie(value: String, expires_at: Option<DateTime<Utc>>) -> Cookie<'static> {
    let builder = credential_cookie(ID_TOKEN_COOKIE, value);
    match expires_at.and_then(|at| OffsetDateTime::from_unix_timestamp(at.timestamp()).ok()) {
        Some(at) => builder.expires(at).build(),
        None => builder.build(),
    }
}

/// Cookies that delete both credentials.
pub fn removal_cookies() -> Vec<Cookie<'static>> {
    [REFRESH_TOKEN_COOKIE, ID_TOKEN_COOKIE]
        .into_iter()
        .map(|name| {
            let mut cookie = credential_cookie(name, String::new()).build();
            cookie.make_removal();
            cookie
        })
        .collect()
}

/// Append one `Set-Cookie` header per cookie.
pub fn append_cookies(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = Cookie<'static>>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(name = cookie.name(), "could not encode cookie: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_session_from_headers() {
        let session = Session::from_headers(&headers(&["theme=dark; refresh_token=R1", "id_token=I1"]));
        assert_eq!(session.refresh_token.as_deref(), Some("R1"));
        assert_eq!(session.id_token.as_deref(), Some("I1"));
    }

    #[test]
    fn test_session_refresh_token_only() {
        let session = Session::from_headers(&headers(&["refresh_token=R1"]));
        assert_eq!(session.refresh_token.as_deref(), Some("R1"));
        assert!(session.id_token.is_none());
    }

    #[test]
    fn test_empty_cookie_counts_as_absent() {
        let session = Session::from_headers(&headers(&["refresh_token=; id_token=I1"]));
        assert!(session.refresh_token.is_none());
        assert_eq!(session.id_token.as_deref(), Some("I1"));
    }

    #[test]
    fn test_credential_cookie_attributes() {
        let cookie = refresh_token_cookie("R2".to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));

        let expires = cookie.expires_datetime().unwrap();
        let remaining = expires - OffsetDateTime::now_utc();
        assert!(remaining > time::Duration::days(364));
    }

    #[test]
    fn test_id_token_cookie_expires_with_provider() {
        let at = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let cookie = id_token_cookie("I2".to_string(), Some(at));
        assert_eq!(
            cookie.expires_datetime().unwrap().unix_timestamp(),
            at.timestamp()
        );

        let session_cookie = id_token_cookie("I2".to_string(), None);
        assert!(session_cookie.expires().is_none());
    }

    #[test]
    fn test_issued_session_without_rotation_keeps_refresh_cookie() {
        let issued = IssuedSession {
            id_token: "I3".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        let cookies = issued.cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), ID_TOKEN_COOKIE);
    }

    #[test]
    fn test_removal_cookies() {
        let mut response = HeaderMap::new();
        append_cookies(&mut response, removal_cookies());

        let values: Vec<_> = response
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("refresh_token=;"));
        assert!(values[1].starts_with("id_token=;"));
        assert!(values.iter().all(|v| v.contains("Max-Age=0") && v.contains("Path=/")));
    }
}
