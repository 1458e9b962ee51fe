//! # HTTP routes
//!
//! Every route except `/authorize` sits behind [`require_identity`], which
//! runs the [`Gate`] and hands the resulting [`Identity`] to the handler as a
//! request extension. Reads answer with JSON; writes take urlencoded forms and
//! answer with `302 Found`, like a browser form post expects.
//!
//! | Route | Method | Handler |
//! |-------|--------|---------|
//! | `/` | GET | redirect to `/contacts` |
//! | `/authorize` | GET | sign-in with `?code=`, sign-out without |
//! | `/journal`, `/journal/view` | GET | [`journal`] |
//! | `/journal/{create,update,delete}` | POST | [`journal`] |
//! | `/contacts`, `/contacts/view` | GET | [`contacts`] |
//! | `/contacts/{create,update,delete}` | POST | [`contacts`] |
//! | `/debts/view` | GET | [`debts`] |
//! | `/debts/{create,update,settle}` | POST | [`debts`] |
//! | `/activities/view` | GET | [`activities`] |
//! | `/activities/{create,update,delete}` | POST | [`activities`] |
//! | `/todos`, `/todos/view` | GET | [`todos`] |
//! | `/todos/{create,update,close,delete}` | POST | [`todos`] |
//! | `/userdata` | GET | JSONL export |
//! | `/userdata/create` | POST | multipart import |
//! | `/userdata/delete` | POST | erase everything, then log out |

pub mod activities;
pub mod authorize;
pub mod contacts;
pub mod debts;
pub mod forms;
pub mod journal;
pub mod todos;
pub mod userdata;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use tracing::{debug, info};

use crate::auth::session::append_cookies;
use crate::auth::{Authorization, Gate, Identity, Session};
use crate::error::AppError;
use crate::persisters::Persister;

/// Snapshots larger than this are rejected before the import starts.
const IMPORT_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub persister: Persister,
    pub gate: Arc<Gate>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(index))
        .route("/journal", get(journal::list))
        .route("/journal/view", get(journal::view))
        .route("/journal/create", post(journal::create))
        .route("/journal/update", post(journal::update))
        .route("/journal/delete", post(journal::delete))
        .route("/contacts", get(contacts::list))
        .route("/contacts/view", get(contacts::view))
        .route("/contacts/create", post(contacts::create))
        .route("/contacts/update", post(contacts::update))
        .route("/contacts/delete", post(contacts::delete))
        .route("/debts/view", get(debts::view))
        .route("/debts/create", post(debts::create))
        .route("/debts/update", post(debts::update))
        .route("/debts/settle", post(debts::settle))
        .route("/activities/view", get(activities::view))
        .route("/activities/create", post(activities::create))
        .route("/activities/update", post(activities::update))
        .route("/activities/delete", post(activities::delete))
        .route("/todos", get(todos::list))
        .route("/todos/view", get(todos::view))
        .route("/todos/create", post(todos::create))
        .route("/todos/update", post(todos::update))
        .route("/todos/close", post(todos::close))
        .route("/todos/delete", post(todos::delete))
        .route("/userdata", get(userdata::export))
        .route(
            "/userdata/create",
            post(userdata::import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/userdata/delete", post(userdata::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_identity));

    Router::new()
        .route("/authorize", get(authorize::authorize))
        .merge(protected)
        .with_state(state)
}

/// Run the gate. A missing or unrecoverable session ends in a redirect to the
/// provider; otherwise the handler runs with the [`Identity`] attached and
/// renewed credentials are written back as cookies.
async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = Session::from_headers(request.headers());

    match state.gate.authorize(&session).await? {
        Authorization::Redirect { location } => {
            info!(path = %request.uri().path(), "no usable session, redirecting to provider");
            Ok(found(&location))
        }
        Authorization::Granted { identity, renewed } => {
            request.extensions_mut().insert(identity);
            let mut response = next.run(request).await;

            if let Some(renewed) = renewed {
                debug!("session renewed");
                append_cookies(response.headers_mut(), renewed.cookies());
            }
            Ok(response)
        }
    }
}

async fn index(Extension(_identity): Extension<Identity>) -> Response {
    found("/contacts")
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{HeaderValue, Method};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::gate::tests::{FakeProvider, AUTHORIZATION_URL, REDIRECT_URL};
    use crate::auth::{ProviderError, TokenSet};

    /// A router whose pool never connects. Good for every path that stops
    /// before touching the database.
    pub(crate) fn test_router(provider: FakeProvider) -> Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://postgres@localhost:1/unused")
            .unwrap();

        router(AppState {
            persister: Persister::new(pool),
            gate: Arc::new(Gate::new(Arc::new(provider), REDIRECT_URL)),
        })
    }

    pub(crate) fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
        let mut request = axum::http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        if !cookies.is_empty() {
            request
                .headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(cookies).unwrap());
        }
        request
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_protected_route_without_cookies_redirects() {
        let app = test_router(FakeProvider::default());

        let response = app.oneshot(get_with_cookies("/contacts", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], AUTHORIZATION_URL);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_token_without_id_token_redirects() {
        let app = test_router(FakeProvider::default());

        let response = app
            .oneshot(get_with_cookies("/journal", "refresh_token=R1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], AUTHORIZATION_URL);
    }

    #[tokio::test]
    async fn test_index_redirects_to_contacts() {
        let app = test_router(FakeProvider::default().with_token("I1", "jane@example.com", true));

        let response = app
            .oneshot(get_with_cookies("/", "refresh_token=R1; id_token=I1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/contacts");
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_renewal_sets_cookies() {
        let app = test_router(
            FakeProvider::default()
                .with_token("I2", "jane@example.com", true)
                .refreshing_to(Ok(TokenSet {
                    id_token: Some("I2".to_string()),
                    refresh_token: Some("R2".to_string()),
                    expires_at: None,
                })),
        );

        let response = app
            .oneshot(get_with_cookies("/", "refresh_token=R1; id_token=expired"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("refresh_token=R2;"));
        assert!(cookies[1].starts_with("id_token=I2;"));
        assert!(cookies
            .iter()
            .all(|c| c.contains("HttpOnly") && c.contains("Secure") && c.contains("SameSite=Strict")));
    }

    #[tokio::test]
    async fn test_unverified_email_is_unauthorized() {
        let app = test_router(FakeProvider::default().with_token("I1", "jane@example.com", false));

        let response = app
            .oneshot(get_with_cookies("/todos", "refresh_token=R1; id_token=I1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_server_error() {
        let app = test_router(
            FakeProvider::default()
                .refreshing_to(Err(ProviderError::Transport("connection refused".to_string()))),
        );

        let response = app
            .oneshot(get_with_cookies("/contacts", "refresh_token=R1; id_token=expired"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
