//! `/authorize`: the provider's redirect target.
//!
//! With a `code` the browser has just logged in and the code is exchanged for
//! credentials. Without one the browser is coming back from the provider's
//! logout page and the credentials are cleared. Either way a small page sends
//! the browser on to `/`, so the cookies are in place before the next request.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::auth::session::{append_cookies, removal_cookies};
use crate::error::AppError;

const SIGNING_IN: &str = "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><meta http-equiv=\"refresh\" content=\"0; url=/\"><title>Signing in</title></head><body><a href=\"/\">Signing in ...</a></body></html>\n";
const SIGNING_OUT: &str = "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><meta http-equiv=\"refresh\" content=\"0; url=/\"><title>Signing out</title></head><body><a href=\"/\">Signing out ...</a></body></html>\n";

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    pub code: Option<String>,
}

pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, AppError> {
    let code = params.code.as_deref().map(str::trim).filter(|code| !code.is_empty());

    let Some(code) = code else {
        info!("signing out");
        let mut response = Html(SIGNING_OUT).into_response();
        append_cookies(response.headers_mut(), removal_cookies());
        return Ok(response);
    };

    let issued = state.gate.sign_in(code).await?;
    info!("signed in");

    let mut response = Html(SIGNING_IN).into_response();
    append_cookies(response.headers_mut(), issued.cookies());
    Ok(response)
}
