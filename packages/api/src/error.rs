//! Errors at the HTTP boundary.
//!
//! Every handler returns [`AppError`]. The response body is a fixed message
//! per operation; the error itself, with its whole source chain, only goes to
//! the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::{AuthError, ProviderError};
use crate::persisters::{ImportError, PersistError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not login")]
    Unauthenticated(#[from] AuthError),
    #[error("could not fetch from DB")]
    Fetch(#[source] PersistError),
    #[error("could not insert into DB")]
    Insert(#[source] PersistError),
    #[error("could not update in DB")]
    Update(#[source] PersistError),
    #[error("could not delete from DB")]
    Delete(#[source] PersistError),
    #[error("could not import user data")]
    Import(#[from] ImportError),
    #[error("invalid {0}")]
    InvalidForm(&'static str),
    #[error("not found")]
    NotFound,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(AuthError::Provider(
                ProviderError::Transport(_)
                | ProviderError::Configuration(_)
                | ProviderError::Discovery(_),
            ))
            | Self::Unauthenticated(AuthError::InvalidIssuer(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Fetch(PersistError::NotFound)
            | Self::Update(PersistError::NotFound)
            | Self::Delete(PersistError::NotFound)
            | Self::Insert(PersistError::NotFound)
            | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Import(ImportError::MissingField(_)) | Self::InvalidForm(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Fetch(_) | Self::Insert(_) | Self::Update(_) | Self::Delete(_) | Self::Import(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthenticated(AuthError::EmailNotVerified) => {
                "could not login: email not verified".to_string()
            }
            Self::NotFound
            | Self::Fetch(PersistError::NotFound)
            | Self::Update(PersistError::NotFound)
            | Self::Delete(PersistError::NotFound)
            | Self::Insert(PersistError::NotFound) => "not found".to_string(),
            other => other.to_string(),
        }
    }
}

/// `outer: inner: innermost`
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", error_chain(&self));
        } else {
            warn!(status = status.as_u16(), "{}", error_chain(&self));
        }

        (status, self.message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Unauthenticated(AuthError::EmailNotVerified).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthenticated(AuthError::Provider(ProviderError::Rejected(
                "invalid_grant".into()
            )))
            .status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthenticated(AuthError::Provider(ProviderError::Transport(
                "timed out".into()
            )))
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Fetch(PersistError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Delete(PersistError::Database(sqlx::Error::PoolTimedOut)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InvalidForm("rating").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Import(ImportError::MissingField("userData")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Import(ImportError::Persist(PersistError::Database(
                sqlx::Error::PoolTimedOut
            )))
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_chain() {
        let err = AppError::Fetch(PersistError::Database(sqlx::Error::PoolTimedOut));
        let chain = error_chain(&err);
        assert!(chain.starts_with("could not fetch from DB: database error: "));
    }

    #[tokio::test]
    async fn test_error_responses_do_not_leak_details() {
        let err = AppError::Fetch(PersistError::Database(sqlx::Error::Protocol(
            "relation \"secret_table\" does not exist".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"could not fetch from DB");
    }
}
