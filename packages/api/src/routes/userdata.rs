//! Snapshot export, import and erasure of everything the caller owns.

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Extension};
use futures::{stream, StreamExt};
use tracing::{error, info};

use super::{found, AppState};
use crate::auth::Identity;
use crate::error::{error_chain, AppError};
use crate::persisters::ImportError;

/// Multipart field carrying the snapshot.
const USER_DATA_FIELD: &str = "userData";

const EXPORT_CONTENT_TYPE: &str = "application/jsonl";
const EXPORT_DISPOSITION: &str = "attachment; filename=\"senbara-forms-userdata.jsonl\"";

/// Stream the snapshot as JSON Lines.
///
/// The first row is awaited before the response starts, so a snapshot that
/// cannot be opened still gets a proper error status. Failures after that can
/// only cut the body short.
pub async fn export(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AppError> {
    let mut entities = Box::pin(state.persister.user_data(&identity.email));

    let first = match entities.next().await {
        Some(Err(e)) => return Err(AppError::Fetch(e)),
        first => first,
    };

    let lines = stream::iter(first)
        .chain(entities)
        .map(|entity| -> Result<Vec<u8>, BoxError> {
            let line = entity
                .map_err(BoxError::from)
                .and_then(|entity| entity.to_line().map_err(BoxError::from));
            if let Err(e) = &line {
                error!("could not export user data: {}", error_chain(e.as_ref()));
            }
            line
        });

    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, EXPORT_DISPOSITION),
        ],
        Body::from_stream(lines),
    )
        .into_response())
}

/// Import an uploaded snapshot into the caller's namespace.
pub async fn import(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Read(e.to_string()))?
    {
        if field.name() != Some(USER_DATA_FIELD) {
            continue;
        }

        let summary = state
            .persister
            .import_user_data(&identity.email, field)
            .await?;
        info!(
            journal_entries = summary.journal_entries,
            contacts = summary.contacts,
            debts = summary.debts,
            activities = summary.activities,
            skipped = summary.skipped,
            "imported user data"
        );

        return Ok(found("/contacts"));
    }

    Err(ImportError::MissingField(USER_DATA_FIELD).into())
}

/// Erase everything, then send the browser through the provider's logout.
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AppError> {
    state
        .persister
        .delete_user_data(&identity.email)
        .await
        .map_err(AppError::Delete)?;
    info!("deleted user data");

    Ok(found(&identity.logout_url))
}
