use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form, Json};
use serde::Deserialize;

use super::forms::{parse_id, parse_number, required, IdParam};
use super::{found, AppState};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{JournalEntry, JournalEntryFields};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JournalForm {
    pub id: String,
    pub title: String,
    pub body: String,
    pub rating: String,
}

impl JournalForm {
    fn fields(&self) -> Result<JournalEntryFields, AppError> {
        Ok(JournalEntryFields {
            title: required(&self.title, "title")?,
            body: required(&self.body, "body")?,
            rating: parse_number(&self.rating, "rating")?,
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<JournalEntry>>, AppError> {
    let entries = state
        .persister
        .journal_entries(&identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(entries))
}

pub async fn view(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<IdParam>,
) -> Result<Json<JournalEntry>, AppError> {
    let id = params.parse()?;
    let entry = state
        .persister
        .journal_entry(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(entry))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<JournalForm>,
) -> Result<Response, AppError> {
    let fields = form.fields()?;
    let id = state
        .persister
        .create_journal_entry(&fields, &identity.email)
        .await
        .map_err(AppError::Insert)?;

    Ok(found(&format!("/journal/view?id={id}")))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<JournalForm>,
) -> Result<Response, AppError> {
    let id = parse_id(&form.id)?;
    let fields = form.fields()?;
    state
        .persister
        .update_journal_entry(id, &fields, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found(&format!("/journal/view?id={id}")))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    state
        .persister
        .delete_journal_entry(id, &identity.email)
        .await
        .map_err(AppError::Delete)?;

    Ok(found("/journal"))
}
