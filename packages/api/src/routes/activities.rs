use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use super::forms::{optional, parse_date, parse_id, required, IdParam};
use super::{found, AppState};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{Activity, ActivityFields, Contact};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivityForm {
    pub id: String,
    pub contact_id: String,
    pub name: String,
    pub date: String,
    pub description: String,
}

impl ActivityForm {
    fn fields(&self) -> Result<ActivityFields, AppError> {
        Ok(ActivityFields {
            name: required(&self.name, "name")?,
            date: parse_date(&self.date, "date")?,
            description: optional(&self.description),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityDetails {
    pub activity: Activity,
    pub contact: Contact,
}

pub async fn view(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<IdParam>,
) -> Result<Json<ActivityDetails>, AppError> {
    let id = params.parse()?;
    let activity = state
        .persister
        .activity(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;
    let contact = state
        .persister
        .contact(activity.contact_id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(ActivityDetails { activity, contact }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ActivityForm>,
) -> Result<Response, AppError> {
    let contact_id = parse_id(&form.contact_id)?;
    let fields = form.fields()?;
    let id = state
        .persister
        .create_activity(contact_id, &fields, &identity.email)
        .await
        .map_err(AppError::Insert)?;

    Ok(found(&format!("/activities/view?id={id}")))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ActivityForm>,
) -> Result<Response, AppError> {
    let id = parse_id(&form.id)?;
    let fields = form.fields()?;
    state
        .persister
        .update_activity(id, &fields, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found(&format!("/activities/view?id={id}")))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    let contact_id = state
        .persister
        .delete_activity(id, &identity.email)
        .await
        .map_err(AppError::Delete)?;

    Ok(found(&format!("/contacts/view?id={contact_id}")))
}
