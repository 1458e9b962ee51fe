use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use super::forms::{optional, parse_amount, parse_id, required, IdParam};
use super::{found, AppState};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{Contact, Debt, DebtFields};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DebtForm {
    pub id: String,
    pub contact_id: String,
    pub amount: String,
    pub currency: String,
    pub description: String,
}

impl DebtForm {
    fn fields(&self) -> Result<DebtFields, AppError> {
        Ok(DebtFields {
            amount: parse_amount(&self.amount)?,
            currency: required(&self.currency, "currency")?,
            description: optional(&self.description),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DebtDetails {
    pub debt: Debt,
    pub contact: Contact,
}

pub async fn view(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<IdParam>,
) -> Result<Json<DebtDetails>, AppError> {
    let id = params.parse()?;
    let debt = state
        .persister
        .debt(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;
    let contact = state
        .persister
        .contact(debt.contact_id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(DebtDetails { debt, contact }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<DebtForm>,
) -> Result<Response, AppError> {
    let contact_id = parse_id(&form.contact_id)?;
    let fields = form.fields()?;
    state
        .persister
        .create_debt(contact_id, &fields, &identity.email)
        .await
        .map_err(AppError::Insert)?;

    Ok(found(&format!("/contacts/view?id={contact_id}")))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<DebtForm>,
) -> Result<Response, AppError> {
    let id = parse_id(&form.id)?;
    let fields = form.fields()?;
    state
        .persister
        .update_debt(id, &fields, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found(&format!("/debts/view?id={id}")))
}

pub async fn settle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    let contact_id = state
        .persister
        .settle_debt(id, &identity.email)
        .await
        .map_err(AppError::Delete)?;

    Ok(found(&format!("/contacts/view?id={contact_id}")))
}
