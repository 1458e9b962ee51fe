use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use super::forms::{optional, parse_email, parse_id, parse_optional_date, required, IdParam};
use super::{found, AppState};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{Activity, Contact, ContactFields, Debt};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub pronouns: String,
    pub birthday: String,
    pub address: String,
    pub notes: String,
}

impl ContactForm {
    fn fields(&self) -> Result<ContactFields, AppError> {
        Ok(ContactFields {
            first_name: required(&self.first_name, "first_name")?,
            last_name: required(&self.last_name, "last_name")?,
            nickname: optional(&self.nickname),
            email: parse_email(&self.email)?,
            pronouns: required(&self.pronouns, "pronouns")?,
            birthday: parse_optional_date(&self.birthday, "birthday")?,
            address: optional(&self.address),
            notes: optional(&self.notes),
        })
    }
}

/// A contact with everything that hangs off it.
#[derive(Debug, Serialize)]
pub struct ContactDetails {
    pub contact: Contact,
    pub debts: Vec<Debt>,
    pub activities: Vec<Activity>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = state
        .persister
        .contacts(&identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(contacts))
}

pub async fn view(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<IdParam>,
) -> Result<Json<ContactDetails>, AppError> {
    let id = params.parse()?;
    let persister = &state.persister;

    let contact = persister
        .contact(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;
    let debts = persister
        .debts_for_contact(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;
    let activities = persister
        .activities_for_contact(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(ContactDetails {
        contact,
        debts,
        activities,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    let fields = form.fields()?;
    let id = state
        .persister
        .create_contact(&fields, &identity.email)
        .await
        .map_err(AppError::Insert)?;

    Ok(found(&format!("/contacts/view?id={id}")))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    let id = parse_id(&form.id)?;
    let fields = form.fields()?;
    state
        .persister
        .update_contact(id, &fields, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found(&format!("/contacts/view?id={id}")))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    state
        .persister
        .delete_contact(id, &identity.email)
        .await
        .map_err(AppError::Delete)?;

    Ok(found("/contacts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            pronouns: "she/her".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_contact_form() {
        let fields = form().fields().unwrap();
        assert_eq!(fields.first_name, "Jane");
        assert!(fields.nickname.is_empty());
        assert!(fields.birthday.is_none());

        let fields = ContactForm {
            birthday: "1990-02-03".to_string(),
            ..form()
        }
        .fields()
        .unwrap();
        assert_eq!(fields.birthday.unwrap().to_string(), "1990-02-03");
    }

    #[test]
    fn test_contact_form_rejects_invalid_fields() {
        let missing_pronouns = ContactForm {
            pronouns: " ".to_string(),
            ..form()
        };
        assert!(matches!(
            missing_pronouns.fields(),
            Err(AppError::InvalidForm("pronouns"))
        ));

        let bad_email = ContactForm {
            email: "jane".to_string(),
            ..form()
        };
        assert!(matches!(bad_email.fields(), Err(AppError::InvalidForm("email"))));

        let bad_birthday = ContactForm {
            birthday: "tomorrow".to_string(),
            ..form()
        };
        assert!(matches!(
            bad_birthday.fields(),
            Err(AppError::InvalidForm("birthday"))
        ));
    }
}
