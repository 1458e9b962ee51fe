use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use super::forms::{parse_deadline, parse_id, parse_number, required, IdParam};
use super::{found, AppState};
use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{Todo, TodoFields};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TodoForm {
    pub id: String,
    pub name: String,
    pub deadline: String,
    pub importance: String,
}

impl TodoForm {
    fn fields(&self) -> Result<TodoFields, AppError> {
        Ok(TodoFields {
            name: required(&self.name, "name")?,
            deadline: parse_deadline(&self.deadline)?,
            importance: parse_number(&self.importance, "importance")?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TodoLists {
    pub pending: Vec<Todo>,
    pub done: Vec<Todo>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TodoLists>, AppError> {
    let pending = state
        .persister
        .pending_todos(&identity.email)
        .await
        .map_err(AppError::Fetch)?;
    let done = state
        .persister
        .done_todos(&identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(TodoLists { pending, done }))
}

pub async fn view(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<IdParam>,
) -> Result<Json<Todo>, AppError> {
    let id = params.parse()?;
    let todo = state
        .persister
        .todo(id, &identity.email)
        .await
        .map_err(AppError::Fetch)?;

    Ok(Json(todo))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<TodoForm>,
) -> Result<Response, AppError> {
    let fields = form.fields()?;
    state
        .persister
        .create_todo(&fields, &identity.email)
        .await
        .map_err(AppError::Insert)?;

    Ok(found("/todos"))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<TodoForm>,
) -> Result<Response, AppError> {
    let id = parse_id(&form.id)?;
    let fields = form.fields()?;
    state
        .persister
        .update_todo(id, &fields, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found(&format!("/todos/view?id={id}")))
}

pub async fn close(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    state
        .persister
        .close_todo(id, &identity.email)
        .await
        .map_err(AppError::Update)?;

    Ok(found("/todos"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<IdParam>,
) -> Result<Response, AppError> {
    let id = form.parse()?;
    state
        .persister
        .delete_todo(id, &identity.email)
        .await
        .map_err(AppError::Delete)?;

    Ok(found("/todos"))
}
