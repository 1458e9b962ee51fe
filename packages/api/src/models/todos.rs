use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A row of `todos`. Closing a todo clears `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i32,
    pub name: String,
    pub deadline: DateTime<Utc>,
    pub importance: i32,
    pub pending: bool,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoFields {
    pub name: String,
    pub deadline: DateTime<Utc>,
    pub importance: i32,
}
