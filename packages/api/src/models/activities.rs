use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `activities`, something done together with a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i32,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub contact_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFields {
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
}
