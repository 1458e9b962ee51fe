use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `contacts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub pronouns: String,
    #[serde(default)]
    pub namespace: String,
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

/// Writable fields of a contact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub pronouns: String,
    pub birthday: Option<NaiveDate>,
    pub address: String,
    pub notes: String,
}
