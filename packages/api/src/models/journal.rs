use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `journal_entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: i32,
    pub title: String,
    pub date: DateTime<Utc>,
    pub body: String,
    pub rating: i32,
    #[serde(default)]
    pub namespace: String,
}

/// Writable fields of a journal entry. The date is set by the database on
/// insert and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntryFields {
    pub title: String,
    pub body: String,
    pub rating: i32,
}
