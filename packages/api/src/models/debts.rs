use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `debts`. Debts belong to a namespace through their contact.
///
/// A positive amount is owed by the contact, a negative one by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: i32,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    pub contact_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebtFields {
    pub amount: f64,
    pub currency: String,
    pub description: String,
}
