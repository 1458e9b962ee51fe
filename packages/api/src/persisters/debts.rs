use super::{expect_row, PersistError, Persister};
use crate::models::{Debt, DebtFields};

impl Persister {
    pub async fn debts_for_contact(
        &self,
        contact_id: i32,
        namespace: &str,
    ) -> Result<Vec<Debt>, PersistError> {
        let debts: Vec<Debt> = sqlx::query_as(
            "SELECT d.* FROM debts d JOIN contacts c ON c.id = d.contact_id
             WHERE d.contact_id = $1 AND c.namespace = $2
             ORDER BY d.id",
        )
        .bind(contact_id)
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(debts)
    }

    pub async fn debt(&self, id: i32, namespace: &str) -> Result<Debt, PersistError> {
        let debt: Option<Debt> = sqlx::query_as(
            "SELECT d.* FROM debts d JOIN contacts c ON c.id = d.contact_id
             WHERE d.id = $1 AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        debt.ok_or(PersistError::NotFound)
    }

    /// Record a debt for a contact. Fails with [`PersistError::NotFound`] if
    /// the contact is not in the namespace.
    pub async fn create_debt(
        &self,
        contact_id: i32,
        fields: &DebtFields,
        namespace: &str,
    ) -> Result<i32, PersistError> {
        let id: Option<i32> = sqlx::query_scalar(
            "INSERT INTO debts (amount, currency, description, contact_id)
             SELECT $1, $2, $3, id FROM contacts WHERE id = $4 AND namespace = $5
             RETURNING id",
        )
        .bind(fields.amount)
        .bind(&fields.currency)
        .bind(&fields.description)
        .bind(contact_id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or(PersistError::NotFound)
    }

    pub async fn update_debt(
        &self,
        id: i32,
        fields: &DebtFields,
        namespace: &str,
    ) -> Result<(), PersistError> {
        let result = sqlx::query(
            "UPDATE debts d SET amount = $3, currency = $4, description = $5
             FROM contacts c
             WHERE d.id = $1 AND d.contact_id = c.id AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .bind(fields.amount)
        .bind(&fields.currency)
        .bind(&fields.description)
        .execute(&self.pool)
        .await?;

        expect_row(result)
    }

    /// A settled debt is gone. Returns the contact it belonged to.
    pub async fn settle_debt(&self, id: i32, namespace: &str) -> Result<i32, PersistError> {
        let contact_id: Option<i32> = sqlx::query_scalar(
            "DELETE FROM debts d USING contacts c
             WHERE d.id = $1 AND d.contact_id = c.id AND c.namespace = $2
             RETURNING d.contact_id",
        )
        .bind(id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        contact_id.ok_or(PersistError::NotFound)
    }
}
