use super::{expect_row, PersistError, Persister};
use crate::models::{Contact, ContactFields};

impl Persister {
    pub async fn contacts(&self, namespace: &str) -> Result<Vec<Contact>, PersistError> {
        let contacts: Vec<Contact> = sqlx::query_as(
            "SELECT * FROM contacts WHERE namespace = $1 ORDER BY first_name, last_name, id",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    pub async fn contact(&self, id: i32, namespace: &str) -> Result<Contact, PersistError> {
        let contact: Option<Contact> =
            sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND namespace = $2")
                .bind(id)
                .bind(namespace)
                .fetch_optional(&self.pool)
                .await?;

        contact.ok_or(PersistError::NotFound)
    }

    pub async fn create_contact(
        &self,
        fields: &ContactFields,
        namespace: &str,
    ) -> Result<i32, PersistError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO contacts (first_name, last_name, nickname, email, pronouns, namespace, birthday, address, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.nickname)
        .bind(&fields.email)
        .bind(&fields.pronouns)
        .bind(namespace)
        .bind(fields.birthday)
        .bind(&fields.address)
        .bind(&fields.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn update_contact(
        &self,
        id: i32,
        fields: &ContactFields,
        namespace: &str,
    ) -> Result<(), PersistError> {
        let result = sqlx::query(
            "UPDATE contacts SET
                first_name = $3,
                last_name = $4,
                nickname = $5,
                email = $6,
                pronouns = $7,
                birthday = $8,
                address = $9,
                notes = $10
             WHERE id = $1 AND namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.nickname)
        .bind(&fields.email)
        .bind(&fields.pronouns)
        .bind(fields.birthday)
        .bind(&fields.address)
        .bind(&fields.notes)
        .execute(&self.pool)
        .await?;

        expect_row(result)
    }

    /// Delete a contact together with its activities and debts.
    pub async fn delete_contact(&self, id: i32, namespace: &str) -> Result<(), PersistError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM activities a USING contacts c
             WHERE a.contact_id = c.id AND c.id = $1 AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM debts d USING contacts c
             WHERE d.contact_id = c.id AND c.id = $1 AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND namespace = $2")
            .bind(id)
            .bind(namespace)
            .execute(&mut *tx)
            .await?;
        expect_row(result)?;

        tx.commit().await?;
        Ok(())
    }
}
