use super::{expect_row, PersistError, Persister};
use crate::models::{Activity, ActivityFields};

impl Persister {
    pub async fn activities_for_contact(
        &self,
        contact_id: i32,
        namespace: &str,
    ) -> Result<Vec<Activity>, PersistError> {
        let activities: Vec<Activity> = sqlx::query_as(
            "SELECT a.* FROM activities a JOIN contacts c ON c.id = a.contact_id
             WHERE a.contact_id = $1 AND c.namespace = $2
             ORDER BY a.date DESC, a.id DESC",
        )
        .bind(contact_id)
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    pub async fn activity(&self, id: i32, namespace: &str) -> Result<Activity, PersistError> {
        let activity: Option<Activity> = sqlx::query_as(
            "SELECT a.* FROM activities a JOIN contacts c ON c.id = a.contact_id
             WHERE a.id = $1 AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        activity.ok_or(PersistError::NotFound)
    }

    pub async fn create_activity(
        &self,
        contact_id: i32,
        fields: &ActivityFields,
        namespace: &str,
    ) -> Result<i32, PersistError> {
        let id: Option<i32> = sqlx::query_scalar(
            "INSERT INTO activities (name, date, description, contact_id)
             SELECT $1, $2, $3, id FROM contacts WHERE id = $4 AND namespace = $5
             RETURNING id",
        )
        .bind(&fields.name)
        .bind(fields.date)
        .bind(&fields.description)
        .bind(contact_id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or(PersistError::NotFound)
    }

    pub async fn update_activity(
        &self,
        id: i32,
        fields: &ActivityFields,
        namespace: &str,
    ) -> Result<(), PersistError> {
        let result = sqlx::query(
            "UPDATE activities a SET name = $3, date = $4, description = $5
             FROM contacts c
             WHERE a.id = $1 AND a.contact_id = c.id AND c.namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .bind(&fields.name)
        .bind(fields.date)
        .bind(&fields.description)
        .execute(&self.pool)
        .await?;

        expect_row(result)
    }

    /// Returns the contact the activity belonged to.
    pub async fn delete_activity(&self, id: i32, namespace: &str) -> Result<i32, PersistError> {
        let contact_id: Option<i32> = sqlx::query_scalar(
            "DELETE FROM activities a USING contacts c
             WHERE a.id = $1 AND a.contact_id = c.id AND c.namespace = $2
             RETURNING a.contact_id",
        )
        .bind(id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        contact_id.ok_or(PersistError::NotFound)
    }
}
