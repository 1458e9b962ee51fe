use super::{expect_row, PersistError, Persister};
use crate::models::{JournalEntry, JournalEntryFields};

impl Persister {
    pub async fn journal_entries(&self, namespace: &str) -> Result<Vec<JournalEntry>, PersistError> {
        let entries: Vec<JournalEntry> = sqlx::query_as(
            "SELECT * FROM journal_entries WHERE namespace = $1 ORDER BY date DESC, id DESC",
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn journal_entry(&self, id: i32, namespace: &str) -> Result<JournalEntry, PersistError> {
        let entry: Option<JournalEntry> =
            sqlx::query_as("SELECT * FROM journal_entries WHERE id = $1 AND namespace = $2")
                .bind(id)
                .bind(namespace)
                .fetch_optional(&self.pool)
                .await?;

        entry.ok_or(PersistError::NotFound)
    }

    pub async fn create_journal_entry(
        &self,
        fields: &JournalEntryFields,
        namespace: &str,
    ) -> Result<i32, PersistError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO journal_entries (title, body, rating, namespace) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&fields.title)
        .bind(&fields.body)
        .bind(fields.rating)
        .bind(namespace)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn update_journal_entry(
        &self,
        id: i32,
        fields: &JournalEntryFields,
        namespace: &str,
    ) -> Result<(), PersistError> {
        let result = sqlx::query(
            "UPDATE journal_entries SET title = $3, body = $4, rating = $5 WHERE id = $1 AND namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .bind(&fields.title)
        .bind(&fields.body)
        .bind(fields.rating)
        .execute(&self.pool)
        .await?;

        expect_row(result)
    }

    pub async fn delete_journal_entry(&self, id: i32, namespace: &str) -> Result<(), PersistError> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND namespace = $2")
            .bind(id)
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        expect_row(result)
    }
}
