use super::{expect_row, PersistError, Persister};
use crate::models::{Todo, TodoFields};

impl Persister {
    pub async fn pending_todos(&self, namespace: &str) -> Result<Vec<Todo>, PersistError> {
        self.todos_where_pending(true, namespace).await
    }

    pub async fn done_todos(&self, namespace: &str) -> Result<Vec<Todo>, PersistError> {
        self.todos_where_pending(false, namespace).await
    }

    async fn todos_where_pending(&self, pending: bool, namespace: &str) -> Result<Vec<Todo>, PersistError> {
        let todos: Vec<Todo> = sqlx::query_as(
            "SELECT * FROM todos WHERE pending = $1 AND namespace = $2
             ORDER BY deadline, importance DESC, id",
        )
        .bind(pending)
        .bind(namespace)
        .fetch_all(&self.pool)
        .await?;

        Ok(todos)
    }

    pub async fn todo(&self, id: i32, namespace: &str) -> Result<Todo, PersistError> {
        let todo: Option<Todo> = sqlx::query_as("SELECT * FROM todos WHERE id = $1 AND namespace = $2")
            .bind(id)
            .bind(namespace)
            .fetch_optional(&self.pool)
            .await?;

        todo.ok_or(PersistError::NotFound)
    }

    pub async fn create_todo(&self, fields: &TodoFields, namespace: &str) -> Result<i32, PersistError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO todos (name, deadline, importance, namespace) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&fields.name)
        .bind(fields.deadline)
        .bind(fields.importance)
        .bind(namespace)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn update_todo(
        &self,
        id: i32,
        fields: &TodoFields,
        namespace: &str,
    ) -> Result<(), PersistError> {
        let result = sqlx::query(
            "UPDATE todos SET name = $3, deadline = $4, importance = $5 WHERE id = $1 AND namespace = $2",
        )
        .bind(id)
        .bind(namespace)
        .bind(&fields.name)
        .bind(fields.deadline)
        .bind(fields.importance)
        .execute(&self.pool)
        .await?;

        expect_row(result)
    }

    pub async fn close_todo(&self, id: i32, namespace: &str) -> Result<(), PersistError> {
        let result = sqlx::query("UPDATE todos SET pending = FALSE WHERE id = $1 AND namespace = $2")
            .bind(id)
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        expect_row(result)
    }

    pub async fn delete_todo(&self, id: i32, namespace: &str) -> Result<(), PersistError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND namespace = $2")
            .bind(id)
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        expect_row(result)
    }
}
