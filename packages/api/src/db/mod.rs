//! # Database module: PostgreSQL connection pool and migrations
//!
//! The pool is built once at startup by the binary and handed to the
//! [`Persister`](crate::persisters::Persister). There is no process-wide
//! singleton: everything that needs the database receives the pool through
//! the application state.
//!
//! Migrations live in `packages/api/migrations` and are embedded into the
//! binary with [`sqlx::migrate!`].

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool to `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Apply all pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
