//! # Persistence adapter
//!
//! [`Persister`] wraps the connection pool and owns every SQL statement the
//! application runs. Each operation takes the caller's namespace and filters by
//! it, so a row belonging to another user behaves exactly like a missing one.
//! Debts and activities carry no namespace of their own and are scoped through
//! their contact.
//!
//! Multi-statement operations (contact deletion, import, erasure) run in a
//! single transaction that is rolled back when the [`sqlx::Transaction`] is
//! dropped without a commit, including on early `?` returns.

mod activities;
mod contacts;
mod debts;
mod journal;
mod todos;
mod userdata;

use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;

pub use userdata::{ErasureStep, ImportError, ImportSummary, UserDataImport, ERASURE_ORDER};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("could not run migrations")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("contact {0} does not appear earlier in the import")]
    UnknownContact(i32),
    #[error("not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Persister {
    pool: PgPool,
}

impl Persister {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Updates and deletes that touch no row hit another namespace or a missing
/// id; both are reported as [`PersistError::NotFound`].
fn expect_row(result: PgQueryResult) -> Result<(), PersistError> {
    if result.rows_affected() == 0 {
        return Err(PersistError::NotFound);
    }
    Ok(())
}
