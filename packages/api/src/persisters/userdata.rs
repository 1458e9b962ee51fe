//! # User data: export, import and erasure
//!
//! - [`Persister::user_data`] streams every row a namespace owns as
//!   [`ExportedEntity`] values. The rows are read by a background task inside
//!   one read-only, repeatable-read transaction, so the snapshot is consistent
//!   and only a bounded number of rows is held in memory. Dropping the stream
//!   stops the task and ends the transaction.
//! - [`Persister::import_user_data`] reads a snapshot upload and inserts it
//!   through a [`UserDataImport`], committing only after the upload ended
//!   cleanly.
//! - [`Persister::delete_user_data`] runs [`ERASURE_ORDER`] in one transaction.

use std::collections::HashMap;
use std::fmt::Display;

use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use super::{PersistError, Persister};
use crate::models::{
    Activity, Contact, Debt, Decoded, EntityKind, ExportedEntity, JournalEntry, RecordReader,
};

/// Rows buffered between the export task and the response body.
const EXPORT_BUFFER: usize = 64;

/// One statement of the erasure, bound to the namespace as `$1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErasureStep {
    pub table: &'static str,
    pub statement: &'static str,
}

/// Erasure runs dependents before the rows they reference: activities and
/// debts point at contacts through foreign keys.
pub const ERASURE_ORDER: [ErasureStep; 5] = [
    ErasureStep {
        table: "activities",
        statement: "DELETE FROM activities a USING contacts c WHERE a.contact_id = c.id AND c.namespace = $1",
    },
    ErasureStep {
        table: "debts",
        statement: "DELETE FROM debts d USING contacts c WHERE d.contact_id = c.id AND c.namespace = $1",
    },
    ErasureStep {
        table: "contacts",
        statement: "DELETE FROM contacts WHERE namespace = $1",
    },
    ErasureStep {
        table: "journal_entries",
        statement: "DELETE FROM journal_entries WHERE namespace = $1",
    },
    ErasureStep {
        table: "todos",
        statement: "DELETE FROM todos WHERE namespace = $1",
    },
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read upload: {0}")]
    Read(String),
    #[error("missing form field {0:?}")]
    MissingField(&'static str),
    #[error("could not decode record")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Rows written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub journal_entries: usize,
    pub contacts: usize,
    pub debts: usize,
    pub activities: usize,
    pub skipped: usize,
}

/// A running import. Every row gets a fresh id and the importing namespace;
/// contact ids from the snapshot are remapped so debts and activities follow
/// their contact. Nothing is visible until [`commit`](Self::commit), and
/// dropping the import rolls it back.
pub struct UserDataImport {
    tx: Transaction<'static, Postgres>,
    namespace: String,
    contact_ids: HashMap<i32, i32>,
    summary: ImportSummary,
}

impl UserDataImport {
    pub async fn insert(&mut self, entity: ExportedEntity) -> Result<(), PersistError> {
        match entity {
            ExportedEntity::JournalEntry(entry) => {
                sqlx::query(
                    "INSERT INTO journal_entries (title, date, body, rating, namespace) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(&entry.title)
                .bind(entry.date)
                .bind(&entry.body)
                .bind(entry.rating)
                .bind(&self.namespace)
                .execute(&mut *self.tx)
                .await?;

                self.summary.journal_entries += 1;
            }
            ExportedEntity::Contact(contact) => {
                let id: i32 = sqlx::query_scalar(
                    "INSERT INTO contacts (first_name, last_name, nickname, email, pronouns, namespace, birthday, address, notes)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
                )
                .bind(&contact.first_name)
                .bind(&contact.last_name)
                .bind(&contact.nickname)
                .bind(&contact.email)
                .bind(&contact.pronouns)
                .bind(&self.namespace)
                .bind(contact.birthday)
                .bind(&contact.address)
                .bind(&contact.notes)
                .fetch_one(&mut *self.tx)
                .await?;

                self.contact_ids.insert(contact.id, id);
                self.summary.contacts += 1;
            }
            ExportedEntity::Debt(debt) => {
                let contact_id = self.contact_id(debt.contact_id)?;
                sqlx::query(
                    "INSERT INTO debts (amount, currency, description, contact_id) VALUES ($1, $2, $3, $4)",
                )
                .bind(debt.amount)
                .bind(&debt.currency)
                .bind(&debt.description)
                .bind(contact_id)
                .execute(&mut *self.tx)
                .await?;

                self.summary.debts += 1;
            }
            ExportedEntity::Activity(activity) => {
                let contact_id = self.contact_id(activity.contact_id)?;
                sqlx::query(
                    "INSERT INTO activities (name, date, description, contact_id) VALUES ($1, $2, $3, $4)",
                )
                .bind(&activity.name)
                .bind(activity.date)
                .bind(&activity.description)
                .bind(contact_id)
                .execute(&mut *self.tx)
                .await?;

                self.summary.activities += 1;
            }
        }

        Ok(())
    }

    /// Decode one snapshot value and insert it. Unknown kinds are skipped.
    pub async fn insert_value(&mut self, value: Value) -> Result<(), ImportError> {
        match ExportedEntity::decode(value)? {
            Decoded::Entity(entity) => self.insert(entity).await?,
            Decoded::Unknown(name) => {
                warn!(entity_name = %name, "skipping record of unknown kind");
                self.summary.skipped += 1;
            }
        }
        Ok(())
    }

    pub async fn commit(self) -> Result<ImportSummary, PersistError> {
        self.tx.commit().await?;
        Ok(self.summary)
    }

    fn contact_id(&self, exported: i32) -> Result<i32, PersistError> {
        self.contact_ids
            .get(&exported)
            .copied()
            .ok_or(PersistError::UnknownContact(exported))
    }
}

impl Persister {
    /// Stream a consistent snapshot of everything `namespace` owns, in
    /// [`EntityKind::ALL`] order.
    ///
    /// Errors are delivered as the last item of the stream.
    pub fn user_data(
        &self,
        namespace: &str,
    ) -> impl Stream<Item = Result<ExportedEntity, PersistError>> + Send + 'static {
        let (mut sink, stream) = mpsc::channel(EXPORT_BUFFER);
        let pool = self.pool.clone();
        let namespace = namespace.to_string();

        tokio::spawn(async move {
            if let Err(e) = export(&pool, &namespace, &mut sink).await {
                // The receiver may already be gone; then nobody is left to tell.
                let _ = sink.send(Err(e)).await;
            }
        });

        stream
    }

    pub async fn begin_import(&self, namespace: &str) -> Result<UserDataImport, PersistError> {
        Ok(UserDataImport {
            tx: self.pool.begin().await?,
            namespace: namespace.to_string(),
            contact_ids: HashMap::new(),
            summary: ImportSummary::default(),
        })
    }

    /// Import a snapshot arriving as a stream of byte chunks. Any read,
    /// decode or insert failure rolls back the whole import.
    pub async fn import_user_data<S, B, E>(
        &self,
        namespace: &str,
        chunks: S,
    ) -> Result<ImportSummary, ImportError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut import = self.begin_import(namespace).await?;
        let mut reader = RecordReader::new();
        let mut chunks = std::pin::pin!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| ImportError::Read(e.to_string()))?;
            for value in reader.push(chunk.as_ref())? {
                import.insert_value(value).await?;
            }
        }
        for value in reader.finish()? {
            import.insert_value(value).await?;
        }

        let summary = import.commit().await?;
        debug!(?summary, "imported user data");
        Ok(summary)
    }

    pub async fn delete_user_data(&self, namespace: &str) -> Result<(), PersistError> {
        let mut tx = self.pool.begin().await?;

        for step in ERASURE_ORDER {
            let result = sqlx::query(step.statement)
                .bind(namespace)
                .execute(&mut *tx)
                .await?;
            debug!(table = step.table, rows = result.rows_affected(), "erased");
        }

        tx.commit().await?;
        Ok(())
    }
}

type ExportSink = mpsc::Sender<Result<ExportedEntity, PersistError>>;

async fn export(pool: &PgPool, namespace: &str, sink: &mut ExportSink) -> Result<(), PersistError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    for kind in EntityKind::ALL {
        let delivered = match kind {
            EntityKind::JournalEntry => {
                forward::<JournalEntry>(
                    &mut *tx,
                    "SELECT * FROM journal_entries WHERE namespace = $1 ORDER BY id",
                    namespace,
                    ExportedEntity::JournalEntry,
                    sink,
                )
                .await?
            }
            EntityKind::Contact => {
                forward::<Contact>(
                    &mut *tx,
                    "SELECT * FROM contacts WHERE namespace = $1 ORDER BY id",
                    namespace,
                    ExportedEntity::Contact,
                    sink,
                )
                .await?
            }
            EntityKind::Debt => {
                forward::<Debt>(
                    &mut *tx,
                    "SELECT d.* FROM debts d JOIN contacts c ON c.id = d.contact_id
                     WHERE c.namespace = $1 ORDER BY d.id",
                    namespace,
                    ExportedEntity::Debt,
                    sink,
                )
                .await?
            }
            EntityKind::Activity => {
                forward::<Activity>(
                    &mut *tx,
                    "SELECT a.* FROM activities a JOIN contacts c ON c.id = a.contact_id
                     WHERE c.namespace = $1 ORDER BY a.id",
                    namespace,
                    ExportedEntity::Activity,
                    sink,
                )
                .await?
            }
        };

        if !delivered {
            debug!("export receiver dropped, stopping");
            break;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Send every row of `statement` to `sink`. Returns `false` once the receiver
/// is gone.
async fn forward<T>(
    conn: &mut PgConnection,
    statement: &'static str,
    namespace: &str,
    wrap: fn(T) -> ExportedEntity,
    sink: &mut ExportSink,
) -> Result<bool, PersistError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut rows = sqlx::query_as::<_, T>(statement)
        .bind(namespace)
        .fetch(&mut *conn);

    while let Some(row) = rows.try_next().await? {
        if sink.send(Ok(wrap(row))).await.is_err() {
            return Ok(false);
        }
    }

    Ok(true)
}
