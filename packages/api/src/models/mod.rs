//! Tenant-owned rows and the user-data snapshot format.
//!
//! Every row type derives [`sqlx::FromRow`] so it can be loaded straight from
//! queries, and `Serialize` so handlers can return it as JSON. Field names are
//! camelCase on the wire, matching the snapshot format.

mod activities;
mod contacts;
mod debts;
mod journal;
mod todos;
mod userdata;

pub use activities::{Activity, ActivityFields};
pub use contacts::{Contact, ContactFields};
pub use debts::{Debt, DebtFields};
pub use journal::{JournalEntry, JournalEntryFields};
pub use todos::{Todo, TodoFields};
pub use userdata::{Decoded, EntityIdentifier, EntityKind, ExportedEntity, RecordReader};
