//! # API crate: server logic for Senbara Forms
//!
//! Everything the `senbara-web` binary serves lives here: the OIDC
//! authorization gate, the persistence layer and the HTTP routes that tie them
//! together. The binary only loads [`settings::Settings`], builds a
//! [`routes::AppState`] and hands [`routes::router`] to `axum::serve`.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | OIDC provider client, session cookies and the per-request authorization gate |
//! | [`db`] | PostgreSQL connection pool and embedded migrations |
//! | [`error`] | [`AppError`], the error type every handler returns |
//! | [`models`] | Tenant-owned rows and the user-data snapshot format |
//! | [`persisters`] | All SQL: per-entity CRUD, snapshot export/import and erasure |
//! | [`routes`] | The axum router, gate middleware and handlers |
//! | [`settings`] | Layered process configuration |
//!
//! ## Tenancy
//!
//! The verified e-mail address of the caller is the namespace of every row it
//! creates and the filter of every query it runs. Nothing crosses namespaces.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod persisters;
pub mod routes;
pub mod settings;

pub use error::AppError;
pub use persisters::Persister;
pub use routes::{router, AppState};
pub use settings::Settings;
