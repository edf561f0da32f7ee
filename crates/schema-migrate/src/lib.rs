//! # schema-migrate
//!
//! Declarative database schema migration engine.
//!
//! A desired schema is written as a YAML or JSON document; the engine
//! compares it against a live SQL database and computes the minimal set of
//! structural changes to make the database match, which it can print as
//! review text, emit as DDL, or apply. The pipeline:
//!
//! - **Introspection** reconstructs a canonical schema from the database
//!   catalogs via a dialect adapter
//! - **Diff** computes a deterministic, typed change set between two
//!   canonical schemas
//! - **Emission** renders the change set as colored text or dialect-correct
//!   DDL and applies it
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_migrate::{diff, migrate, Db, IntrospectOptions, Registry};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> schema_migrate::Result<()> {
//!     let registry = Registry::with_builtins();
//!     let desired = migrate::load(&registry, "schema.yaml")?;
//!
//!     let db = Db::connect(&desired.database.url, CancellationToken::new()).await?;
//!     let existing =
//!         migrate::to_schema(&registry, "postgres", &db, &IntrospectOptions::default()).await?;
//!
//!     let adapter = registry.get("postgres")?;
//!     let changes = diff::diff(adapter.as_ref(), &desired, &existing)?;
//!     println!("{} changes", changes.len());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod db;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod introspect;
pub mod migrate;
pub mod render;
pub mod schema;
pub mod util;

// Re-exports for convenient access
pub use catalog::{ColumnDetail, ConstraintDetail, TableDetail};
pub use db::Db;
pub use dialect::{
    DialectAdapter, Driver, IntrospectOptions, MigrateArgs, MysqlAdapter, PostgresAdapter,
    Registry,
};
pub use diff::{AlterKind, ColumnChange, ColumnChangeKind, TableChange, TableChangeKind};
pub use error::{MigrateError, Result};
pub use render::{format_diff, format_sql, DiffFormat};
pub use schema::{Column, GenericType, Schema, Subtype, Table};
