//! Dialect adapters: the pluggable capability set for one database backend.
//!
//! An adapter bundles everything one dialect needs: post-load normalization,
//! catalog introspection, type mapping, identifier/literal quoting, comment
//! DDL, and change-set application. Adapters are looked up by protocol name
//! in a [`Registry`] built once at program start and read-only afterwards.

pub mod mysql;
pub mod postgres;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::ColumnDetail;
use crate::db::Db;
use crate::diff::TableChange;
use crate::error::{MigrateError, Result};
use crate::schema::{Column, GenericType, Schema};

pub use mysql::MysqlAdapter;
pub use postgres::PostgresAdapter;

/// The supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Postgres,
    Mysql,
    Sqlite,
}

impl Driver {
    /// Lowercase protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::Mysql => "mysql",
            Driver::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for schema introspection.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Restrict introspection to these table names. Empty means all tables.
    pub table_filter: Vec<String>,
}

/// Arguments for applying a change set.
pub struct MigrateArgs<'a> {
    /// Connected database handle; carries the cancellation token.
    pub db: &'a Db,

    /// The schema currently in the database.
    pub existing: &'a Schema,

    /// The declared schema being migrated to.
    pub desired: &'a Schema,

    /// The change set computed by the differ.
    pub changes: &'a [TableChange],

    /// Drop and re-create the database, then emit the schema fresh.
    pub drop: bool,
}

/// The capability set of one database backend.
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// The dialect this adapter serves.
    fn driver(&self) -> Driver;

    /// Dialect-specific normalization applied after loading a document.
    fn process(&self, schema: &mut Schema) -> Result<()>;

    /// Reconstruct a canonical schema from a live database.
    async fn to_schema(&self, db: &Db, opts: &IntrospectOptions) -> Result<Schema>;

    /// Emit full CREATE DDL for every table in the schema.
    fn from_schema(&self, schema: &Schema, out: &mut dyn io::Write) -> Result<()>;

    /// Apply a change set, or re-create the database when `drop` is set.
    async fn migrate(&self, args: MigrateArgs<'_>) -> Result<()>;

    /// Quote a table name for DDL.
    fn quote_table(&self, val: &str) -> String;

    /// Quote a column name for DDL.
    fn quote_column(&self, val: &str) -> String;

    /// Quote a string literal under the dialect's injection-safe policy.
    fn quote_literal(&self, val: &str) -> String;

    /// Quote a default expression for a `DEFAULT` clause.
    fn quote_default_value(&self, val: &str, column: &ColumnDetail) -> String;

    /// DDL setting a table comment. Empty text sets the comment to NULL.
    fn generate_table_comment(&self, table: &str, text: &str) -> String;

    /// DDL setting a column comment. Empty text sets the comment to NULL.
    fn generate_column_comment(&self, table: &str, column: &str, text: &str) -> String;

    /// Derive the native type spelling for a column. An explicit
    /// `native_type` entry for this dialect overrides the derivation.
    fn to_native_type(&self, column: &Column) -> Option<String>;

    /// Map a native data type back to a generic type and array flag.
    fn data_type_to_generic(&self, data_type: &str, udt_name: &str)
        -> Result<(GenericType, bool)>;
}

impl fmt::Debug for dyn DialectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DialectAdapter").field(&self.driver()).finish()
    }
}

/// Protocol-keyed adapter registry, built once at program start.
pub struct Registry {
    adapters: HashMap<&'static str, Arc<dyn DialectAdapter>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry {
            adapters: HashMap::new(),
        }
    }

    /// A registry with the built-in adapters registered.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        registry.register("postgres", Arc::new(PostgresAdapter::new()));
        registry.register("mysql", Arc::new(MysqlAdapter::new()));
        registry
    }

    /// Register an adapter for a protocol name.
    pub fn register(&mut self, protocol: &'static str, adapter: Arc<dyn DialectAdapter>) {
        self.adapters.insert(protocol, adapter);
    }

    /// Look up the adapter for a protocol.
    pub fn get(&self, protocol: &str) -> Result<Arc<dyn DialectAdapter>> {
        self.adapters
            .get(protocol)
            .cloned()
            .ok_or_else(|| MigrateError::UnsupportedProtocol(protocol.to_string()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
