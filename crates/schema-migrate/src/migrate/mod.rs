//! Migration orchestration over the adapter registry.
//!
//! The top-level operations — load, introspect, emit, apply — resolve the
//! adapter by protocol and delegate. Protocols come from the database URL
//! scheme.

use std::io;
use std::path::Path;

use url::Url;

use crate::db::Db;
use crate::dialect::{IntrospectOptions, MigrateArgs, Registry};
use crate::error::{MigrateError, Result};
use crate::schema::{self, Schema};

/// Map a database URL to a `(driver, protocol)` pair.
///
/// The driver names the low-level connector, the protocol names the dialect
/// adapter in the registry.
pub fn driver_from_url(urlstr: &str) -> Result<(&'static str, &'static str)> {
    let parsed = Url::parse(urlstr)
        .map_err(|e| MigrateError::input(format!("error parsing database url: {}", e)))?;
    match parsed.scheme() {
        "postgres" | "postgresql" | "pgx" => Ok(("pgx", "postgres")),
        "mysql" => Ok(("mysql", "mysql")),
        "sqlite" => Ok(("sqlite", "sqlite")),
        other => Err(MigrateError::UnsupportedProtocol(other.to_string())),
    }
}

/// Load a schema document and run the dialect's process step on it.
///
/// The adapter is chosen from the document's own database URL.
pub fn load(registry: &Registry, path: impl AsRef<Path>) -> Result<Schema> {
    let mut schema = schema::load(path)?;
    let url = crate::util::expand_env(&schema.database.url)?;
    let (_, protocol) = driver_from_url(&url).map_err(|e| {
        MigrateError::input(format!(
            "error determining protocol from database url: {}",
            e
        ))
    })?;
    let adapter = registry.get(protocol)?;
    adapter.process(&mut schema)?;
    Ok(schema)
}

/// Reconstruct the canonical schema of a live database.
pub async fn to_schema(
    registry: &Registry,
    protocol: &str,
    db: &Db,
    opts: &IntrospectOptions,
) -> Result<Schema> {
    let adapter = registry.get(protocol)?;
    adapter.to_schema(db, opts).await
}

/// Emit full CREATE DDL for a schema.
pub fn from_schema(
    registry: &Registry,
    protocol: &str,
    schema: &Schema,
    out: &mut dyn io::Write,
) -> Result<()> {
    let adapter = registry.get(protocol)?;
    adapter.from_schema(schema, out)
}

/// Apply a change set (or re-create the database when `drop` is set).
pub async fn migrate(registry: &Registry, protocol: &str, args: MigrateArgs<'_>) -> Result<()> {
    let adapter = registry.get(protocol)?;
    adapter.migrate(args).await
}
