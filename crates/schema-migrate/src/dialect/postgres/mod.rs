//! The PostgreSQL dialect adapter.

mod introspect;
pub mod sql;
mod types;

use std::collections::HashSet;
use std::io;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::ColumnDetail;
use crate::db::Db;
use crate::dialect::{DialectAdapter, Driver, IntrospectOptions, MigrateArgs};
use crate::error::{MigrateError, Result};
use crate::introspect::{load_info_tables, InfoQueryOptions};
use crate::render::ddl;
use crate::schema::{self, Column, GenericType, Schema};
use crate::util;

pub use sql::{quote_bytes, quote_identifier, quote_string, quote_value, SqlValue};

/// PostgreSQL dialect adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

impl PostgresAdapter {
    /// Create a new PostgreSQL adapter instance.
    pub fn new() -> Self {
        Self
    }

    fn sequence_default(table: &str, column: &str) -> String {
        format!("nextval('{}_{}_seq'::regclass)", table, column)
    }
}

#[async_trait]
impl DialectAdapter for PostgresAdapter {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    /// Normalize auto-increment integer columns: synthesize the sequence
    /// default a `SERIAL` column reports, and pin the plain-int spelling to
    /// `int4` (what `SERIAL` creates) so a migrated column introspects back
    /// equal.
    fn process(&self, schema: &mut Schema) -> Result<()> {
        for table in &mut schema.tables {
            let table_name = table.name.clone();
            for column in &mut table.columns {
                if column.auto_increment != Some(true)
                    || column.column_type != GenericType::Int
                {
                    continue;
                }
                if column.default_for(Driver::Postgres).is_none() {
                    let default = Self::sequence_default(&table_name, &column.name);
                    column.set_default_for(Driver::Postgres, default);
                }
                if column.native_type_for(Driver::Postgres).is_none()
                    && column.max_length.is_none()
                    && column.length.is_none()
                {
                    column.set_native_type_for(Driver::Postgres, "int4");
                }
            }
        }
        Ok(())
    }

    async fn to_schema(&self, db: &Db, opts: &IntrospectOptions) -> Result<Schema> {
        let query_opts = InfoQueryOptions {
            table_filter: opts.table_filter.clone(),
            ..Default::default()
        };
        let mut tables = load_info_tables(db, &query_opts).await?;
        debug!("introspected {} tables", tables.len());

        let descriptions = introspect::table_descriptions(db).await?;
        let column_comments = introspect::column_descriptions(db).await?;
        let identities = introspect::auto_increment_columns(db).await?;

        for (table_name, table) in tables.iter_mut() {
            table.description = descriptions
                .get(table_name)
                .filter(|comment| !comment.is_empty())
                .cloned();

            let mut primary_keys: HashSet<String> = HashSet::new();
            let mut uniques: HashSet<String> = HashSet::new();
            for constraint in &table.constraints {
                match constraint.constraint_type.as_str() {
                    "PRIMARY KEY" => {
                        primary_keys.insert(constraint.column.clone());
                    }
                    "UNIQUE" => {
                        uniques.insert(constraint.column.clone());
                    }
                    _ => {}
                }
            }

            let comments = column_comments.get(table_name);
            let auto_increments = identities.get(table_name);

            for column in &mut table.columns {
                let (generic, is_array) =
                    types::data_type_to_generic(&column.data_type, &column.udt_name).map_err(
                        |err| {
                            MigrateError::introspection(format!(
                                "column {} for table {}: {}",
                                column.name, table_name, err
                            ))
                        },
                    )?;
                column.data_type = generic.as_str().to_string();
                let (udt_name, udt_array) = types::to_udt_name(column);
                column.udt_name = udt_name;
                column.is_array = is_array || udt_array;

                let default = types::format_default(column).map_err(|err| {
                    MigrateError::introspection(format!(
                        "column {} for table {}: {}",
                        column.name, table_name, err
                    ))
                })?;
                column.default = default;

                column.description = comments.and_then(|m| m.get(&column.name)).cloned();
                column.is_primary_key = primary_keys.contains(&column.name);
                column.is_unique = uniques.contains(&column.name);
                column.is_auto_incrementing =
                    auto_increments.is_some_and(|set| set.contains(&column.name));
            }
        }

        schema::schema_from_catalog(Driver::Postgres, &tables)
    }

    fn from_schema(&self, schema: &Schema, out: &mut dyn io::Write) -> Result<()> {
        for statement in ddl::schema_statements(self, schema)? {
            writeln!(out, "{}", statement)?;
        }
        Ok(())
    }

    async fn migrate(&self, args: MigrateArgs<'_>) -> Result<()> {
        if args.drop {
            let name = args.db.database_name()?;
            let admin = args.db.connect_admin().await?;
            info!("re-creating database {}", name);
            admin
                .execute_ddl(&format!("DROP DATABASE IF EXISTS {}", quote_identifier(&name)))
                .await?;
            admin
                .execute_ddl(&format!("CREATE DATABASE {}", quote_identifier(&name)))
                .await?;

            let db = args.db.reconnect().await?;
            let statements = ddl::schema_statements(self, args.desired)?;
            for statement in &statements {
                db.execute_ddl(statement).await?;
            }
            info!("applied {} statements to fresh database", statements.len());
            return Ok(());
        }

        let statements = ddl::statements(self, args.changes)?;
        for statement in &statements {
            args.db.execute_ddl(statement).await?;
        }
        info!("applied {} statements", statements.len());
        Ok(())
    }

    fn quote_table(&self, val: &str) -> String {
        quote_identifier(val)
    }

    fn quote_column(&self, val: &str) -> String {
        quote_identifier(val)
    }

    fn quote_literal(&self, val: &str) -> String {
        quote_string(val)
    }

    fn quote_default_value(&self, val: &str, column: &ColumnDetail) -> String {
        let mut out = val.to_string();
        if column.data_type == "string" && !util::is_function_call(val) && !val.starts_with('\'') {
            out = self.quote_literal(val);
        }
        if column.udt_name == "jsonb" && !out.ends_with("::jsonb") {
            out.push_str("::jsonb");
        }
        out
    }

    fn generate_table_comment(&self, table: &str, text: &str) -> String {
        if text.is_empty() {
            format!("COMMENT ON TABLE {} IS NULL;", self.quote_table(table))
        } else {
            format!(
                "COMMENT ON TABLE {} IS {};",
                self.quote_table(table),
                self.quote_literal(text)
            )
        }
    }

    fn generate_column_comment(&self, table: &str, column: &str, text: &str) -> String {
        if text.is_empty() {
            format!(
                "COMMENT ON COLUMN {}.{} IS NULL;",
                self.quote_table(table),
                self.quote_column(column)
            )
        } else {
            format!(
                "COMMENT ON COLUMN {}.{} IS {};",
                self.quote_table(table),
                self.quote_column(column),
                self.quote_literal(text)
            )
        }
    }

    fn to_native_type(&self, column: &Column) -> Option<String> {
        types::to_native_type(column)
    }

    fn data_type_to_generic(
        &self,
        data_type: &str,
        udt_name: &str,
    ) -> Result<(GenericType, bool)> {
        types::data_type_to_generic(data_type, udt_name)
    }
}
