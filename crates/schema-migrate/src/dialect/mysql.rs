//! The MySQL dialect adapter.
//!
//! Registered so `mysql://` URLs resolve through the same seam as
//! PostgreSQL, with the quoting surface in place; introspection and
//! migration return typed unimplemented errors until the backend lands.

use std::io;

use async_trait::async_trait;

use crate::catalog::ColumnDetail;
use crate::db::Db;
use crate::dialect::{DialectAdapter, Driver, IntrospectOptions, MigrateArgs};
use crate::error::{MigrateError, Result};
use crate::schema::{Column, GenericType, Schema};
use crate::util;

/// MySQL dialect adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlAdapter;

impl MysqlAdapter {
    /// Create a new MySQL adapter instance.
    pub fn new() -> Self {
        Self
    }

    fn unimplemented(operation: &'static str) -> MigrateError {
        MigrateError::Unimplemented {
            driver: Driver::Mysql.as_str(),
            operation,
        }
    }
}

#[async_trait]
impl DialectAdapter for MysqlAdapter {
    fn driver(&self) -> Driver {
        Driver::Mysql
    }

    fn process(&self, _schema: &mut Schema) -> Result<()> {
        Ok(())
    }

    async fn to_schema(&self, _db: &Db, _opts: &IntrospectOptions) -> Result<Schema> {
        Err(Self::unimplemented("schema introspection"))
    }

    fn from_schema(&self, _schema: &Schema, _out: &mut dyn io::Write) -> Result<()> {
        Err(Self::unimplemented("DDL generation"))
    }

    async fn migrate(&self, _args: MigrateArgs<'_>) -> Result<()> {
        Err(Self::unimplemented("migration"))
    }

    fn quote_table(&self, val: &str) -> String {
        format!("`{}`", val.replace('`', "``"))
    }

    fn quote_column(&self, val: &str) -> String {
        format!("`{}`", val.replace('`', "``"))
    }

    fn quote_literal(&self, val: &str) -> String {
        format!("'{}'", val.replace('\'', "''"))
    }

    fn quote_default_value(&self, val: &str, column: &ColumnDetail) -> String {
        if column.data_type == "string" && !util::is_function_call(val) && !val.starts_with('\'') {
            self.quote_literal(val)
        } else {
            val.to_string()
        }
    }

    fn generate_table_comment(&self, table: &str, text: &str) -> String {
        format!(
            "ALTER TABLE {} COMMENT = {};",
            self.quote_table(table),
            self.quote_literal(text)
        )
    }

    fn generate_column_comment(&self, table: &str, column: &str, text: &str) -> String {
        // MySQL has no COMMENT ON; column comments ride along MODIFY COLUMN,
        // which needs the full definition. Emitted only by the unimplemented
        // migration path.
        format!(
            "-- column comment {}.{}: {}",
            self.quote_table(table),
            self.quote_column(column),
            self.quote_literal(text)
        )
    }

    fn to_native_type(&self, column: &Column) -> Option<String> {
        column.native_type_for(Driver::Mysql).map(str::to_string)
    }

    fn data_type_to_generic(
        &self,
        _data_type: &str,
        _udt_name: &str,
    ) -> Result<(GenericType, bool)> {
        Err(Self::unimplemented("type mapping"))
    }
}
