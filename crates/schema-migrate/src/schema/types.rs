//! The canonical, dialect-independent schema model.
//!
//! A [`Schema`] is a plain value: equality is structural, and nothing here
//! talks to a database. Tri-state flags (`nullable`, `unique`, ...) are
//! `Option<bool>` because "absent" carries meaning in the diff: a side with
//! no opinion does not force a change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::Driver;
use crate::error::MigrateError;

/// Current schema document format version.
pub const DEFAULT_VERSION: &str = "1";

/// URL of the published JSON Schema for editor integration.
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/schema-migrate/schema-migrate/main/schema.json";

/// A complete declarative schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// JSON Schema URL, set on generated output only.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    /// Document format version.
    pub version: String,

    /// Database connection configuration.
    pub database: Database,

    /// The tables under management, in declaration order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Connection URL; may reference environment variables as `${VAR}`.
    pub url: String,
}

/// One managed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

/// One column declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Generic type.
    #[serde(rename = "type")]
    pub column_type: GenericType,

    /// Narrowing of the `string` generic type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<Subtype>,

    /// Dialect-specific type spelling; overrides the derived native type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_type: Option<DialectValues>,

    /// Dialect-specific default expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DialectValues>,

    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Maximum length for string/bit types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    /// Precision and scale for numeric types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Length>,

    /// Whether NULL is allowed. Absent means no opinion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Whether the column is part of the primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,

    /// Whether the column carries a unique constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,

    /// Whether the column auto-increments. Integer columns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,

    /// Whether the column should be indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,

    /// Whether the column is an array of the underlying type.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_array: bool,
}

impl Column {
    /// The declared native type for a dialect, if any.
    pub fn native_type_for(&self, driver: Driver) -> Option<&str> {
        self.native_type.as_ref().and_then(|nt| nt.get(driver))
    }

    /// The declared default for a dialect, if any.
    pub fn default_for(&self, driver: Driver) -> Option<&str> {
        self.default.as_ref().and_then(|d| d.get(driver))
    }

    /// Set the native type for a dialect, creating the map if needed.
    pub fn set_native_type_for(&mut self, driver: Driver, val: impl Into<String>) {
        self.native_type
            .get_or_insert_with(DialectValues::default)
            .set(driver, val.into());
    }

    /// Set the default for a dialect, creating the map if needed.
    pub fn set_default_for(&mut self, driver: Driver, val: impl Into<String>) {
        self.default
            .get_or_insert_with(DialectValues::default)
            .set(driver, val.into());
    }
}

/// A per-dialect string value (native type spelling or default expression).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialectValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<String>,
}

impl DialectValues {
    /// Construct a map holding a single dialect's value.
    pub fn for_driver(driver: Driver, val: impl Into<String>) -> Self {
        let mut values = DialectValues::default();
        values.set(driver, val.into());
        values
    }

    /// The value for a dialect.
    pub fn get(&self, driver: Driver) -> Option<&str> {
        match driver {
            Driver::Postgres => self.postgres.as_deref(),
            Driver::Mysql => self.mysql.as_deref(),
            Driver::Sqlite => self.sqlite.as_deref(),
        }
    }

    /// Set the value for a dialect.
    pub fn set(&mut self, driver: Driver, val: String) {
        match driver {
            Driver::Postgres => self.postgres = Some(val),
            Driver::Mysql => self.mysql = Some(val),
            Driver::Sqlite => self.sqlite = Some(val),
        }
    }

}

/// Precision and scale for numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Length {
    pub precision: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

/// The five generic column types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericType {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    Datetime,
}

impl GenericType {
    /// Lowercase name as used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenericType::String => "string",
            GenericType::Int => "int",
            GenericType::Float => "float",
            GenericType::Boolean => "boolean",
            GenericType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for GenericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenericType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(GenericType::String),
            "int" => Ok(GenericType::Int),
            "float" => Ok(GenericType::Float),
            "boolean" => Ok(GenericType::Boolean),
            "datetime" => Ok(GenericType::Datetime),
            other => Err(MigrateError::input(format!(
                "unknown generic type: {}",
                other
            ))),
        }
    }
}

/// Narrowings of the `string` generic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    Uuid,
    Json,
    Binary,
    Bit,
    Array,
}
