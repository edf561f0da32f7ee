//! Conversions between introspected catalog metadata and the canonical model.

use indexmap::IndexMap;

use crate::catalog::{ColumnDetail, TableDetail};
use crate::dialect::Driver;
use crate::error::{MigrateError, Result};
use crate::util;

use super::types::{
    Column, Database, DialectValues, GenericType, Length, Schema, Subtype, Table, DEFAULT_VERSION,
    SCHEMA_URL,
};

/// Build a canonical schema from fully canonicalized catalog metadata.
///
/// Expects each column's `data_type` to hold the generic type name and
/// `udt_name` the canonical native spelling; table order is preserved.
pub fn schema_from_catalog(
    driver: Driver,
    tables: &IndexMap<String, TableDetail>,
) -> Result<Schema> {
    let mut schema = Schema {
        schema_url: Some(SCHEMA_URL.to_string()),
        version: DEFAULT_VERSION.to_string(),
        database: Database {
            url: "${DATABASE_URL}".to_string(),
        },
        tables: Vec::with_capacity(tables.len()),
    };

    for (name, detail) in tables {
        let mut table = Table {
            name: name.clone(),
            description: detail.description.clone(),
            columns: Vec::with_capacity(detail.columns.len()),
        };
        for column in &detail.columns {
            let column_type: GenericType = column.data_type.parse()?;
            let mut col = Column {
                name: column.name.clone(),
                column_type,
                default: column
                    .default
                    .as_ref()
                    .map(|d| DialectValues::for_driver(driver, d.clone())),
                description: column.description.clone(),
                native_type: Some(DialectValues::for_driver(driver, column.udt_name.clone())),
                nullable: Some(column.is_nullable),
                primary_key: Some(column.is_primary_key),
                unique: Some(column.is_unique),
                auto_increment: Some(column.is_auto_incrementing),
                is_array: column.is_array,
                ..Default::default()
            };
            if let Some(max_length) = column.max_length.filter(|v| *v > 0) {
                col.max_length = Some(max_length as u32);
            }
            if let Some(precision) = column.numeric_precision.filter(|v| *v > 0) {
                col.length = Some(Length {
                    precision: precision as u32,
                    scale: column.numeric_scale.filter(|v| *v != 0).map(|v| v as u32),
                });
            }
            table.columns.push(col);
        }
        schema.tables.push(table);
    }

    Ok(schema)
}

/// Validate a literal default value against the column's generic type.
///
/// Function-call defaults are not validated; they pass through to DDL
/// verbatim.
pub fn validate_default(column: &Column, default: &str) -> Result<()> {
    if util::is_function_call(default) {
        return Ok(());
    }
    match column.column_type {
        GenericType::Int => {
            if !util::IS_INTEGER.is_match(default) {
                return Err(MigrateError::input(format!(
                    "invalid {} default value: {} for column: {}. should be: {}",
                    column.column_type,
                    default,
                    column.name,
                    util::IS_INTEGER.as_str()
                )));
            }
        }
        GenericType::Float => {
            if !util::IS_FLOAT.is_match(default) {
                return Err(MigrateError::input(format!(
                    "invalid {} default value: {} for column: {}. should be: {}",
                    column.column_type,
                    default,
                    column.name,
                    util::IS_FLOAT.as_str()
                )));
            }
        }
        GenericType::Boolean => match default {
            "true" | "false" => {}
            other => {
                return Err(MigrateError::input(format!(
                    "invalid boolean default value: {} for column: {}. should be either true or false",
                    other, column.name
                )))
            }
        },
        GenericType::String => {
            if column.subtype == Some(Subtype::Json)
                && serde_json::from_str::<serde_json::Value>(default).is_err()
            {
                return Err(MigrateError::input(format!(
                    "invalid default json value for column: {}",
                    column.name
                )));
            }
        }
        GenericType::Datetime => {}
    }
    Ok(())
}

/// Convert a canonical column into the catalog form the DDL generator
/// renders, resolving the native type for the target dialect and validating
/// the default.
pub fn column_to_detail(
    driver: Driver,
    column: &Column,
    ordinal: i32,
    native_type: Option<String>,
) -> Result<ColumnDetail> {
    let udt_name = native_type.ok_or_else(|| {
        MigrateError::Emission(format!(
            "error generating native type for column {}",
            column.name
        ))
    })?;

    let default = column.default_for(driver).map(str::to_string);
    if let Some(ref default) = default {
        validate_default(column, default)?;
    }

    let mut detail = ColumnDetail {
        name: column.name.clone(),
        ordinal,
        data_type: column.column_type.to_string(),
        udt_name,
        default,
        description: column.description.clone(),
        is_nullable: column.nullable.unwrap_or(false),
        is_primary_key: column.primary_key.unwrap_or(false),
        is_unique: column.unique.unwrap_or(false),
        is_auto_incrementing: column.auto_increment.unwrap_or(false),
        is_array: column.is_array,
        ..Default::default()
    };
    if let Some(max_length) = column.max_length.filter(|v| *v > 0) {
        detail.max_length = Some(max_length as i32);
    }
    if let Some(length) = &column.length {
        detail.numeric_precision = Some(length.precision as i32);
        detail.numeric_scale = length.scale.filter(|s| *s != 0).map(|s| s as i32);
    }
    Ok(detail)
}
