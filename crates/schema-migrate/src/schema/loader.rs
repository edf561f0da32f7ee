//! Schema document loading.

use std::path::Path;

use crate::error::{MigrateError, Result};
use crate::util;

use super::types::Schema;

/// Read a schema from a `.yaml`, `.yml`, or `.json` file.
///
/// Decoding is dispatched on the file extension; any other extension is an
/// input error. After decoding, every table and column name is validated
/// against the identifier pattern.
pub fn load(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let schema: Schema = match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        other => {
            return Err(MigrateError::input(format!(
                "unsupported file extension: .{}. should be either .json or .yaml",
                other
            )))
        }
    };

    validate(&schema)?;
    Ok(schema)
}

/// Check every table and column name against the identifier pattern, and
/// every literal default against its column's type.
pub fn validate(schema: &Schema) -> Result<()> {
    for table in &schema.tables {
        if !util::IDENTIFIER.is_match(&table.name) {
            return Err(MigrateError::input(format!(
                "table `{}` has an invalid name",
                table.name
            )));
        }
        for column in &table.columns {
            if !util::IDENTIFIER.is_match(&column.name) {
                return Err(MigrateError::input(format!(
                    "column `{}` in table `{}` has an invalid name",
                    column.name, table.name
                )));
            }
            if let Some(defaults) = &column.default {
                for default in [&defaults.postgres, &defaults.mysql, &defaults.sqlite]
                    .into_iter()
                    .flatten()
                {
                    super::generate::validate_default(column, default)?;
                }
            }
        }
    }
    Ok(())
}
