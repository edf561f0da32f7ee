//! PostgreSQL type mapping.
//!
//! Maps the generic model to native spellings and back. See
//! <https://www.postgresql.org/docs/current/datatype.html> for the catalog
//! of spellings handled here.

use crate::catalog::ColumnDetail;
use crate::error::{MigrateError, Result};
use crate::schema::{Column, GenericType, Subtype};
use crate::util;

/// Derive the native PostgreSQL spelling for a column.
///
/// An explicit `native_type.postgres` entry overrides the derivation
/// entirely; otherwise the generic type, subtype, and length attributes
/// select the spelling, with `[]` appended for arrays.
pub fn to_native_type(column: &Column) -> Option<String> {
    if let Some(explicit) = column
        .native_type
        .as_ref()
        .and_then(|nt| nt.postgres.as_deref())
    {
        return Some(explicit.to_string());
    }

    let base = match column.column_type {
        GenericType::Boolean => "boolean".to_string(),
        GenericType::Datetime => "timestamp with time zone".to_string(),
        GenericType::Float => {
            if column.max_length == Some(32) {
                "real".to_string()
            } else {
                "double precision".to_string()
            }
        }
        GenericType::Int => match (column.max_length, &column.length) {
            (Some(max_length), _) if max_length > 0 => format!("numeric({})", max_length),
            (_, Some(length)) => match (length.precision, length.scale) {
                (16, None) => "smallint".to_string(),
                (32, None) => "int4".to_string(),
                (64, None) => "int8".to_string(),
                (precision, Some(scale)) => format!("numeric({},{})", precision, scale),
                (precision, None) => format!("numeric({})", precision),
            },
            _ => "int8".to_string(),
        },
        GenericType::String => match column.subtype {
            Some(Subtype::Uuid) => "uuid".to_string(),
            Some(Subtype::Binary) => "bytea".to_string(),
            Some(Subtype::Json) => "jsonb".to_string(),
            Some(Subtype::Bit) => match column.max_length {
                Some(n) if n > 0 => format!("bit({})", n),
                _ => "bit".to_string(),
            },
            _ => match column.max_length {
                Some(n) if n > 0 => format!("varchar({})", n),
                _ => "text".to_string(),
            },
        },
    };

    if column.is_array {
        Some(format!("{}[]", base))
    } else {
        Some(base)
    }
}

/// Map an information-schema `data_type` back to a generic type.
///
/// A `data_type` of `ARRAY` recurses on the element type after stripping the
/// leading underscore from `udt_name`. Unknown spellings are an error.
pub fn data_type_to_generic(data_type: &str, udt_name: &str) -> Result<(GenericType, bool)> {
    if data_type == "ARRAY" {
        let element = udt_name.strip_prefix('_').unwrap_or(udt_name);
        let (generic, _) = data_type_to_generic(element, element)?;
        return Ok((generic, true));
    }

    let generic = match data_type {
        "text" | "uuid" | "json" | "jsonb" | "xml" | "cidr" | "bit" | "bit varying" | "bytea"
        | "character" | "character varying" | "varchar" | "name" | "circle" | "inet"
        | "interval" | "line" | "lseg" | "macaddr" | "macaddr8" | "path" | "pg_snapshot"
        | "point" | "polygon" | "tsquery" | "tsvector" | "txid_snapshot" => GenericType::String,
        "integer" | "bigint" | "bigserial" | "pg_lsn" | "smallint" | "smallserial" | "serial"
        | "int2" | "int4" | "int8" => GenericType::Int,
        "real" | "double precision" | "money" | "numeric" | "decimal" | "float4" | "float8" => {
            GenericType::Float
        }
        "date" | "time" | "timetz" | "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" => GenericType::Datetime,
        "boolean" | "bool" => GenericType::Boolean,
        other => {
            return Err(MigrateError::introspection(format!(
                "unhandled data type: {}",
                other
            )))
        }
    };
    Ok((generic, false))
}

/// Format an introspected `udt_name` into its canonical spelling, resolving
/// precision and scale. Returns the spelling and whether the column is an
/// array (a leading underscore in `udt_name`).
///
/// Expects `data_type` on the detail to already hold the generic type name.
pub fn to_udt_name(column: &ColumnDetail) -> (String, bool) {
    let (raw, is_array) = match column.udt_name.strip_prefix('_') {
        Some(element) => (element, true),
        None => (column.udt_name.as_str(), false),
    };
    // catalog aliases whose canonical spelling differs; without this a
    // migrated column would report a type change on every subsequent diff
    let udt_name = match raw {
        "bool" => "boolean",
        "timestamptz" => "timestamp with time zone",
        other => other,
    };

    let scale = column.numeric_scale.filter(|s| *s != 0);
    let name = if column.max_length.is_some_and(|n| n > 0) {
        format!("{}({})", udt_name, column.max_length.unwrap_or_default())
    } else if let Some(precision) = column.numeric_precision {
        if column.data_type == "int" && matches!(precision, 16 | 32 | 64) && scale.is_none() {
            // int2/int4/int8 carry their width in the name already
            udt_name.to_string()
        } else if column.data_type == "float" && matches!(precision, 24 | 64) && scale.is_none() {
            udt_name.to_string()
        } else if column.data_type == "float"
            && udt_name == "float8"
            && precision == 53
            && scale.is_none()
        {
            "double precision".to_string()
        } else if let Some(scale) = scale {
            format!("{}({},{})", udt_name, precision, scale)
        } else {
            format!("{}({})", udt_name, precision)
        }
    } else {
        udt_name.to_string()
    };

    if is_array {
        (format!("{}[]", name), true)
    } else {
        (name, false)
    }
}

/// Canonicalize an introspected default expression.
///
/// Quoted literals are unquoted (dropping any trailing `::type` cast, which
/// is how `'{}'::jsonb` arrives), function calls pass through verbatim, and
/// bare numeric or boolean literals are validated against the generic type.
///
/// Expects `data_type` on the detail to already hold the generic type name.
pub fn format_default(column: &ColumnDetail) -> Result<Option<String>> {
    let Some(default) = column.default.as_deref() else {
        return Ok(None);
    };

    if util::is_function_call(default) {
        return Ok(Some(default.to_string()));
    }

    if default.starts_with('\'') {
        return Ok(Some(unquote_literal(default).map_err(|err| {
            MigrateError::introspection(format!(
                "invalid default value: {} for column: {}: {}",
                default, column.name, err
            ))
        })?));
    }

    match column.data_type.as_str() {
        "int" => {
            if !util::IS_INTEGER.is_match(default) {
                return Err(MigrateError::introspection(format!(
                    "invalid int default value: {} for column: {}",
                    default, column.name
                )));
            }
        }
        "float" => {
            if !util::IS_FLOAT.is_match(default) {
                return Err(MigrateError::introspection(format!(
                    "invalid float default value: {} for column: {}",
                    default, column.name
                )));
            }
        }
        "boolean" => match default {
            "true" | "false" => {}
            other => {
                return Err(MigrateError::introspection(format!(
                    "invalid boolean default value: {} for column: {}",
                    other, column.name
                )))
            }
        },
        _ => {}
    }

    Ok(Some(default.to_string()))
}

/// Extract the content of a single-quoted literal, tolerating a trailing
/// `::type` cast and doubled inner quotes.
fn unquote_literal(val: &str) -> std::result::Result<String, &'static str> {
    let mut content = String::new();
    let mut chars = val[1..].char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                content.push('\'');
                chars.next();
                continue;
            }
            let rest = &val[1 + idx + 1..];
            if rest.is_empty() || rest.starts_with("::") {
                return Ok(content);
            }
            return Err("unexpected characters after closing quote");
        }
        content.push(ch);
    }
    Err("unterminated quoted literal")
}
