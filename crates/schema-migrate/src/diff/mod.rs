//! Schema diffing.
//!
//! Computes the ordered change set that turns the existing (introspected)
//! schema into the desired (declared) one. Iteration runs in insertion
//! order on both sides — declaration order for the desired schema, query
//! order for the existing one — so the output is stable across runs.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::dialect::DialectAdapter;
use crate::error::Result;
use crate::schema::{Column, Schema, Table};

/// Table-level change classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChangeKind {
    Create,
    Alter,
    Drop,
}

impl fmt::Display for TableChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableChangeKind::Create => "create table",
            TableChangeKind::Alter => "alter table",
            TableChangeKind::Drop => "drop table",
        })
    }
}

/// Column-level change classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChangeKind {
    Create,
    Alter,
    Drop,
}

impl fmt::Display for ColumnChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnChangeKind::Create => "create column",
            ColumnChangeKind::Alter => "alter column",
            ColumnChangeKind::Drop => "drop column",
        })
    }
}

/// What changed on an altered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterKind {
    TypeChanged,
    DefaultChanged,
    DescriptionChanged,
    NullableChanged,
}

impl fmt::Display for AlterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlterKind::TypeChanged => "type changed",
            AlterKind::DefaultChanged => "default changed",
            AlterKind::DescriptionChanged => "description changed",
            AlterKind::NullableChanged => "nullable changed",
        })
    }
}

/// A table description change.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// One column-level change.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChange {
    pub kind: ColumnChangeKind,

    /// Column name.
    pub name: String,

    /// The column being created or altered to; the dropped column for drops.
    pub column: Column,

    /// The pre-change column, present for alters.
    pub previous: Option<Column>,

    /// The alter kinds, in detection order. Empty unless `kind` is `Alter`.
    pub changes: Vec<AlterKind>,
}

/// One table-level change with its column changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChange {
    pub kind: TableChangeKind,

    /// Table name.
    pub table: String,

    /// Snapshot of the relevant table: the desired table for creates, the
    /// existing table for drops and alters.
    pub table_ref: Table,

    /// Column changes in detection order. Empty unless `kind` is `Alter`.
    pub columns: Vec<ColumnChange>,

    /// Table description change, if any.
    pub description: Option<DescriptionChange>,
}

fn option_str_changed(a: Option<&str>, b: Option<&str>) -> bool {
    a != b
}

/// Diff one column present on both sides. Returns the set of alter kinds,
/// or a forbidden-change error for structural attributes that cannot be
/// altered in place.
fn diff_column(
    adapter: &dyn DialectAdapter,
    table: &str,
    from: &Column,
    to: &Column,
) -> Result<Vec<AlterKind>> {
    let mut changes = Vec::new();

    if adapter.to_native_type(from) != adapter.to_native_type(to) {
        changes.push(AlterKind::TypeChanged);
    }
    let driver = adapter.driver();
    if option_str_changed(from.default_for(driver), to.default_for(driver)) {
        changes.push(AlterKind::DefaultChanged);
    }
    if option_str_changed(from.description.as_deref(), to.description.as_deref()) {
        changes.push(AlterKind::DescriptionChanged);
    }
    if let (Some(from_nullable), Some(to_nullable)) = (from.nullable, to.nullable) {
        if from_nullable != to_nullable {
            changes.push(AlterKind::NullableChanged);
        }
    }

    if let (Some(from_pk), Some(to_pk)) = (from.primary_key, to.primary_key) {
        if from_pk != to_pk {
            return Err(crate::error::MigrateError::forbidden(
                table,
                to.name.as_str(),
                "PRIMARY KEY",
            ));
        }
    }
    if let (Some(from_unique), Some(to_unique)) = (from.unique, to.unique) {
        if from_unique != to_unique {
            return Err(crate::error::MigrateError::forbidden(
                table,
                to.name.as_str(),
                "UNIQUE constraint",
            ));
        }
    }
    if let (Some(from_ai), Some(to_ai)) = (from.auto_increment, to.auto_increment) {
        if from_ai != to_ai {
            return Err(crate::error::MigrateError::forbidden(
                table,
                to.name.as_str(),
                "AUTO INCREMENT",
            ));
        }
    }

    Ok(changes)
}

/// Compute the ordered change set turning `existing` into `desired`.
pub fn diff(
    adapter: &dyn DialectAdapter,
    desired: &Schema,
    existing: &Schema,
) -> Result<Vec<TableChange>> {
    let mut result = Vec::new();

    let existing_tables: IndexMap<&str, &Table> = existing
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();
    let desired_tables: IndexMap<&str, &Table> = desired
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();

    for (&table_name, &existing_table) in &existing_tables {
        let Some(&desired_table) = desired_tables.get(table_name) else {
            debug!("table {} no longer referenced, dropping", table_name);
            result.push(TableChange {
                kind: TableChangeKind::Drop,
                table: table_name.to_string(),
                table_ref: existing_table.clone(),
                columns: Vec::new(),
                description: None,
            });
            continue;
        };

        debug!("table {} exists on both sides, comparing", table_name);
        let description = if option_str_changed(
            existing_table.description.as_deref(),
            desired_table.description.as_deref(),
        ) {
            Some(DescriptionChange {
                from: existing_table.description.clone(),
                to: desired_table.description.clone(),
            })
        } else {
            None
        };

        let mut columns = Vec::new();
        for desired_column in &desired_table.columns {
            match existing_table
                .columns
                .iter()
                .find(|c| c.name == desired_column.name)
            {
                None => {
                    debug!(
                        "column {} missing from {}, creating",
                        desired_column.name, table_name
                    );
                    columns.push(ColumnChange {
                        kind: ColumnChangeKind::Create,
                        name: desired_column.name.clone(),
                        column: desired_column.clone(),
                        previous: None,
                        changes: Vec::new(),
                    });
                }
                Some(existing_column) => {
                    let changes =
                        diff_column(adapter, table_name, existing_column, desired_column)?;
                    if !changes.is_empty() {
                        debug!("column {} updated for {}", desired_column.name, table_name);
                        columns.push(ColumnChange {
                            kind: ColumnChangeKind::Alter,
                            name: desired_column.name.clone(),
                            column: desired_column.clone(),
                            previous: Some(existing_column.clone()),
                            changes,
                        });
                    }
                }
            }
        }
        for existing_column in &existing_table.columns {
            if desired_table
                .columns
                .iter()
                .all(|c| c.name != existing_column.name)
            {
                debug!(
                    "column {} no longer needed for {}, dropping",
                    existing_column.name, table_name
                );
                columns.push(ColumnChange {
                    kind: ColumnChangeKind::Drop,
                    name: existing_column.name.clone(),
                    column: existing_column.clone(),
                    previous: None,
                    changes: Vec::new(),
                });
            }
        }

        if !columns.is_empty() || description.is_some() {
            result.push(TableChange {
                kind: TableChangeKind::Alter,
                table: table_name.to_string(),
                table_ref: existing_table.clone(),
                columns,
                description,
            });
        }
    }

    for (&table_name, &desired_table) in &desired_tables {
        if !existing_tables.contains_key(table_name) {
            debug!("table {} missing, creating", table_name);
            result.push(TableChange {
                kind: TableChangeKind::Create,
                table: table_name.to_string(),
                table_ref: desired_table.clone(),
                columns: Vec::new(),
                description: None,
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Driver, PostgresAdapter};
    use crate::schema::{Database, DialectValues, GenericType};

    fn schema(tables: Vec<Table>) -> Schema {
        Schema {
            schema_url: None,
            version: "1".to_string(),
            database: Database {
                url: "postgres://localhost/app".to_string(),
            },
            tables,
        }
    }

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table {
            name: name.to_string(),
            description: None,
            columns,
        }
    }

    fn column(name: &str, column_type: GenericType) -> Column {
        Column {
            name: name.to_string(),
            column_type,
            ..Default::default()
        }
    }

    fn adapter() -> PostgresAdapter {
        PostgresAdapter::new()
    }

    #[test]
    fn test_diff_identical_schemas_is_empty() {
        let s = schema(vec![table(
            "users",
            vec![column("id", GenericType::Int), column("email", GenericType::String)],
        )]);
        let changes = diff(&adapter(), &s, &s).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_diff_create_table() {
        let desired = schema(vec![table("users", vec![column("id", GenericType::Int)])]);
        let existing = schema(vec![]);
        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TableChangeKind::Create);
        assert_eq!(changes[0].table, "users");
        assert_eq!(changes[0].table_ref.columns.len(), 1);
    }

    #[test]
    fn test_diff_drop_table() {
        let desired = schema(vec![]);
        let existing = schema(vec![table("old", vec![column("id", GenericType::Int)])]);
        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TableChangeKind::Drop);
        assert_eq!(changes[0].table, "old");
    }

    #[test]
    fn test_diff_create_and_drop_column() {
        let desired = schema(vec![table(
            "t",
            vec![column("a", GenericType::String), column("c", GenericType::String)],
        )]);
        let existing = schema(vec![table(
            "t",
            vec![column("a", GenericType::String), column("b", GenericType::String)],
        )]);
        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TableChangeKind::Alter);
        assert_eq!(changes[0].columns.len(), 2);
        assert_eq!(changes[0].columns[0].kind, ColumnChangeKind::Create);
        assert_eq!(changes[0].columns[0].name, "c");
        assert_eq!(changes[0].columns[1].kind, ColumnChangeKind::Drop);
        assert_eq!(changes[0].columns[1].name, "b");
    }

    #[test]
    fn test_diff_type_change() {
        let mut desired_col = column("a", GenericType::String);
        desired_col.max_length = Some(255);
        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![column("a", GenericType::String)])]);

        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].columns[0].kind, ColumnChangeKind::Alter);
        assert_eq!(changes[0].columns[0].changes, vec![AlterKind::TypeChanged]);
    }

    #[test]
    fn test_diff_default_and_nullable_change() {
        let mut desired_col = column("a", GenericType::Int);
        desired_col.default = Some(DialectValues::for_driver(Driver::Postgres, "2"));
        desired_col.nullable = Some(true);
        let mut existing_col = column("a", GenericType::Int);
        existing_col.default = Some(DialectValues::for_driver(Driver::Postgres, "1"));
        existing_col.nullable = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(
            changes[0].columns[0].changes,
            vec![AlterKind::DefaultChanged, AlterKind::NullableChanged]
        );
    }

    #[test]
    fn test_diff_nullable_requires_both_sides() {
        // one side has no opinion on nullability, so no change fires
        let mut desired_col = column("a", GenericType::Int);
        desired_col.nullable = Some(true);
        let existing_col = column("a", GenericType::Int);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_diff_description_change_nullable_aware() {
        let mut desired_col = column("a", GenericType::String);
        desired_col.description = Some("primary id".to_string());
        let existing_col = column("a", GenericType::String);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(
            changes[0].columns[0].changes,
            vec![AlterKind::DescriptionChanged]
        );
    }

    #[test]
    fn test_diff_table_description_only() {
        let mut desired_table = table("t", vec![column("a", GenericType::String)]);
        desired_table.description = Some("audit log".to_string());
        let desired = schema(vec![desired_table]);
        let existing = schema(vec![table("t", vec![column("a", GenericType::String)])]);

        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TableChangeKind::Alter);
        assert!(changes[0].columns.is_empty());
        let description = changes[0].description.as_ref().unwrap();
        assert_eq!(description.from, None);
        assert_eq!(description.to, Some("audit log".to_string()));
    }

    #[test]
    fn test_diff_forbidden_primary_key_change() {
        let mut desired_col = column("id", GenericType::Int);
        desired_col.primary_key = Some(true);
        let mut existing_col = column("id", GenericType::Int);
        existing_col.primary_key = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let err = diff(&adapter(), &desired, &existing).unwrap_err();
        assert!(err
            .to_string()
            .contains("you cannot change the PRIMARY KEY of a column"));
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_diff_forbidden_unique_change() {
        let mut desired_col = column("email", GenericType::String);
        desired_col.unique = Some(true);
        let mut existing_col = column("email", GenericType::String);
        existing_col.unique = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let err = diff(&adapter(), &desired, &existing).unwrap_err();
        assert!(err
            .to_string()
            .contains("you cannot change the UNIQUE constraint of a column"));
    }

    #[test]
    fn test_diff_unique_requires_both_sides() {
        // a document with no opinion on uniqueness does not trip the
        // forbidden-change check against an introspected schema
        let desired_col = column("email", GenericType::String);
        let mut existing_col = column("email", GenericType::String);
        existing_col.unique = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        assert!(diff(&adapter(), &desired, &existing).unwrap().is_empty());
    }

    #[test]
    fn test_diff_forbidden_auto_increment_change() {
        let mut desired_col = column("id", GenericType::Int);
        desired_col.auto_increment = Some(true);
        let mut existing_col = column("id", GenericType::Int);
        existing_col.auto_increment = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let err = diff(&adapter(), &desired, &existing).unwrap_err();
        assert!(err
            .to_string()
            .contains("you cannot change the AUTO INCREMENT of a column"));
    }

    #[test]
    fn test_diff_is_deterministic() {
        let desired = schema(vec![
            table("b", vec![column("id", GenericType::Int)]),
            table("a", vec![column("id", GenericType::Int)]),
            table("c", vec![column("id", GenericType::Int)]),
        ]);
        let existing = schema(vec![
            table("c", vec![column("id", GenericType::Int), column("x", GenericType::String)]),
            table("d", vec![column("id", GenericType::Int)]),
        ]);

        let first = diff(&adapter(), &desired, &existing).unwrap();
        for _ in 0..10 {
            let again = diff(&adapter(), &desired, &existing).unwrap();
            assert_eq!(first, again);
        }
        // existing side first in insertion order, then desired creations
        let kinds: Vec<_> = first.iter().map(|c| (c.kind, c.table.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TableChangeKind::Alter, "c"),
                (TableChangeKind::Drop, "d"),
                (TableChangeKind::Create, "b"),
                (TableChangeKind::Create, "a"),
            ]
        );
    }

    #[test]
    fn test_diff_explicit_native_type_overrides_derived() {
        let mut desired_col = column("a", GenericType::Int);
        desired_col.native_type = Some(DialectValues::for_driver(Driver::Postgres, "int8"));
        let existing_col = column("a", GenericType::Int);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        // derived type for a plain int is int8, so the explicit int8 matches
        let changes = diff(&adapter(), &desired, &existing).unwrap();
        assert!(changes.is_empty());
    }
}
