//! DDL generation from change sets.
//!
//! Statements are produced individually so the migrator can execute them in
//! order and report the offending statement on failure; `format_sql` streams
//! the same statements to a writer.

use std::io;

use crate::catalog::{ColumnDetail, TableDetail};
use crate::dialect::DialectAdapter;
use crate::diff::{AlterKind, ColumnChangeKind, TableChange, TableChangeKind};
use crate::error::{MigrateError, Result};
use crate::schema::{column_to_detail, Schema, Table};

/// Render a change set as SQL to a writer.
pub fn format_sql(
    adapter: &dyn DialectAdapter,
    changes: &[TableChange],
    out: &mut dyn io::Write,
) -> Result<()> {
    for statement in statements(adapter, changes)? {
        writeln!(out, "{}", statement)?;
    }
    Ok(())
}

/// Render a change set as an ordered list of DDL statements.
pub fn statements(adapter: &dyn DialectAdapter, changes: &[TableChange]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for change in changes {
        match change.kind {
            TableChangeKind::Create => {
                let detail = table_to_detail(adapter, &change.table_ref)?;
                out.extend(create_table_statements(adapter, &change.table, &detail));
            }
            TableChangeKind::Drop => {
                out.push(format!(
                    "DROP TABLE IF EXISTS {} CASCADE;",
                    adapter.quote_table(&change.table)
                ));
            }
            TableChangeKind::Alter => {
                alter_table_statements(adapter, change, &mut out)?;
            }
        }
    }
    Ok(out)
}

/// Render full CREATE DDL for every table in a schema.
pub fn schema_statements(adapter: &dyn DialectAdapter, schema: &Schema) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for table in &schema.tables {
        let detail = table_to_detail(adapter, table)?;
        out.extend(create_table_statements(adapter, &table.name, &detail));
    }
    Ok(out)
}

fn table_to_detail(adapter: &dyn DialectAdapter, table: &Table) -> Result<TableDetail> {
    let mut detail = TableDetail {
        description: table.description.clone(),
        ..Default::default()
    };
    for (index, column) in table.columns.iter().enumerate() {
        let native_type = adapter.to_native_type(column);
        let column_detail =
            column_to_detail(adapter.driver(), column, index as i32 + 1, native_type).map_err(
                |err| {
                    MigrateError::Emission(format!(
                        "error converting column {} for table {}: {}",
                        column.name, table.name, err
                    ))
                },
            )?;
        detail.columns.push(column_detail);
    }
    Ok(detail)
}

/// Columns with a unique constraint; a single entry renders inline, more
/// than one becomes a table-level UNIQUE.
fn table_uniques(table: &TableDetail) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| c.is_unique)
        .map(|c| c.name.clone())
        .collect()
}

/// Render one column definition.
///
/// Auto-incrementing columns render `SERIAL` in place of the declared type;
/// their synthesized sequence default is implied by `SERIAL` and neither
/// prints nor suppresses `NOT NULL`.
pub fn column_statement(
    adapter: &dyn DialectAdapter,
    column: &ColumnDetail,
    uniques: &[String],
) -> String {
    let mut sql = adapter.quote_column(&column.name);
    sql.push(' ');
    if column.is_auto_incrementing {
        sql.push_str("SERIAL");
    } else {
        sql.push_str(&column.udt_name);
    }

    let effective_default = column
        .default
        .as_deref()
        .filter(|_| !column.is_auto_incrementing);

    let mut attrs: Vec<String> = Vec::new();
    if !column.is_nullable && effective_default.is_none() {
        attrs.push("NOT NULL".to_string());
    }
    if let Some(default) = effective_default {
        attrs.push(format!(
            "DEFAULT {}",
            adapter.quote_default_value(default, column)
        ));
    }
    if column.is_unique && uniques.len() <= 1 {
        attrs.push("UNIQUE".to_string());
    }
    if column.is_primary_key {
        attrs.push("PRIMARY KEY".to_string());
    }

    if !attrs.is_empty() {
        sql.push(' ');
        sql.push_str(&attrs.join(" "));
    }
    sql
}

/// Render a CREATE TABLE plus its comment statements.
fn create_table_statements(
    adapter: &dyn DialectAdapter,
    name: &str,
    table: &TableDetail,
) -> Vec<String> {
    let uniques = table_uniques(table);
    let mut sql = String::new();
    sql.push_str("CREATE TABLE IF NOT EXISTS ");
    sql.push_str(&adapter.quote_table(name));
    sql.push_str(" (\n");
    for (index, column) in table.columns.iter().enumerate() {
        sql.push_str("   ");
        sql.push_str(&column_statement(adapter, column, &uniques));
        if index + 1 < table.columns.len() || uniques.len() > 1 {
            sql.push_str(",\n");
        } else {
            sql.push('\n');
        }
    }
    if uniques.len() > 1 {
        let quoted: Vec<String> = uniques.iter().map(|c| adapter.quote_column(c)).collect();
        sql.push_str(&format!("   UNIQUE ({})\n", quoted.join(",")));
    }
    sql.push_str(");");

    let mut statements = vec![sql];
    if let Some(description) = &table.description {
        statements.push(adapter.generate_table_comment(name, description));
    }
    for column in &table.columns {
        if let Some(description) = &column.description {
            statements.push(adapter.generate_column_comment(name, &column.name, description));
        }
    }
    statements
}

fn alter_table_statements(
    adapter: &dyn DialectAdapter,
    change: &TableChange,
    out: &mut Vec<String>,
) -> Result<()> {
    let quoted_table = adapter.quote_table(&change.table);
    let driver = adapter.driver();

    if let Some(description) = &change.description {
        let text = description.to.as_deref().unwrap_or("");
        out.push(adapter.generate_table_comment(&change.table, text));
    }

    for column_change in &change.columns {
        match column_change.kind {
            ColumnChangeKind::Create => {
                let native_type = adapter.to_native_type(&column_change.column);
                let detail = column_to_detail(driver, &column_change.column, 0, native_type)
                    .map_err(|err| {
                        MigrateError::Emission(format!(
                            "error converting column {} for table {}: {}",
                            column_change.name, change.table, err
                        ))
                    })?;
                out.push(format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    quoted_table,
                    column_statement(adapter, &detail, &[])
                ));
            }
            ColumnChangeKind::Drop => {
                out.push(format!(
                    "ALTER TABLE {} DROP COLUMN {} CASCADE;",
                    quoted_table,
                    adapter.quote_column(&column_change.name)
                ));
            }
            ColumnChangeKind::Alter => {
                let quoted_column = adapter.quote_column(&column_change.name);
                let mut clauses: Vec<String> = Vec::new();
                for kind in &column_change.changes {
                    match kind {
                        AlterKind::DescriptionChanged => {
                            let text = column_change.column.description.as_deref().unwrap_or("");
                            out.push(adapter.generate_column_comment(
                                &change.table,
                                &column_change.name,
                                text,
                            ));
                        }
                        AlterKind::TypeChanged => {
                            let native_type = adapter
                                .to_native_type(&column_change.column)
                                .ok_or_else(|| {
                                    MigrateError::Emission(format!(
                                        "error generating native type for column {}",
                                        column_change.name
                                    ))
                                })?;
                            clauses.push(format!(
                                "ALTER COLUMN {} TYPE {}",
                                quoted_column, native_type
                            ));
                        }
                        AlterKind::DefaultChanged => {
                            match column_change.column.default_for(driver) {
                                None | Some("") => {
                                    clauses
                                        .push(format!("ALTER COLUMN {} DROP DEFAULT", quoted_column));
                                }
                                Some(default) => {
                                    let native_type =
                                        adapter.to_native_type(&column_change.column);
                                    let detail = column_to_detail(
                                        driver,
                                        &column_change.column,
                                        0,
                                        native_type,
                                    )
                                    .map_err(|err| {
                                        MigrateError::Emission(format!(
                                            "error converting column {} for table {}: {}",
                                            column_change.name, change.table, err
                                        ))
                                    })?;
                                    clauses.push(format!(
                                        "ALTER COLUMN {} SET DEFAULT {}",
                                        quoted_column,
                                        adapter.quote_default_value(default, &detail)
                                    ));
                                }
                            }
                        }
                        AlterKind::NullableChanged => {
                            if column_change.column.nullable == Some(true) {
                                clauses
                                    .push(format!("ALTER COLUMN {} DROP NOT NULL", quoted_column));
                            } else {
                                clauses
                                    .push(format!("ALTER COLUMN {} SET NOT NULL", quoted_column));
                            }
                        }
                    }
                }
                if !clauses.is_empty() {
                    out.push(format!("ALTER TABLE {} {};", quoted_table, clauses.join(", ")));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Driver, PostgresAdapter};
    use crate::diff::{diff, ColumnChange, DescriptionChange};
    use crate::schema::{Column, Database, DialectValues, GenericType};
    use crate::util::clean_sql;

    fn adapter() -> PostgresAdapter {
        PostgresAdapter::new()
    }

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

    fn detail(name: &str, data_type: &str, udt_name: &str) -> ColumnDetail {
        ColumnDetail {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_name: udt_name.to_string(),
            ..Default::default()
        }
    }

    fn create_statement(columns: Vec<ColumnDetail>) -> String {
        let table = TableDetail {
            columns,
            ..Default::default()
        };
        clean_sql(&create_table_statements(&adapter(), "test", &table).join("\n"))
    }

    #[test]
    fn test_create_statement_basic() {
        let sql = create_statement(vec![
            detail("a", "string", "varchar(255)"),
            detail("b", "string", "varchar(255)"),
        ]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) NOT NULL, b varchar(255) NOT NULL );"
        );
    }

    #[test]
    fn test_create_statement_with_primary_key() {
        let mut a = detail("a", "string", "varchar(255)");
        a.is_primary_key = true;
        let sql = create_statement(vec![a, detail("b", "string", "varchar(255)")]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) NOT NULL PRIMARY KEY, b varchar(255) NOT NULL );"
        );
    }

    #[test]
    fn test_create_statement_with_default() {
        let mut a = detail("a", "string", "varchar(255)");
        a.default = Some("hi".to_string());
        let sql = create_statement(vec![a, detail("b", "string", "varchar(255)")]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) DEFAULT 'hi', b varchar(255) NOT NULL );"
        );
    }

    #[test]
    fn test_create_statement_with_integer_default() {
        let mut a = detail("a", "int", "smallint");
        a.default = Some("123".to_string());
        let sql = create_statement(vec![a, detail("b", "string", "varchar(255)")]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a smallint DEFAULT 123, b varchar(255) NOT NULL );"
        );
    }

    #[test]
    fn test_create_statement_with_nullable() {
        let mut a = detail("a", "string", "varchar(255)");
        a.is_primary_key = true;
        let mut b = detail("b", "string", "varchar(255)");
        b.is_nullable = true;
        let sql = create_statement(vec![a, b]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) NOT NULL PRIMARY KEY, b varchar(255) );"
        );
    }

    #[test]
    fn test_create_statement_with_single_unique() {
        let mut a = detail("a", "string", "varchar(255)");
        a.is_primary_key = true;
        let mut b = detail("b", "string", "varchar(255)");
        b.is_unique = true;
        let sql = create_statement(vec![a, b]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) NOT NULL PRIMARY KEY, b varchar(255) NOT NULL UNIQUE );"
        );
    }

    #[test]
    fn test_create_statement_with_multiple_uniques() {
        let mut a = detail("a", "string", "varchar(255)");
        a.is_unique = true;
        let mut b = detail("b", "string", "varchar(255)");
        b.is_unique = true;
        let sql = create_statement(vec![a, b]);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS test ( a varchar(255) NOT NULL, b varchar(255) NOT NULL, UNIQUE (a,b) );"
        );
    }

    #[test]
    fn test_create_table_from_empty_database() {
        let adapter = adapter();
        let mut desired = schema(vec![table(
            "users",
            vec![
                Column {
                    name: "id".to_string(),
                    column_type: GenericType::Int,
                    primary_key: Some(true),
                    auto_increment: Some(true),
                    ..Default::default()
                },
                Column {
                    name: "email".to_string(),
                    column_type: GenericType::String,
                    max_length: Some(255),
                    unique: Some(true),
                    ..Default::default()
                },
            ],
        )]);
        use crate::dialect::DialectAdapter as _;
        adapter.process(&mut desired).unwrap();

        let existing = schema(vec![]);
        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(
            clean_sql(&rendered[0]),
            "CREATE TABLE IF NOT EXISTS users ( id SERIAL NOT NULL PRIMARY KEY, email varchar(255) NOT NULL UNIQUE );"
        );
    }

    #[test]
    fn test_drop_removed_column() {
        let adapter = adapter();
        let desired = schema(vec![table(
            "t",
            vec![Column {
                name: "a".to_string(),
                column_type: GenericType::String,
                ..Default::default()
            }],
        )]);
        let existing = schema(vec![table(
            "t",
            vec![
                Column {
                    name: "a".to_string(),
                    column_type: GenericType::String,
                    ..Default::default()
                },
                Column {
                    name: "b".to_string(),
                    column_type: GenericType::String,
                    ..Default::default()
                },
            ],
        )]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["ALTER TABLE t DROP COLUMN b CASCADE;"]);
    }

    #[test]
    fn test_description_only_change_emits_comment_without_alter() {
        let adapter = adapter();
        let mut desired_col = Column {
            name: "a".to_string(),
            column_type: GenericType::String,
            ..Default::default()
        };
        desired_col.description = Some("primary id".to_string());
        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table(
            "t",
            vec![Column {
                name: "a".to_string(),
                column_type: GenericType::String,
                ..Default::default()
            }],
        )]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["COMMENT ON COLUMN t.a IS 'primary id';"]);
    }

    #[test]
    fn test_default_and_nullable_combine_into_one_statement() {
        let adapter = adapter();
        let mut desired_col = Column {
            name: "a".to_string(),
            column_type: GenericType::Int,
            ..Default::default()
        };
        desired_col.default = Some(DialectValues::for_driver(Driver::Postgres, "2"));
        desired_col.nullable = Some(true);
        let mut existing_col = Column {
            name: "a".to_string(),
            column_type: GenericType::Int,
            ..Default::default()
        };
        existing_col.default = Some(DialectValues::for_driver(Driver::Postgres, "1"));
        existing_col.nullable = Some(false);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(
            rendered,
            vec!["ALTER TABLE t ALTER COLUMN a SET DEFAULT 2, ALTER COLUMN a DROP NOT NULL;"]
        );
    }

    #[test]
    fn test_drop_default() {
        let adapter = adapter();
        let changes = vec![TableChange {
            kind: TableChangeKind::Alter,
            table: "t".to_string(),
            table_ref: table("t", vec![]),
            columns: vec![ColumnChange {
                kind: ColumnChangeKind::Alter,
                name: "a".to_string(),
                column: Column {
                    name: "a".to_string(),
                    column_type: GenericType::Int,
                    ..Default::default()
                },
                previous: None,
                changes: vec![AlterKind::DefaultChanged],
            }],
            description: None,
        }];
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["ALTER TABLE t ALTER COLUMN a DROP DEFAULT;"]);
    }

    #[test]
    fn test_jsonb_default_gets_cast() {
        let adapter = adapter();
        let desired = schema(vec![table(
            "t",
            vec![Column {
                name: "cfg".to_string(),
                column_type: GenericType::String,
                subtype: Some(crate::schema::Subtype::Json),
                default: Some(DialectValues::for_driver(Driver::Postgres, "{}")),
                ..Default::default()
            }],
        )]);
        let existing = schema(vec![]);
        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(
            clean_sql(&rendered[0]),
            "CREATE TABLE IF NOT EXISTS t ( cfg jsonb DEFAULT '{}'::jsonb );"
        );
    }

    #[test]
    fn test_invalid_json_default_rejected() {
        let adapter = adapter();
        let desired = schema(vec![table(
            "t",
            vec![Column {
                name: "cfg".to_string(),
                column_type: GenericType::String,
                subtype: Some(crate::schema::Subtype::Json),
                default: Some(DialectValues::for_driver(Driver::Postgres, "{nope")),
                ..Default::default()
            }],
        )]);
        let existing = schema(vec![]);
        let changes = diff(&adapter, &desired, &existing).unwrap();
        let err = statements(&adapter, &changes).unwrap_err();
        assert!(err.to_string().contains("invalid default json value"));
    }

    #[test]
    fn test_drop_table_statement() {
        let adapter = adapter();
        let changes = vec![TableChange {
            kind: TableChangeKind::Drop,
            table: "old".to_string(),
            table_ref: table("old", vec![]),
            columns: vec![],
            description: None,
        }];
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["DROP TABLE IF EXISTS old CASCADE;"]);
    }

    #[test]
    fn test_table_description_change() {
        let adapter = adapter();
        let changes = vec![TableChange {
            kind: TableChangeKind::Alter,
            table: "t".to_string(),
            table_ref: table("t", vec![]),
            columns: vec![],
            description: Some(DescriptionChange {
                from: Some("old".to_string()),
                to: None,
            }),
        }];
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["COMMENT ON TABLE t IS NULL;"]);
    }

    #[test]
    fn test_create_table_with_comments() {
        let adapter = adapter();
        let mut users = table(
            "users",
            vec![Column {
                name: "id".to_string(),
                column_type: GenericType::Int,
                description: Some("surrogate key".to_string()),
                ..Default::default()
            }],
        );
        users.description = Some("registered users".to_string());
        let desired = schema(vec![users]);
        let existing = schema(vec![]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
        assert_eq!(rendered[1], "COMMENT ON TABLE users IS 'registered users';");
        assert_eq!(
            rendered[2],
            "COMMENT ON COLUMN users.id IS 'surrogate key';"
        );
    }

    #[test]
    fn test_add_column_statement() {
        let adapter = adapter();
        let desired = schema(vec![table(
            "t",
            vec![
                Column {
                    name: "a".to_string(),
                    column_type: GenericType::String,
                    ..Default::default()
                },
                Column {
                    name: "b".to_string(),
                    column_type: GenericType::Int,
                    nullable: Some(true),
                    ..Default::default()
                },
            ],
        )]);
        let existing = schema(vec![table(
            "t",
            vec![Column {
                name: "a".to_string(),
                column_type: GenericType::String,
                ..Default::default()
            }],
        )]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(rendered, vec!["ALTER TABLE t ADD COLUMN b int8;"]);
    }

    #[test]
    fn test_type_change_statement() {
        let adapter = adapter();
        let mut desired_col = Column {
            name: "a".to_string(),
            column_type: GenericType::String,
            max_length: Some(512),
            ..Default::default()
        };
        desired_col.nullable = Some(true);
        let mut existing_col = Column {
            name: "a".to_string(),
            column_type: GenericType::String,
            ..Default::default()
        };
        existing_col.nullable = Some(true);

        let desired = schema(vec![table("t", vec![desired_col])]);
        let existing = schema(vec![table("t", vec![existing_col])]);

        let changes = diff(&adapter, &desired, &existing).unwrap();
        let rendered = statements(&adapter, &changes).unwrap();
        assert_eq!(
            rendered,
            vec!["ALTER TABLE t ALTER COLUMN a TYPE varchar(512);"]
        );
    }
}
