//! Generic information-schema introspection.
//!
//! Any backend that implements the `information_schema` standard can reuse
//! this machinery: two parametric queries project column and key-constraint
//! metadata, and the results land in catalog detail structs keyed by table
//! name in query order. Dialect adapters layer their own catalog enrichment
//! (comments, identity columns) on top.

use indexmap::IndexMap;

use crate::catalog::{ColumnDetail, ConstraintDetail, TableDetail};
use crate::db::Db;
use crate::util::{clean_sql, single_quote};

/// Schemas that are never introspected.
const DEFAULT_SCHEMA_EXCLUDES: [&str; 2] = ["pg_catalog", "information_schema"];
const DEFAULT_TABLE_TYPE: &str = "BASE TABLE";
const DEFAULT_TABLE_CATALOG: &str = "current_database()";

/// Overrides for the information-schema queries.
#[derive(Debug, Clone, Default)]
pub struct InfoQueryOptions {
    /// Override the `table_type` predicate (default `BASE TABLE`).
    pub table_type: Option<String>,

    /// Override the `table_catalog` predicate (default `current_database()`).
    /// A plain value is single-quoted; a `fn()` form is passed through.
    pub table_catalog: Option<String>,

    /// Additional schema names excluded beyond the built-in list.
    pub schema_excludes: Vec<String>,

    /// Restrict results to these tables. Applied in-process, not in SQL.
    pub table_filter: Vec<String>,
}

impl InfoQueryOptions {
    fn catalog_predicate(&self) -> String {
        match &self.table_catalog {
            Some(catalog) if !catalog.contains("()") => single_quote(catalog),
            Some(catalog) => catalog.clone(),
            None => DEFAULT_TABLE_CATALOG.to_string(),
        }
    }

    fn excludes_predicate(&self) -> String {
        DEFAULT_SCHEMA_EXCLUDES
            .iter()
            .copied()
            .chain(self.schema_excludes.iter().map(String::as_str))
            .map(single_quote)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The columns projection over `information_schema.columns`.
pub fn info_tables_query(opts: &InfoQueryOptions) -> String {
    let table_type = opts.table_type.as_deref().unwrap_or(DEFAULT_TABLE_TYPE);
    clean_sql(&format!(
        "SELECT
            table_name::text,
            column_name::text,
            ordinal_position::int4,
            column_default::text,
            is_nullable::text,
            data_type::text,
            character_maximum_length::int4,
            numeric_precision::int4,
            numeric_scale::int4,
            udt_name::text
        FROM
            information_schema.columns
        WHERE
            table_name IN (
                SELECT
                    table_name
                FROM
                    information_schema.tables
                WHERE
                    table_type = '{}'
                    AND table_schema NOT IN ({})
                    AND table_catalog = {}
            )
        ORDER BY table_name, ordinal_position",
        table_type,
        opts.excludes_predicate(),
        opts.catalog_predicate(),
    ))
}

/// The key-constraints projection over `information_schema.table_constraints`.
pub fn info_constraints_query(opts: &InfoQueryOptions) -> String {
    clean_sql(&format!(
        "SELECT
            tc.constraint_name::text,
            tc.table_name::text,
            c.column_name::text,
            tc.constraint_type::text
        FROM
            information_schema.table_constraints tc
        JOIN information_schema.constraint_column_usage AS ccu USING (constraint_schema, constraint_name)
        JOIN information_schema.columns AS c ON c.table_schema = tc.constraint_schema
          AND tc.table_name = c.table_name AND ccu.column_name = c.column_name
        WHERE
            tc.table_schema NOT IN ({})
            AND tc.table_catalog = {}
            AND tc.constraint_type != 'CHECK'
        ORDER BY tc.table_name",
        opts.excludes_predicate(),
        opts.catalog_predicate(),
    ))
}

/// Collect column and constraint metadata for every visible table.
///
/// Tables appear in query order (sorted by name); both queries treat an
/// empty result set as success.
pub async fn load_info_tables(
    db: &Db,
    opts: &InfoQueryOptions,
) -> crate::error::Result<IndexMap<String, TableDetail>> {
    let mut tables: IndexMap<String, TableDetail> = IndexMap::new();

    for row in db.query(&info_tables_query(opts)).await? {
        let table_name: String = row.get(0);
        if !opts.table_filter.is_empty() && !opts.table_filter.contains(&table_name) {
            continue;
        }
        let detail = ColumnDetail {
            name: row.get(1),
            ordinal: row.get(2),
            default: row.get(3),
            is_nullable: row.get::<_, String>(4) == "YES",
            data_type: row.get(5),
            max_length: row.get(6),
            numeric_precision: row.get(7),
            numeric_scale: row.get(8),
            udt_name: row.get(9),
            ..Default::default()
        };
        tables.entry(table_name).or_default().columns.push(detail);
    }

    if !tables.is_empty() {
        for row in db.query(&info_constraints_query(opts)).await? {
            let table_name: String = row.get(1);
            if let Some(table) = tables.get_mut(&table_name) {
                table.constraints.push(ConstraintDetail {
                    name: row.get(0),
                    column: row.get(2),
                    constraint_type: row.get(3),
                });
            }
        }
    }

    Ok(tables)
}
