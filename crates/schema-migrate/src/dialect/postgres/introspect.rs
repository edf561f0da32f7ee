//! PostgreSQL catalog enrichment queries.
//!
//! The information-schema standard carries no comments and no identity
//! flags, so these come from the `pg_catalog` tables.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::db::Db;
use crate::error::Result;
use crate::util::clean_sql;

static TABLE_COMMENT_SQL: LazyLock<String> = LazyLock::new(|| {
    clean_sql(
        "SELECT
            c.relname::text,
            COALESCE(obj_description(c.oid), '')
        FROM
            pg_class c
        JOIN
            pg_namespace n ON n.oid = c.relnamespace
        WHERE
            n.nspname = 'public'
            AND c.relkind = 'r'
            AND c.oid IS NOT NULL",
    )
});

static COLUMN_COMMENT_SQL: LazyLock<String> = LazyLock::new(|| {
    clean_sql(
        "SELECT
            col.table_name::text,
            col.column_name::text,
            COALESCE(pg_catalog.col_description(c.oid, a.attnum), '')
        FROM
            information_schema.columns col
        JOIN
            pg_attribute a ON a.attname = col.column_name
        JOIN
            pg_class c ON c.oid = a.attrelid AND c.relname = col.table_name
        WHERE
            col.table_schema = 'public'
            AND a.attnum > 0
            AND c.oid IS NOT NULL",
    )
});

static TABLE_IDENTITY_SQL: LazyLock<String> = LazyLock::new(|| {
    clean_sql(
        "SELECT
            table_name::text,
            column_name::text
        FROM
            information_schema.columns
        WHERE
            data_type = 'integer'
            AND (is_identity = 'YES' OR column_default LIKE 'nextval%')
            AND table_name IN (
                SELECT table_name FROM information_schema.tables
                WHERE table_type = 'BASE TABLE' AND table_schema NOT IN ('pg_catalog','information_schema')
                AND table_catalog = current_database()
            )",
    )
});

/// Table name to table comment, empty comments included.
pub async fn table_descriptions(db: &Db) -> Result<HashMap<String, String>> {
    let mut tables = HashMap::new();
    for row in db.query(&TABLE_COMMENT_SQL).await? {
        let name: String = row.get(0);
        let comment: String = row.get(1);
        tables.insert(name, comment);
    }
    Ok(tables)
}

/// Table name to map of column name to non-empty column comment.
pub async fn column_descriptions(db: &Db) -> Result<HashMap<String, HashMap<String, String>>> {
    let mut tables: HashMap<String, HashMap<String, String>> = HashMap::new();
    for row in db.query(&COLUMN_COMMENT_SQL).await? {
        let table: String = row.get(0);
        let column: String = row.get(1);
        let comment: String = row.get(2);
        let columns = tables.entry(table).or_default();
        if !comment.is_empty() {
            columns.insert(column, comment);
        }
    }
    Ok(tables)
}

/// Table name to the set of auto-incrementing column names
/// (identity columns or sequence-backed defaults).
pub async fn auto_increment_columns(db: &Db) -> Result<HashMap<String, HashSet<String>>> {
    let mut tables: HashMap<String, HashSet<String>> = HashMap::new();
    for row in db.query(&TABLE_IDENTITY_SQL).await? {
        let table: String = row.get(0);
        let column: String = row.get(1);
        tables.entry(table).or_default().insert(column);
    }
    Ok(tables)
}
