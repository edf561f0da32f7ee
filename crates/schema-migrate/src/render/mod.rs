//! Change-set rendering: dialect-correct DDL and colored review output.

pub mod ddl;
pub mod text;

pub use ddl::{format_sql, schema_statements, statements};
pub use text::{format_diff, DiffFormat};
