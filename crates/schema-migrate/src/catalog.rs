//! Introspected table metadata.
//!
//! These value types hold what the information-schema and dialect catalog
//! queries return, before and after dialect-specific canonicalization. The
//! DDL generator also consumes them when rendering column definitions.

/// One table's worth of introspected metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDetail {
    /// Table comment, if any.
    pub description: Option<String>,

    /// Column definitions in ordinal order.
    pub columns: Vec<ColumnDetail>,

    /// Key constraints (primary key, unique) touching this table.
    pub constraints: Vec<ConstraintDetail>,
}

/// Column metadata.
///
/// `data_type` starts out as the raw information-schema spelling and is
/// rewritten to the generic type name (`string`, `int`, ...) during dialect
/// canonicalization; `udt_name` likewise ends up as the canonical native
/// spelling (`int8`, `varchar(255)`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDetail {
    /// Column name.
    pub name: String,

    /// Ordinal position (1-based).
    pub ordinal: i32,

    /// Data type classification.
    pub data_type: String,

    /// Underlying type spelling.
    pub udt_name: String,

    /// Default expression, if any.
    pub default: Option<String>,

    /// Column comment, if any.
    pub description: Option<String>,

    /// Maximum length for string/bit types.
    pub max_length: Option<i32>,

    /// Numeric precision.
    pub numeric_precision: Option<i32>,

    /// Numeric scale.
    pub numeric_scale: Option<i32>,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Whether the column is part of a primary key.
    pub is_primary_key: bool,

    /// Whether the column carries a unique constraint.
    pub is_unique: bool,

    /// Whether the column is identity-backed or sequence-defaulted.
    pub is_auto_incrementing: bool,

    /// Whether the column is an array of the underlying type.
    pub is_array: bool,
}

/// A key constraint row from `information_schema.table_constraints`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintDetail {
    /// Constraint name.
    pub name: String,

    /// Constraint type (`PRIMARY KEY`, `UNIQUE`, `FOREIGN KEY`).
    pub constraint_type: String,

    /// The constrained column.
    pub column: String,
}
