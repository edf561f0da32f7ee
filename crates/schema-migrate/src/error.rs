//! Error types for the migration engine.

use thiserror::Error;

/// Main error type for schema migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Malformed schema document, unsupported file extension, invalid identifier.
    #[error("invalid schema: {0}")]
    Input(String),

    /// No dialect adapter registered for the requested protocol.
    #[error("protocol: {0} not supported")]
    UnsupportedProtocol(String),

    /// Connection establishment or health-check failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Schema introspection failed (SQL error, unexpected data type, invalid default).
    #[error("introspection failed: {0}")]
    Introspection(String),

    /// The diff attempted a structural change that cannot be applied in place.
    #[error("column {column} for table {table}: you cannot change the {attribute} of a column")]
    ForbiddenChange {
        table: String,
        column: String,
        attribute: &'static str,
    },

    /// Rendering a change set to DDL failed.
    #[error("emission failed: {0}")]
    Emission(String),

    /// A DDL statement failed to execute against the database.
    #[error("error applying `{statement}`: {source}")]
    Apply {
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// An operation the registered adapter does not implement yet.
    #[error("{operation} is not implemented for {driver}")]
    Unimplemented {
        driver: &'static str,
        operation: &'static str,
    },

    /// Database query or execution error.
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// IO error (file operations, writer failures).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation was cancelled (SIGINT, etc.)
    #[error("operation cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create an Input error.
    pub fn input(message: impl Into<String>) -> Self {
        MigrateError::Input(message.into())
    }

    /// Create an Introspection error.
    pub fn introspection(message: impl Into<String>) -> Self {
        MigrateError::Introspection(message.into())
    }

    /// Create a ForbiddenChange error for a column attribute.
    pub fn forbidden(
        table: impl Into<String>,
        column: impl Into<String>,
        attribute: &'static str,
    ) -> Self {
        MigrateError::ForbiddenChange {
            table: table.into(),
            column: column.into(),
            attribute,
        }
    }

    /// Format error with full details including the source chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
