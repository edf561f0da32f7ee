//! The canonical schema model, the document loader, and the conversions
//! between the model and introspected catalog metadata.

mod generate;
mod loader;
mod types;

pub use generate::{column_to_detail, schema_from_catalog, validate_default};
pub use loader::{load, validate};
pub use types::{
    Column, Database, DialectValues, GenericType, Length, Schema, Subtype, Table,
    DEFAULT_VERSION, SCHEMA_URL,
};
