//! Schema View subsystem for flatdb
//!
//! A schema view is the immutable description of one delimited flat file:
//! column layout, sort order, delimiters, equivalent paths, and per-column
//! typing. Construction validates the configuration; every later failure mode
//! of a scan that traces back to configuration surfaces here first.

mod errors;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use types::{
    ConstantValue, FieldType, FileSchema, FileSchemaConfig, DEFAULT_CACHE_CAPACITY,
};
