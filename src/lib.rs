//! flatdb - a read-only, sort-aware query engine over delimited flat files
//!
//! Records stored in a delimited flat file are exposed as a queryable
//! collection of rows. A query is a conjunction of per-column predicates;
//! results arrive as a lazy, forward-only stream. When the file carries a
//! declared sort order, scans terminate as soon as no further row can match.

pub mod observability;
pub mod query;
pub mod scan;
pub mod schema;
