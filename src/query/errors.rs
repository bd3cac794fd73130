//! # Query Errors
//!
//! Error types for query construction.

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building a query or compiling its predicates
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Operator token not in the operator table
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Wrong number of arguments for an operator
    #[error("operator '{op}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// Pattern operator argument does not compile
    #[error("invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
