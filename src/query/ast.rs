//! Query AST structures
//!
//! A query is a conjunction of per-column predicates. The scan engine only
//! ever asks three things of it: does it constrain a column, with which
//! operator, and with which argument(s).

use super::errors::{QueryError, QueryResult};

/// A predicate operator with its bound argument(s).
///
/// Arguments are carried as strings; whether they compare numerically is
/// decided per column when the scan compiles the query.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Equality: cell = value
    Eq(String),
    /// Strictly less: cell < value
    Lt(String),
    /// At most: cell <= value
    Lte(String),
    /// Strictly greater: cell > value
    Gt(String),
    /// At least: cell >= value
    Gte(String),
    /// Closed range: lo <= cell <= hi
    Between(String, String),
    /// Set membership
    In(Vec<String>),
    /// Regular-expression match
    Like(String),
    /// Cell is truthy (non-empty, not "0")
    IsTrue,
    /// Cell is falsy
    IsFalse,
}

impl Operator {
    /// Parses an operator from its external token and raw arguments.
    ///
    /// This is the boundary where query front-ends hand over strings; an
    /// unrecognized token is rejected here, before any scan is constructed.
    pub fn parse(token: &str, args: &[&str]) -> QueryResult<Self> {
        fn one(op: &'static str, args: &[&str]) -> QueryResult<String> {
            match args {
                [value] => Ok((*value).to_string()),
                _ => Err(QueryError::ArgumentCount {
                    op,
                    expected: 1,
                    got: args.len(),
                }),
            }
        }

        match token {
            "=" | "eq" => Ok(Operator::Eq(one("=", args)?)),
            "<" | "lt" => Ok(Operator::Lt(one("<", args)?)),
            "<=" | "lte" => Ok(Operator::Lte(one("<=", args)?)),
            ">" | "gt" => Ok(Operator::Gt(one(">", args)?)),
            ">=" | "gte" => Ok(Operator::Gte(one(">=", args)?)),
            "between" => match args {
                [lo, hi] => Ok(Operator::Between((*lo).to_string(), (*hi).to_string())),
                _ => Err(QueryError::ArgumentCount {
                    op: "between",
                    expected: 2,
                    got: args.len(),
                }),
            },
            "in" => Ok(Operator::In(args.iter().map(|a| a.to_string()).collect())),
            "like" => Ok(Operator::Like(one("like", args)?)),
            "true" => Ok(Operator::IsTrue),
            "false" => Ok(Operator::IsFalse),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }

    /// Returns the operator name for diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::Lt(_) => "lt",
            Operator::Lte(_) => "lte",
            Operator::Gt(_) => "gt",
            Operator::Gte(_) => "gte",
            Operator::Between(_, _) => "between",
            Operator::In(_) => "in",
            Operator::Like(_) => "like",
            Operator::IsTrue => "true",
            Operator::IsFalse => "false",
        }
    }

    /// Returns true if this is an equality operation
    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq(_))
    }

    /// Returns true if this is a range operation
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::Lt(_)
                | Operator::Lte(_)
                | Operator::Gt(_)
                | Operator::Gte(_)
                | Operator::Between(_, _)
        )
    }

    /// Whether a non-match verdict from this operator carries positional
    /// information on a sorted column.
    ///
    /// Pattern and truthiness tests only know "match" or "no match"; a scan
    /// must never end early because one of them failed.
    pub fn supports_order_pruning(&self) -> bool {
        !matches!(
            self,
            Operator::Like(_) | Operator::IsTrue | Operator::IsFalse
        )
    }
}

/// A single predicate (column + operator)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Column name
    pub field: String,
    /// Operator with bound arguments
    pub op: Operator,
}

impl Predicate {
    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Eq(value.into()),
        }
    }

    /// Create a less-than predicate
    pub fn lt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Lt(value.into()),
        }
    }

    /// Create a less-or-equal predicate
    pub fn lte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Lte(value.into()),
        }
    }

    /// Create a greater-than predicate
    pub fn gt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Gt(value.into()),
        }
    }

    /// Create a greater-or-equal predicate
    pub fn gte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Gte(value.into()),
        }
    }

    /// Create a closed-range predicate
    pub fn between(
        field: impl Into<String>,
        lo: impl Into<String>,
        hi: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            op: Operator::Between(lo.into(), hi.into()),
        }
    }

    /// Create a set-membership predicate
    pub fn is_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            op: Operator::In(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Create a pattern-match predicate
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::Like(pattern.into()),
        }
    }

    /// Create a truthiness predicate
    pub fn is_true(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::IsTrue,
        }
    }

    /// Create a falsiness predicate
    pub fn is_false(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: Operator::IsFalse,
        }
    }
}

/// A conjunction of predicates over one file's columns
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Predicates, all combined with AND
    predicates: Vec<Predicate>,
}

impl Query {
    /// Creates an empty query (matches every row)
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// All predicates in insertion order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns true when no predicate is present
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether any predicate constrains the given column
    pub fn constrains(&self, field: &str) -> bool {
        self.predicates.iter().any(|p| p.field == field)
    }

    /// Predicates constraining the given column, in insertion order
    pub fn predicates_for(&self, field: &str) -> Vec<&Predicate> {
        self.predicates.iter().filter(|p| p.field == field).collect()
    }
}
