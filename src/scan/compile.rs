//! Query compilation
//!
//! Projects a query onto one schema: an ordered comparator list plus the
//! sorted-prefix marker that gives the scan its early-termination leverage.
//!
//! Columns are walked sort-order first, then the remaining columns in file
//! order. The sorted prefix ends at the first sort column the query does not
//! constrain; pattern and truthiness comparators also end it, because their
//! failure verdicts carry no positional information.

use crate::query::Query;
use crate::schema::FileSchema;

use super::compare::{Comparator, Verdict};
use super::errors::ScanResult;
use super::Row;

/// Outcome of judging one candidate row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowJudgment {
    /// Every comparator matched
    Matched,
    /// Some comparator failed; later rows may still match
    Discard,
    /// A sorted-prefix comparator reported Above; nothing further can match
    Terminate,
}

/// A query compiled against one schema, valid for a single scan.
///
/// Never reused across scans: comparators embed argument values.
pub struct CompiledQuery {
    comparators: Vec<Comparator>,
    /// Index of the last comparator inside the sorted prefix
    last_sorted: Option<usize>,
}

impl CompiledQuery {
    /// Compiles a query against a schema.
    ///
    /// Predicates on columns the schema does not know are ignored here; they
    /// belong to collaborators that post-process yielded rows.
    pub fn compile(schema: &FileSchema, query: &Query) -> ScanResult<Self> {
        let mut comparators = Vec::new();
        let mut last_sorted = None;
        let mut in_prefix = true;

        for name in schema.sort_order() {
            let predicates = query.predicates_for(name);
            if predicates.is_empty() {
                in_prefix = false;
                continue;
            }
            // Sort columns are schema-validated, so the index exists
            let Some(column) = schema.column_index(name) else {
                continue;
            };
            let numeric = schema.is_numeric(name);
            for predicate in predicates {
                let prunes = predicate.op.supports_order_pruning();
                comparators.push(Comparator::build(name, column, numeric, &predicate.op)?);
                if in_prefix && prunes {
                    last_sorted = Some(comparators.len() - 1);
                } else {
                    in_prefix = false;
                }
            }
        }

        for name in schema.columns() {
            if schema.sort_order().iter().any(|s| s == name) {
                continue;
            }
            let Some(column) = schema.column_index(name) else {
                continue;
            };
            let numeric = schema.is_numeric(name);
            for predicate in query.predicates_for(name) {
                comparators.push(Comparator::build(name, column, numeric, &predicate.op)?);
            }
        }

        Ok(Self {
            comparators,
            last_sorted,
        })
    }

    /// Compiled comparators in evaluation order
    pub fn comparators(&self) -> &[Comparator] {
        &self.comparators
    }

    /// Index of the last sorted-prefix comparator; `None` means the scan has
    /// no early-termination leverage
    pub fn last_sorted(&self) -> Option<usize> {
        self.last_sorted
    }

    /// Judges one candidate row, in comparator order
    pub fn judge(&self, row: &Row) -> RowJudgment {
        for (index, comparator) in self.comparators.iter().enumerate() {
            match comparator.verdict(row) {
                Verdict::Match => {}
                Verdict::Above if self.last_sorted.map_or(false, |l| index <= l) => {
                    return RowJudgment::Terminate;
                }
                _ => return RowJudgment::Discard,
            }
        }
        RowJudgment::Matched
    }

    /// Whether a cached row lies strictly before the target region.
    ///
    /// Evaluates only the sorted prefix, in order: the first Below verdict
    /// proves the row is strictly below; Above, or equality on the whole
    /// prefix, does not (the caller must keep looking at older rows).
    pub fn strictly_below(&self, row: &Row) -> bool {
        let Some(last) = self.last_sorted else {
            return false;
        };
        for comparator in &self.comparators[..=last] {
            match comparator.verdict(row) {
                Verdict::Below => return true,
                Verdict::Above => return false,
                Verdict::Match => {}
            }
        }
        false
    }
}
