//! Comparator factory
//!
//! A comparator binds one column, one operator, and its argument(s) into a
//! form evaluated once per candidate row. The verdict is three-valued: on a
//! sorted column, `Below` means the row is before the target region and the
//! scan must continue, `Above` means the row is past it and nothing further
//! can match.
//!
//! Arguments are parsed and sorted when the comparator is built; per-row
//! evaluation is a single match with no allocation.

use std::cmp::Ordering;

use regex::Regex;

use crate::observability::{monitor, ScanEvent};
use crate::query::{Operator, QueryError, QueryResult};

use super::Row;

/// Three-valued comparison outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Cell fails; on a sorted column the target region is still ahead
    Below,
    /// Cell satisfies the predicate
    Match,
    /// Cell fails; on a sorted column no later row can satisfy it
    Above,
}

impl Verdict {
    /// True when the predicate is satisfied
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// A bound argument, pre-parsed for the comparison mode chosen at build time
#[derive(Debug, Clone)]
enum Scalar {
    Num(f64),
    Text(String),
}

impl Scalar {
    /// Orders a cell relative to this argument
    fn cmp_cell(&self, cell: &str) -> Ordering {
        match self {
            Scalar::Num(arg) => numeric_cell(cell).total_cmp(arg),
            Scalar::Text(arg) => cell.cmp(arg.as_str()),
        }
    }
}

/// Numeric view of a cell; malformed cells compare as zero
fn numeric_cell(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(0.0)
}

/// A cell is truthy unless empty or the literal "0"
fn truthy(cell: &str) -> bool {
    !cell.is_empty() && cell != "0"
}

/// Compiled operator form
#[derive(Debug, Clone)]
enum CmpKind {
    Eq(Scalar),
    Lt(Scalar),
    Lte(Scalar),
    Gt(Scalar),
    Gte(Scalar),
    Between(Scalar, Scalar),
    InNum(Vec<f64>),
    InText(Vec<String>),
    Like(Regex),
    Truthy,
    Falsy,
    /// Degenerate predicate; reports Above for every row
    Never,
}

/// One column comparator, evaluated against successive rows of a scan
#[derive(Debug, Clone)]
pub struct Comparator {
    column: usize,
    kind: CmpKind,
}

impl Comparator {
    /// Builds a comparator for one predicate.
    ///
    /// Numeric semantics apply when the column is numeric and every argument
    /// parses as a number; otherwise comparisons are byte-lexicographic.
    /// Degenerate arguments (between with lo > hi, in with no values) produce
    /// a comparator that can never match, plus a monitor warning.
    pub fn build(
        field: &str,
        column: usize,
        numeric: bool,
        op: &Operator,
    ) -> QueryResult<Self> {
        let kind = match op {
            Operator::Eq(arg) => CmpKind::Eq(scalar(numeric, arg)),
            Operator::Lt(arg) => CmpKind::Lt(scalar(numeric, arg)),
            Operator::Lte(arg) => CmpKind::Lte(scalar(numeric, arg)),
            Operator::Gt(arg) => CmpKind::Gt(scalar(numeric, arg)),
            Operator::Gte(arg) => CmpKind::Gte(scalar(numeric, arg)),
            Operator::Between(lo, hi) => build_between(field, numeric, lo, hi),
            Operator::In(values) => build_in(field, numeric, values),
            Operator::Like(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| QueryError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                CmpKind::Like(regex)
            }
            Operator::IsTrue => CmpKind::Truthy,
            Operator::IsFalse => CmpKind::Falsy,
        };
        Ok(Self { column, kind })
    }

    /// Physical column this comparator reads
    pub fn column(&self) -> usize {
        self.column
    }

    /// Evaluates the bound predicate against one row
    pub fn verdict(&self, row: &Row) -> Verdict {
        let cell = row.get(self.column).map(String::as_str).unwrap_or("");
        match &self.kind {
            CmpKind::Eq(arg) => match arg.cmp_cell(cell) {
                Ordering::Less => Verdict::Below,
                Ordering::Equal => Verdict::Match,
                Ordering::Greater => Verdict::Above,
            },
            CmpKind::Lt(arg) => match arg.cmp_cell(cell) {
                Ordering::Less => Verdict::Match,
                _ => Verdict::Above,
            },
            CmpKind::Lte(arg) => match arg.cmp_cell(cell) {
                Ordering::Greater => Verdict::Above,
                _ => Verdict::Match,
            },
            CmpKind::Gt(arg) => match arg.cmp_cell(cell) {
                Ordering::Greater => Verdict::Match,
                _ => Verdict::Below,
            },
            CmpKind::Gte(arg) => match arg.cmp_cell(cell) {
                Ordering::Less => Verdict::Below,
                _ => Verdict::Match,
            },
            CmpKind::Between(lo, hi) => {
                if lo.cmp_cell(cell) == Ordering::Less {
                    Verdict::Below
                } else if hi.cmp_cell(cell) == Ordering::Greater {
                    Verdict::Above
                } else {
                    Verdict::Match
                }
            }
            CmpKind::InNum(values) => {
                let cell = numeric_cell(cell);
                // Non-empty by construction; empty sets compile to Never
                let min = values[0];
                let max = values[values.len() - 1];
                if cell.total_cmp(&min) == Ordering::Less {
                    Verdict::Below
                } else if cell.total_cmp(&max) == Ordering::Greater {
                    Verdict::Above
                } else if values.iter().any(|v| v.total_cmp(&cell) == Ordering::Equal) {
                    Verdict::Match
                } else {
                    Verdict::Below
                }
            }
            CmpKind::InText(values) => {
                let min = values[0].as_str();
                let max = values[values.len() - 1].as_str();
                if cell < min {
                    Verdict::Below
                } else if cell > max {
                    Verdict::Above
                } else if values.iter().any(|v| v == cell) {
                    Verdict::Match
                } else {
                    Verdict::Below
                }
            }
            CmpKind::Like(regex) => {
                if regex.is_match(cell) {
                    Verdict::Match
                } else {
                    Verdict::Above
                }
            }
            CmpKind::Truthy => {
                if truthy(cell) {
                    Verdict::Match
                } else {
                    Verdict::Above
                }
            }
            CmpKind::Falsy => {
                if truthy(cell) {
                    Verdict::Above
                } else {
                    Verdict::Match
                }
            }
            CmpKind::Never => Verdict::Above,
        }
    }
}

/// Picks numeric or text mode for one argument
fn scalar(numeric: bool, raw: &str) -> Scalar {
    if numeric {
        if let Ok(value) = raw.trim().parse::<f64>() {
            return Scalar::Num(value);
        }
    }
    Scalar::Text(raw.to_string())
}

fn build_between(field: &str, numeric: bool, lo: &str, hi: &str) -> CmpKind {
    let (lo_n, hi_n) = (lo.trim().parse::<f64>(), hi.trim().parse::<f64>());
    if numeric {
        if let (Ok(lo_n), Ok(hi_n)) = (lo_n, hi_n) {
            if lo_n.total_cmp(&hi_n) == Ordering::Greater {
                warn_degenerate(field, "between with lower bound above upper bound");
                return CmpKind::Never;
            }
            return CmpKind::Between(Scalar::Num(lo_n), Scalar::Num(hi_n));
        }
    }
    if lo > hi {
        warn_degenerate(field, "between with lower bound above upper bound");
        return CmpKind::Never;
    }
    CmpKind::Between(Scalar::Text(lo.to_string()), Scalar::Text(hi.to_string()))
}

fn build_in(field: &str, numeric: bool, values: &[String]) -> CmpKind {
    if values.is_empty() {
        warn_degenerate(field, "empty in-set");
        return CmpKind::Never;
    }
    if numeric {
        let parsed: Result<Vec<f64>, _> =
            values.iter().map(|v| v.trim().parse::<f64>()).collect();
        if let Ok(mut nums) = parsed {
            nums.sort_by(|a, b| a.total_cmp(b));
            return CmpKind::InNum(nums);
        }
    }
    let mut texts: Vec<String> = values.to_vec();
    texts.sort();
    CmpKind::InText(texts)
}

fn warn_degenerate(field: &str, reason: &str) {
    monitor::emit(&ScanEvent::DegeneratePredicate {
        column: field,
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cell: &str) -> Row {
        vec![cell.to_string()]
    }

    fn cmp(numeric: bool, op: Operator) -> Comparator {
        Comparator::build("col", 0, numeric, &op).unwrap()
    }

    #[test]
    fn test_numeric_equality_three_verdicts() {
        let c = cmp(true, Operator::Eq("3".into()));
        assert_eq!(c.verdict(&row("1")), Verdict::Below);
        assert_eq!(c.verdict(&row("3")), Verdict::Match);
        assert_eq!(c.verdict(&row("5")), Verdict::Above);
    }

    #[test]
    fn test_string_equality_is_lexicographic() {
        let c = cmp(false, Operator::Eq("bob".into()));
        assert_eq!(c.verdict(&row("alice")), Verdict::Below);
        assert_eq!(c.verdict(&row("bob")), Verdict::Match);
        assert_eq!(c.verdict(&row("carol")), Verdict::Above);
    }

    #[test]
    fn test_numeric_mode_needs_numeric_arguments() {
        // Numeric column but non-numeric argument: falls back to text compare
        let c = cmp(true, Operator::Eq("abc".into()));
        assert_eq!(c.verdict(&row("abc")), Verdict::Match);
        assert_eq!(c.verdict(&row("abd")), Verdict::Above);
    }

    #[test]
    fn test_numeric_beats_lexicographic_on_width() {
        let c = cmp(true, Operator::Gte("9".into()));
        // "10" < "9" lexicographically, but 10 >= 9 numerically
        assert_eq!(c.verdict(&row("10")), Verdict::Match);

        let c = cmp(false, Operator::Gte("9".into()));
        assert_eq!(c.verdict(&row("10")), Verdict::Below);
    }

    #[test]
    fn test_less_than_family_never_reports_below() {
        let lt = cmp(true, Operator::Lt("3".into()));
        assert_eq!(lt.verdict(&row("2")), Verdict::Match);
        assert_eq!(lt.verdict(&row("3")), Verdict::Above);
        assert_eq!(lt.verdict(&row("4")), Verdict::Above);

        let lte = cmp(true, Operator::Lte("3".into()));
        assert_eq!(lte.verdict(&row("3")), Verdict::Match);
        assert_eq!(lte.verdict(&row("4")), Verdict::Above);
    }

    #[test]
    fn test_greater_than_family_never_reports_above() {
        let gt = cmp(true, Operator::Gt("3".into()));
        assert_eq!(gt.verdict(&row("4")), Verdict::Match);
        assert_eq!(gt.verdict(&row("3")), Verdict::Below);
        assert_eq!(gt.verdict(&row("2")), Verdict::Below);

        let gte = cmp(true, Operator::Gte("3".into()));
        assert_eq!(gte.verdict(&row("3")), Verdict::Match);
        assert_eq!(gte.verdict(&row("2")), Verdict::Below);
    }

    #[test]
    fn test_between_brackets_both_sides() {
        let c = cmp(true, Operator::Between("2".into(), "4".into()));
        assert_eq!(c.verdict(&row("1")), Verdict::Below);
        assert_eq!(c.verdict(&row("2")), Verdict::Match);
        assert_eq!(c.verdict(&row("3")), Verdict::Match);
        assert_eq!(c.verdict(&row("4")), Verdict::Match);
        assert_eq!(c.verdict(&row("5")), Verdict::Above);
    }

    #[test]
    fn test_between_inverted_bounds_never_matches() {
        let c = cmp(true, Operator::Between("4".into(), "2".into()));
        for cell in ["1", "3", "5"] {
            assert_eq!(c.verdict(&row(cell)), Verdict::Above);
        }
    }

    #[test]
    fn test_in_set_positions_relative_to_extremes() {
        let c = cmp(true, Operator::In(vec!["6".into(), "2".into(), "4".into()]));
        assert_eq!(c.verdict(&row("1")), Verdict::Below);
        assert_eq!(c.verdict(&row("2")), Verdict::Match);
        assert_eq!(c.verdict(&row("3")), Verdict::Below);
        assert_eq!(c.verdict(&row("4")), Verdict::Match);
        assert_eq!(c.verdict(&row("5")), Verdict::Below);
        assert_eq!(c.verdict(&row("6")), Verdict::Match);
        assert_eq!(c.verdict(&row("7")), Verdict::Above);
    }

    #[test]
    fn test_in_empty_set_never_matches() {
        let c = cmp(true, Operator::In(Vec::new()));
        assert_eq!(c.verdict(&row("1")), Verdict::Above);
    }

    #[test]
    fn test_like_only_match_or_above() {
        let c = cmp(false, Operator::Like("^[AB]".into()));
        assert_eq!(c.verdict(&row("Alice")), Verdict::Match);
        assert_eq!(c.verdict(&row("Bob")), Verdict::Match);
        assert_eq!(c.verdict(&row("Carol")), Verdict::Above);
        assert_eq!(c.verdict(&row("")), Verdict::Above);
    }

    #[test]
    fn test_like_bad_pattern_rejected() {
        let err = Comparator::build("col", 0, false, &Operator::Like("[unclosed".into()))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidPattern { .. }));
    }

    #[test]
    fn test_truthiness() {
        let t = cmp(false, Operator::IsTrue);
        assert_eq!(t.verdict(&row("1")), Verdict::Match);
        assert_eq!(t.verdict(&row("yes")), Verdict::Match);
        assert_eq!(t.verdict(&row("0")), Verdict::Above);
        assert_eq!(t.verdict(&row("")), Verdict::Above);

        let f = cmp(false, Operator::IsFalse);
        assert_eq!(f.verdict(&row("0")), Verdict::Match);
        assert_eq!(f.verdict(&row("")), Verdict::Match);
        assert_eq!(f.verdict(&row("1")), Verdict::Above);
    }

    #[test]
    fn test_malformed_numeric_cell_compares_as_zero() {
        let c = cmp(true, Operator::Lt("5".into()));
        assert_eq!(c.verdict(&row("not-a-number")), Verdict::Match);
        let c = cmp(true, Operator::Gt("-1".into()));
        assert_eq!(c.verdict(&row("not-a-number")), Verdict::Match);
    }

    #[test]
    fn test_missing_cell_reads_as_empty() {
        let c = Comparator::build("col", 5, false, &Operator::Eq("".into())).unwrap();
        assert_eq!(c.verdict(&row("anything")), Verdict::Match);
    }
}
