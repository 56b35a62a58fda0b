//! In-memory comparison artifacts: the full merged table, the
//! differences-only view, and the summary statistics. Serialization to
//! disk lives in `output`.

use serde::Serialize;

use crate::{
    compare::{ColumnPlan, ComparisonOutcome},
    data::Cell,
    duplicates::DuplicateGroup,
    join::JoinedRow,
    normalize::NormalizedDataset,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
}

/// A recoverable condition observed during the run: duplicate keys,
/// unparseable cells, irreconcilable column types. Returned with the
/// report so a caller can decide whether to trust a clean match rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    LeftOnly,
    RightOnly,
    Both,
}

impl Presence {
    /// Label used in the `_merge` column of serialized reports.
    pub fn label(&self, left_name: &str, right_name: &str) -> String {
        match self {
            Presence::LeftOnly => format!("Only in {left_name}"),
            Presence::RightOnly => format!("Only in {right_name}"),
            Presence::Both => "Present in Both".to_string(),
        }
    }
}

/// One row of the full outer join with its comparison verdicts. One-sided
/// rows carry `is_equal = false` and all-false column flags, so they land
/// in the differences view alongside value mismatches.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub key: Vec<Cell>,
    pub presence: Presence,
    /// Comparing-column cells from dataset 1, in plan order.
    pub left: Option<Vec<Cell>>,
    /// Comparing-column cells from dataset 2, in plan order.
    pub right: Option<Vec<Cell>>,
    pub column_match: Vec<bool>,
    pub is_equal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub left_name: String,
    pub right_name: String,
    pub left_rows: usize,
    pub right_rows: usize,
    pub total_rows: usize,
    pub equal_rows: usize,
    pub different_rows: usize,
    pub match_percentage: f64,
    pub in_both: usize,
    pub only_in_left: usize,
    pub only_in_right: usize,
    pub left_duplicate_groups: usize,
    pub right_duplicate_groups: usize,
}

#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub key_columns: Vec<String>,
    pub comparing_columns: Vec<String>,
    pub rows: Vec<MergedRow>,
    pub left_duplicates: Vec<DuplicateGroup>,
    pub right_duplicates: Vec<DuplicateGroup>,
    pub summary: Summary,
    pub diagnostics: Vec<Diagnostic>,
}

impl ComparisonReport {
    /// The subset of the full table where values differ or presence is
    /// not "both".
    pub fn differences(&self) -> Vec<&MergedRow> {
        self.rows.iter().filter(|row| !row.is_equal).collect()
    }
}

/// Builds the report from the join result and the comparator outcomes.
/// `outcomes` must hold one entry per matched pair, in join order.
#[allow(clippy::too_many_arguments)]
pub fn assemble(
    left: &NormalizedDataset,
    right: &NormalizedDataset,
    left_key: &[usize],
    right_key: &[usize],
    key_columns: Vec<String>,
    plan: &[ColumnPlan],
    joined: &[JoinedRow],
    outcomes: &[ComparisonOutcome],
    left_duplicates: Vec<DuplicateGroup>,
    right_duplicates: Vec<DuplicateGroup>,
    diagnostics: Vec<Diagnostic>,
) -> ComparisonReport {
    let column_count = plan.len();
    let mut rows = Vec::with_capacity(joined.len());
    let mut outcome_iter = outcomes.iter();
    let (mut in_both, mut only_in_left, mut only_in_right) = (0usize, 0usize, 0usize);

    for entry in joined {
        let row = match entry {
            JoinedRow::Matched {
                left: left_idx,
                right: right_idx,
            } => {
                in_both += 1;
                let outcome = outcome_iter
                    .next()
                    .cloned()
                    .unwrap_or_else(|| ComparisonOutcome {
                        flags: vec![false; column_count],
                        is_equal: false,
                    });
                MergedRow {
                    key: key_cells(&left.rows[*left_idx], left_key),
                    presence: Presence::Both,
                    left: Some(comparing_cells(&left.rows[*left_idx], plan, true)),
                    right: Some(comparing_cells(&right.rows[*right_idx], plan, false)),
                    column_match: outcome.flags,
                    is_equal: outcome.is_equal,
                }
            }
            JoinedRow::LeftOnly { left: left_idx } => {
                only_in_left += 1;
                MergedRow {
                    key: key_cells(&left.rows[*left_idx], left_key),
                    presence: Presence::LeftOnly,
                    left: Some(comparing_cells(&left.rows[*left_idx], plan, true)),
                    right: None,
                    column_match: vec![false; column_count],
                    is_equal: false,
                }
            }
            JoinedRow::RightOnly { right: right_idx } => {
                only_in_right += 1;
                MergedRow {
                    key: key_cells(&right.rows[*right_idx], right_key),
                    presence: Presence::RightOnly,
                    left: None,
                    right: Some(comparing_cells(&right.rows[*right_idx], plan, false)),
                    column_match: vec![false; column_count],
                    is_equal: false,
                }
            }
        };
        rows.push(row);
    }

    let total_rows = rows.len();
    let equal_rows = rows.iter().filter(|row| row.is_equal).count();
    let summary = Summary {
        left_name: left.name.clone(),
        right_name: right.name.clone(),
        left_rows: left.row_count(),
        right_rows: right.row_count(),
        total_rows,
        equal_rows,
        different_rows: total_rows - equal_rows,
        match_percentage: if total_rows > 0 {
            equal_rows as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        },
        in_both,
        only_in_left,
        only_in_right,
        left_duplicate_groups: left_duplicates.len(),
        right_duplicate_groups: right_duplicates.len(),
    };

    ComparisonReport {
        key_columns,
        comparing_columns: plan.iter().map(|column| column.name.clone()).collect(),
        rows,
        left_duplicates,
        right_duplicates,
        summary,
        diagnostics,
    }
}

fn key_cells(row: &[Cell], key_indices: &[usize]) -> Vec<Cell> {
    key_indices
        .iter()
        .map(|idx| row.get(*idx).cloned().unwrap_or(Cell::Null))
        .collect()
}

fn comparing_cells(row: &[Cell], plan: &[ColumnPlan], left_side: bool) -> Vec<Cell> {
    plan.iter()
        .map(|column| {
            let idx = if left_side {
                column.left_idx
            } else {
                column.right_idx
            };
            row.get(idx).cloned().unwrap_or(Cell::Null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::normalize::CompareKind;
    use crate::schema::Schema;

    fn plan_for(name: &str) -> Vec<ColumnPlan> {
        vec![ColumnPlan {
            name: name.to_string(),
            left_idx: 1,
            right_idx: 1,
            kind: Some(CompareKind::Numeric),
        }]
    }

    fn dataset(name: &str, rows: Vec<Vec<Cell>>) -> NormalizedDataset {
        NormalizedDataset {
            name: name.to_string(),
            schema: Schema::from_headers(&["id".to_string(), "v".to_string()]),
            rows,
        }
    }

    fn int_cell(v: i64) -> Cell {
        Cell::Value(Value::Integer(v))
    }

    #[test]
    fn summary_counts_presence_and_match_rate() {
        let left = dataset(
            "source1",
            vec![vec![int_cell(2), int_cell(20)], vec![int_cell(3), int_cell(30)]],
        );
        let right = dataset(
            "source2",
            vec![vec![int_cell(3), int_cell(30)], vec![int_cell(4), int_cell(40)]],
        );
        let joined = vec![
            JoinedRow::LeftOnly { left: 0 },
            JoinedRow::Matched { left: 1, right: 0 },
            JoinedRow::RightOnly { right: 1 },
        ];
        let outcomes = vec![ComparisonOutcome {
            flags: vec![true],
            is_equal: true,
        }];
        let report = assemble(
            &left,
            &right,
            &[0],
            &[0],
            vec!["id".to_string()],
            &plan_for("v"),
            &joined,
            &outcomes,
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(report.summary.total_rows, 3);
        assert_eq!(report.summary.equal_rows, 1);
        assert_eq!(report.summary.in_both, 1);
        assert_eq!(report.summary.only_in_left, 1);
        assert_eq!(report.summary.only_in_right, 1);
        assert!((report.summary.match_percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.differences().len(), 2);
    }

    #[test]
    fn empty_join_yields_zero_percentage() {
        let left = dataset("source1", Vec::new());
        let right = dataset("source2", Vec::new());
        let report = assemble(
            &left,
            &right,
            &[0],
            &[0],
            vec!["id".to_string()],
            &[],
            &[],
            &[],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(report.summary.total_rows, 0);
        assert_eq!(report.summary.match_percentage, 0.0);
    }

    #[test]
    fn one_sided_rows_are_differences() {
        let left = dataset("source1", vec![vec![int_cell(1), int_cell(5)]]);
        let right = dataset("source2", Vec::new());
        let joined = vec![JoinedRow::LeftOnly { left: 0 }];
        let report = assemble(
            &left,
            &right,
            &[0],
            &[0],
            vec!["id".to_string()],
            &plan_for("v"),
            &joined,
            &[],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let row = &report.rows[0];
        assert_eq!(row.presence, Presence::LeftOnly);
        assert!(!row.is_equal);
        assert_eq!(row.column_match, vec![false]);
        assert!(row.right.is_none());
    }
}
