//! Per-column value comparison for matched row pairs, including the
//! numeric tolerance rules.

use std::collections::HashMap;

use crate::{
    data::{Cell, Value},
    normalize::CompareKind,
};

/// Policy deciding whether two numeric values count as equal despite a
/// numeric difference. Non-numeric columns ignore tolerance and compare
/// by exact normalized equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToleranceRule {
    Exact,
    Absolute(f64),
    Relative(f64),
}

impl ToleranceRule {
    /// Boundary cases (`|a-b| == epsilon`) match. Relative tolerance with
    /// both values zero is defined as a match.
    pub fn numbers_match(&self, a: f64, b: f64) -> bool {
        match self {
            ToleranceRule::Exact => a == b,
            ToleranceRule::Absolute(epsilon) => (a - b).abs() <= *epsilon,
            ToleranceRule::Relative(epsilon) => {
                let denom = a.abs().max(b.abs());
                if denom == 0.0 {
                    true
                } else {
                    (a - b).abs() / denom <= *epsilon
                }
            }
        }
    }
}

/// Resolved tolerance configuration: per-column overrides plus global
/// defaults. A per-column rule wins; otherwise a non-zero relative
/// default applies, then a non-zero absolute default, then exact.
#[derive(Debug, Clone, Default)]
pub struct ToleranceConfig {
    pub per_column: HashMap<String, ToleranceRule>,
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl ToleranceConfig {
    pub fn rule_for(&self, column: &str) -> ToleranceRule {
        if let Some(rule) = self.per_column.get(column) {
            return *rule;
        }
        if self.rel_tol > 0.0 {
            ToleranceRule::Relative(self.rel_tol)
        } else if self.abs_tol > 0.0 {
            ToleranceRule::Absolute(self.abs_tol)
        } else {
            ToleranceRule::Exact
        }
    }
}

/// One comparing column resolved against both schemas.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub name: String,
    pub left_idx: usize,
    pub right_idx: usize,
    /// `None` marks a column whose types could not be reconciled across
    /// the datasets; every cell pair in it is a permanent mismatch.
    pub kind: Option<CompareKind>,
}

/// Result of comparing one matched pair: a flag per comparing column and
/// the derived row-level equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonOutcome {
    pub flags: Vec<bool>,
    pub is_equal: bool,
}

/// Exact equality over normalized values. Numeric kinds compare by value
/// regardless of representation, so DECIMAL 10.00 equals float 10.0.
pub fn exact_equal(a: &Value, b: &Value) -> bool {
    match (a.as_numeric(), b.as_numeric()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Compares one cell pair under the column's reconciled kind and rule.
pub fn cells_match(left: &Cell, right: &Cell, kind: Option<CompareKind>, rule: ToleranceRule) -> bool {
    // An incomparable column or cell is a permanent mismatch.
    let Some(kind) = kind else {
        return false;
    };
    match (left, right) {
        (Cell::Incomparable(_), _) | (_, Cell::Incomparable(_)) => false,
        (Cell::Null, Cell::Null) => true,
        (Cell::Null, _) | (_, Cell::Null) => false,
        (Cell::Value(a), Cell::Value(b)) => {
            if kind == CompareKind::Numeric {
                match (a.as_numeric(), b.as_numeric()) {
                    (Some(x), Some(y)) => rule.numbers_match(x, y),
                    _ => exact_equal(a, b),
                }
            } else {
                exact_equal(a, b)
            }
        }
    }
}

/// Evaluates every comparing column for one matched pair.
pub fn compare_pair(
    left_row: &[Cell],
    right_row: &[Cell],
    plan: &[ColumnPlan],
    tolerances: &ToleranceConfig,
) -> ComparisonOutcome {
    let mut flags = Vec::with_capacity(plan.len());
    for column in plan {
        let left = left_row.get(column.left_idx).unwrap_or(&Cell::Null);
        let right = right_row.get(column.right_idx).unwrap_or(&Cell::Null);
        let rule = tolerances.rule_for(&column.name);
        flags.push(cells_match(left, right, column.kind, rule));
    }
    let is_equal = flags.iter().all(|flag| *flag);
    ComparisonOutcome { flags, is_equal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn absolute_tolerance_includes_the_boundary() {
        let rule = ToleranceRule::Absolute(0.01);
        assert!(rule.numbers_match(10.0, 10.004));
        assert!(rule.numbers_match(10.0, 10.01));
        assert!(!rule.numbers_match(10.0, 10.011));
    }

    #[test]
    fn relative_tolerance_treats_double_zero_as_equal() {
        let rule = ToleranceRule::Relative(0.001);
        assert!(rule.numbers_match(0.0, 0.0));
        assert!(rule.numbers_match(1000.0, 1000.5));
        assert!(!rule.numbers_match(1000.0, 1002.0));
    }

    #[test]
    fn rule_resolution_prefers_column_override() {
        let config = ToleranceConfig {
            per_column: HashMap::from([("total".to_string(), ToleranceRule::Absolute(0.05))]),
            abs_tol: 0.0,
            rel_tol: 0.01,
        };
        assert_eq!(config.rule_for("total"), ToleranceRule::Absolute(0.05));
        assert_eq!(config.rule_for("rate"), ToleranceRule::Relative(0.01));
        assert_eq!(ToleranceConfig::default().rule_for("x"), ToleranceRule::Exact);
    }

    #[test]
    fn nulls_equal_each_other_and_nothing_else() {
        let rule = ToleranceRule::Exact;
        let kind = Some(CompareKind::Numeric);
        assert!(cells_match(&Cell::Null, &Cell::Null, kind, rule));
        assert!(!cells_match(
            &Cell::Null,
            &Cell::Value(Value::Integer(0)),
            kind,
            rule
        ));
    }

    #[test]
    fn incomparable_cells_and_columns_never_match() {
        let rule = ToleranceRule::Exact;
        assert!(!cells_match(
            &Cell::Incomparable("x".to_string()),
            &Cell::Incomparable("x".to_string()),
            Some(CompareKind::Text),
            rule
        ));
        // Column-level incomparability: even two nulls mismatch.
        assert!(!cells_match(&Cell::Null, &Cell::Null, None, rule));
    }

    #[test]
    fn numeric_kinds_compare_across_representations() {
        let dec: Decimal = "10.00".parse().unwrap();
        assert!(exact_equal(&Value::Decimal(dec), &Value::Float(10.0)));
        assert!(exact_equal(&Value::Integer(10), &Value::Float(10.0)));
        assert!(!exact_equal(&Value::Integer(10), &Value::Text("10".into())));
    }

    #[test]
    fn compare_pair_derives_row_equality() {
        let plan = vec![
            ColumnPlan {
                name: "a".to_string(),
                left_idx: 0,
                right_idx: 0,
                kind: Some(CompareKind::Numeric),
            },
            ColumnPlan {
                name: "b".to_string(),
                left_idx: 1,
                right_idx: 1,
                kind: Some(CompareKind::Text),
            },
        ];
        let left = vec![
            Cell::Value(Value::Float(10.0)),
            Cell::Value(Value::Text("x".into())),
        ];
        let right = vec![
            Cell::Value(Value::Float(10.004)),
            Cell::Value(Value::Text("y".into())),
        ];
        let config = ToleranceConfig {
            per_column: HashMap::from([("a".to_string(), ToleranceRule::Absolute(0.01))]),
            ..Default::default()
        };
        let outcome = compare_pair(&left, &right, &plan, &config);
        assert_eq!(outcome.flags, vec![true, false]);
        assert!(!outcome.is_equal);
    }
}
