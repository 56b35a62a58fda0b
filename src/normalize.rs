//! Coerces raw cells into canonical comparable values and reconciles
//! declared column types across the two datasets.

use crate::{
    data::{self, Cell},
    dataset::Dataset,
    report::Diagnostic,
    schema::{ColumnType, Schema},
};

/// The comparison representation two reconciled column types share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Numeric,
    Text,
    Boolean,
    Date,
    DateTime,
    Guid,
}

/// A dataset whose cells have been parsed into typed [`Cell`]s. Row and
/// column order match the source dataset exactly.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Vec<Cell>>,
}

impl NormalizedDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Parses every cell of `dataset` under its declared column type. Cells
/// that fail to parse become [`Cell::Incomparable`] and produce a warning
/// diagnostic; the run continues.
pub fn normalize(dataset: &Dataset, diagnostics: &mut Vec<Diagnostic>) -> NormalizedDataset {
    let mut rows = Vec::with_capacity(dataset.rows.len());
    for (row_idx, raw_row) in dataset.rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(dataset.schema.columns.len());
        for (col_idx, column) in dataset.schema.columns.iter().enumerate() {
            let raw = raw_row.get(col_idx).map(|s| s.as_str()).unwrap_or("");
            match data::parse_typed_value(raw, &column.data_type) {
                Ok(cell) => cells.push(cell),
                Err(_) => {
                    // 1-based data row; datasets need not come from a
                    // headered file, so no header offset is assumed here.
                    diagnostics.push(Diagnostic::warning(format!(
                        "{}: data row {} column '{}': cannot coerce '{}' to {:?}; value treated as a permanent mismatch",
                        dataset.name,
                        row_idx + 1,
                        column.name,
                        raw,
                        column.data_type
                    )));
                    cells.push(Cell::Incomparable(raw.to_string()));
                }
            }
        }
        rows.push(cells);
    }
    NormalizedDataset {
        name: dataset.name.clone(),
        schema: dataset.schema.clone(),
        rows,
    }
}

/// Reconciles the declared types of one comparing column across the two
/// datasets. The numeric family (integer, float, decimal) reconciles to a
/// shared numeric representation; any other pairing must be identical.
/// `None` marks the column incomparable: every matched cell pair in it is
/// reported as a mismatch.
pub fn reconcile_kind(left: ColumnType, right: ColumnType) -> Option<CompareKind> {
    if left.is_numeric() && right.is_numeric() {
        return Some(CompareKind::Numeric);
    }
    match (left, right) {
        (ColumnType::Text, ColumnType::Text) => Some(CompareKind::Text),
        (ColumnType::Boolean, ColumnType::Boolean) => Some(CompareKind::Boolean),
        (ColumnType::Date, ColumnType::Date) => Some(CompareKind::Date),
        (ColumnType::DateTime, ColumnType::DateTime) => Some(CompareKind::DateTime),
        (ColumnType::Guid, ColumnType::Guid) => Some(CompareKind::Guid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::schema::Schema;

    #[test]
    fn numeric_family_reconciles_across_kinds() {
        assert_eq!(
            reconcile_kind(ColumnType::Integer, ColumnType::Decimal),
            Some(CompareKind::Numeric)
        );
        assert_eq!(
            reconcile_kind(ColumnType::Float, ColumnType::Integer),
            Some(CompareKind::Numeric)
        );
    }

    #[test]
    fn mismatched_kinds_are_incomparable() {
        assert_eq!(reconcile_kind(ColumnType::Text, ColumnType::Integer), None);
        assert_eq!(reconcile_kind(ColumnType::Date, ColumnType::DateTime), None);
    }

    #[test]
    fn normalize_degrades_bad_cells_to_incomparable() {
        let mut schema = Schema::from_headers(&["id".to_string()]);
        schema.columns[0].data_type = ColumnType::Integer;
        let dataset = Dataset::new(
            "source1",
            schema,
            vec![
                vec!["7".to_string()],
                vec!["x7".to_string()],
                vec![String::new()],
            ],
        );
        let mut diagnostics = Vec::new();
        let normalized = normalize(&dataset, &mut diagnostics);
        assert_eq!(normalized.rows[0][0], Cell::Value(Value::Integer(7)));
        assert_eq!(normalized.rows[1][0], Cell::Incomparable("x7".to_string()));
        assert_eq!(normalized.rows[2][0], Cell::Null);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("data row 2"));
    }
}
