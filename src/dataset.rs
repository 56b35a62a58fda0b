use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;

use crate::{
    io_utils,
    schema::{self, Schema},
    transform::Transform,
};

/// A fully materialized result set: a label (e.g. "source1"), its schema,
/// and raw rows as decoded strings. Typed parsing happens in the
/// normalizer so that unparseable cells degrade to diagnostics instead of
/// failing the load.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, schema: Schema, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Loads a delimited export of a query result set. When no schema is
    /// supplied, types are inferred from a full scan of the file.
    pub fn from_csv_path(
        name: impl Into<String>,
        path: &Path,
        provided: Option<Schema>,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let name = name.into();
        let dataset_schema = match provided {
            Some(schema) => schema,
            None => schema::infer_schema(path, 0, delimiter, encoding)
                .with_context(|| format!("Inferring schema from {path:?}"))?,
        };

        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)?;
        dataset_schema
            .validate_headers(&headers)
            .with_context(|| format!("Validating headers for {path:?}"))?;

        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record =
                record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
            rows.push(io_utils::decode_record(&record, encoding)?);
        }
        info!("Loaded {} row(s) from {:?} as '{}'", rows.len(), path, name);
        Ok(Self::new(name, dataset_schema, rows))
    }

    /// Applies a column rename map (old name -> new name). Unknown names
    /// are skipped so one mapping can serve datasets with drifting shapes.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for (from, to) in mapping {
            self.schema.rename_column(from, to);
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        self.schema.rename_column(from, to);
    }

    /// Rewrites every value of `column` through `transform` and re-types
    /// the column accordingly. Returns false when the column is absent.
    pub fn transform_column(&mut self, column: &str, transform: &Transform) -> bool {
        let Some(idx) = self.schema.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            if let Some(value) = row.get_mut(idx) {
                let transformed = transform.apply(value).into_owned();
                *value = transformed;
            }
        }
        self.schema.columns[idx].data_type = transform.result_type();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn sample() -> Dataset {
        let schema = Schema::from_headers(&["id".to_string(), "name".to_string()]);
        Dataset::new(
            "source1",
            schema,
            vec![
                vec!["ext-1".to_string(), "Alice".to_string()],
                vec!["ext-2".to_string(), "Bob".to_string()],
            ],
        )
    }

    #[test]
    fn rename_columns_skips_unknown_names() {
        let mut dataset = sample();
        let mapping = HashMap::from([
            ("name".to_string(), "full_name".to_string()),
            ("ghost".to_string(), "spirit".to_string()),
        ]);
        dataset.rename_columns(&mapping);
        assert_eq!(
            dataset.schema.headers(),
            vec!["id".to_string(), "full_name".to_string()]
        );
    }

    #[test]
    fn transform_column_rewrites_values_and_type() {
        let mut dataset = sample();
        assert!(dataset.transform_column("id", &Transform::RemovePrefixAndInt));
        assert_eq!(dataset.rows[0][0], "1");
        assert_eq!(dataset.rows[1][0], "2");
        assert_eq!(dataset.schema.columns[0].data_type, ColumnType::Integer);
        assert!(!dataset.transform_column("ghost", &Transform::Trim));
    }
}
