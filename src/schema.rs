//! Column metadata for a dataset: ordered column names with declared types,
//! YAML persistence, header validation, and type inference from a CSV sample.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    data::{parse_naive_date, parse_naive_datetime},
    io_utils,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Guid,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Float | ColumnType::Decimal
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: ColumnType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn from_headers(headers: &[String]) -> Self {
        let columns = headers
            .iter()
            .map(|name| ColumnMeta {
                name: name.clone(),
                data_type: ColumnType::Text,
            })
            .collect();
        Schema { columns }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Renames a column in place; no-op when the column is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.column_index(from) {
            self.columns[idx].name = to.to_string();
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Ok(schema)
    }

    pub fn validate_headers(&self, headers: &[String]) -> Result<()> {
        if headers.len() != self.columns.len() {
            return Err(anyhow!(
                "Header length mismatch: schema expects {} column(s) but file contains {}",
                self.columns.len(),
                headers.len()
            ));
        }
        for (idx, column) in self.columns.iter().enumerate() {
            let name = headers.get(idx).map(|s| s.as_str()).unwrap_or_default();
            if column.name != name {
                return Err(anyhow!(
                    "Header mismatch at position {}: expected '{}' but found '{}'",
                    idx + 1,
                    column.name,
                    name
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    possible_boolean: bool,
    possible_date: bool,
    possible_datetime: bool,
    possible_guid: bool,
    saw_value: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            possible_boolean: true,
            possible_date: true,
            possible_datetime: true,
            possible_guid: true,
            saw_value: false,
        }
    }

    fn observe(&mut self, value: &str) {
        self.saw_value = true;
        // Bare 0/1 samples stay numeric: a key column holding only 0 and 1
        // must canonicalize the same way as one that also holds 2.
        if self.possible_boolean
            && !matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
            )
        {
            self.possible_boolean = false;
        }
        if self.possible_integer && value.trim().parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.trim().parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_date && parse_naive_date(value).is_err() {
            self.possible_date = false;
        }
        if self.possible_datetime && parse_naive_datetime(value).is_err() {
            self.possible_datetime = false;
        }
        if self.possible_guid {
            let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
            if Uuid::parse_str(trimmed).is_err() {
                self.possible_guid = false;
            }
        }
    }

    fn decide(&self) -> ColumnType {
        // A column with no non-empty samples stays Text.
        if !self.saw_value {
            ColumnType::Text
        } else if self.possible_boolean {
            ColumnType::Boolean
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else if self.possible_date {
            ColumnType::Date
        } else if self.possible_datetime {
            ColumnType::DateTime
        } else if self.possible_guid {
            ColumnType::Guid
        } else {
            ColumnType::Text
        }
    }
}

/// Infers a schema by sampling rows of a delimited file. `sample_rows` of
/// zero scans the whole file.
pub fn infer_schema(
    path: &Path,
    sample_rows: usize,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Schema> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let mut candidates = vec![TypeCandidate::new(); headers.len()];

    for (row_idx, record) in reader.byte_records().enumerate() {
        if sample_rows > 0 && row_idx >= sample_rows {
            break;
        }
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        for (idx, field) in decoded.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            if let Some(candidate) = candidates.get_mut(idx) {
                candidate.observe(field);
            }
        }
    }

    let columns = headers
        .into_iter()
        .zip(candidates.iter())
        .map(|(name, candidate)| ColumnMeta {
            name,
            data_type: candidate.decide(),
        })
        .collect();
    Ok(Schema { columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(values: &[&str]) -> ColumnType {
        let mut candidate = TypeCandidate::new();
        for value in values {
            candidate.observe(value);
        }
        candidate.decide()
    }

    #[test]
    fn inference_prefers_narrowest_type() {
        assert_eq!(decide(&["true", "no", "Y"]), ColumnType::Boolean);
        assert_eq!(decide(&["1", "42", "-7"]), ColumnType::Integer);
        assert_eq!(decide(&["1.5", "2"]), ColumnType::Float);
        assert_eq!(decide(&["2024-05-06", "2023-01-01"]), ColumnType::Date);
        assert_eq!(decide(&["abc", "1"]), ColumnType::Text);
    }

    #[test]
    fn bare_zero_one_samples_infer_integer() {
        assert_eq!(decide(&["1", "0", "1"]), ColumnType::Integer);
        assert_eq!(decide(&["0"]), ColumnType::Integer);
    }

    #[test]
    fn inference_without_samples_is_text() {
        assert_eq!(TypeCandidate::new().decide(), ColumnType::Text);
    }

    #[test]
    fn validate_headers_reports_position() {
        let schema = Schema::from_headers(&["id".to_string(), "name".to_string()]);
        let err = schema
            .validate_headers(&["id".to_string(), "label".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("position 2"));
    }

    #[test]
    fn rename_column_is_noop_for_unknown_names() {
        let mut schema = Schema::from_headers(&["id".to_string()]);
        schema.rename_column("missing", "other");
        assert_eq!(schema.headers(), vec!["id".to_string()]);
        schema.rename_column("id", "key");
        assert_eq!(schema.headers(), vec!["key".to_string()]);
    }
}
