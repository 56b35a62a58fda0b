//! Duplicate join-key detection. An observational pass: duplicate keys are
//! reported so a consumer can judge whether the match percentage is
//! trustworthy, but they never block the join.

use std::collections::HashMap;

use crate::{join, normalize::NormalizedDataset};

/// A join-key tuple shared by more than one row within a single dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Canonical display form of each key column value.
    pub key: Vec<String>,
    pub count: usize,
    /// Zero-based indices of the offending rows, in encounter order.
    pub row_indices: Vec<usize>,
}

/// Groups the dataset's rows by key tuple and returns every group with
/// more than one member, in first-encounter order.
pub fn detect(dataset: &NormalizedDataset, key_indices: &[usize]) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<String>, Vec<usize>)> = HashMap::new();

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let key = join::key_of(row, key_indices);
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (join::key_parts(row, key_indices), Vec::new())
        });
        entry.1.push(row_idx);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (parts, indices) = groups.remove(&key)?;
            (indices.len() > 1).then(|| DuplicateGroup {
                key: parts,
                count: indices.len(),
                row_indices: indices,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cell, Value};
    use crate::schema::Schema;

    fn dataset(keys: &[(i64, &str)]) -> NormalizedDataset {
        NormalizedDataset {
            name: "source1".to_string(),
            schema: Schema::from_headers(&["id".to_string(), "region".to_string()]),
            rows: keys
                .iter()
                .map(|(id, region)| {
                    vec![
                        Cell::Value(Value::Integer(*id)),
                        Cell::Value(Value::Text(region.to_string())),
                    ]
                })
                .collect(),
        }
    }

    #[test]
    fn clean_dataset_has_no_groups() {
        let ds = dataset(&[(1, "eu"), (2, "eu"), (1, "us")]);
        assert!(detect(&ds, &[0, 1]).is_empty());
    }

    #[test]
    fn composite_key_duplicates_are_grouped_with_indices() {
        let ds = dataset(&[(1, "eu"), (2, "us"), (1, "eu"), (1, "eu")]);
        let groups = detect(&ds, &[0, 1]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, vec!["1".to_string(), "eu".to_string()]);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].row_indices, vec![0, 2, 3]);
    }

    #[test]
    fn detection_is_idempotent() {
        let ds = dataset(&[(1, "eu"), (1, "eu"), (2, "us")]);
        assert_eq!(detect(&ds, &[0]), detect(&ds, &[0]));
    }
}
