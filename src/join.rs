//! Full outer join of two normalized datasets on a composite key.
//!
//! Duplicate key tuples are paired positionally in encounter order up to
//! the shorter duplicate count; surplus rows surface as one-sided entries
//! instead of exploding into a Cartesian product.

use std::collections::{HashMap, VecDeque};

use crate::{data::Cell, normalize::NormalizedDataset};

const KEY_SEPARATOR: &str = "\u{1f}";

/// One entry of the joined result. Row indices point into the source
/// datasets, so downstream stages can fetch whichever cells they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinedRow {
    Matched { left: usize, right: usize },
    LeftOnly { left: usize },
    RightOnly { right: usize },
}

/// Canonical display forms of one row's key cells.
pub fn key_parts(row: &[Cell], key_indices: &[usize]) -> Vec<String> {
    key_indices
        .iter()
        .map(|idx| row.get(*idx).map(Cell::as_display).unwrap_or_default())
        .collect()
}

/// Joins the key parts into a single hashable tuple representation.
pub fn key_of(row: &[Cell], key_indices: &[usize]) -> String {
    key_parts(row, key_indices).join(KEY_SEPARATOR)
}

/// Performs the full outer join. The result lists left-anchored rows
/// (matched and left-only, interleaved) in dataset-1 order, followed by
/// right-only rows in dataset-2 order. Zero overlap is a valid outcome.
pub fn full_outer_join(
    left: &NormalizedDataset,
    right: &NormalizedDataset,
    left_key: &[usize],
    right_key: &[usize],
) -> Vec<JoinedRow> {
    let mut right_buckets: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (idx, row) in right.rows.iter().enumerate() {
        right_buckets
            .entry(key_of(row, right_key))
            .or_default()
            .push_back(idx);
    }

    let mut consumed = vec![false; right.rows.len()];
    let mut joined = Vec::with_capacity(left.rows.len() + right.rows.len());

    for (left_idx, row) in left.rows.iter().enumerate() {
        let key = key_of(row, left_key);
        match right_buckets.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(right_idx) => {
                consumed[right_idx] = true;
                joined.push(JoinedRow::Matched {
                    left: left_idx,
                    right: right_idx,
                });
            }
            None => joined.push(JoinedRow::LeftOnly { left: left_idx }),
        }
    }

    for (right_idx, was_consumed) in consumed.iter().enumerate() {
        if !was_consumed {
            joined.push(JoinedRow::RightOnly { right: right_idx });
        }
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::schema::Schema;

    fn dataset(name: &str, keys: &[&str]) -> NormalizedDataset {
        NormalizedDataset {
            name: name.to_string(),
            schema: Schema::from_headers(&["id".to_string()]),
            rows: keys
                .iter()
                .map(|k| vec![Cell::Value(Value::Text(k.to_string()))])
                .collect(),
        }
    }

    #[test]
    fn disjoint_keys_partition_fully() {
        let left = dataset("source1", &["a", "b"]);
        let right = dataset("source2", &["c"]);
        let joined = full_outer_join(&left, &right, &[0], &[0]);
        assert_eq!(
            joined,
            vec![
                JoinedRow::LeftOnly { left: 0 },
                JoinedRow::LeftOnly { left: 1 },
                JoinedRow::RightOnly { right: 0 },
            ]
        );
    }

    #[test]
    fn duplicates_pair_positionally_with_surplus_left_over() {
        let left = dataset("source1", &["k", "k", "k"]);
        let right = dataset("source2", &["k", "k"]);
        let joined = full_outer_join(&left, &right, &[0], &[0]);
        assert_eq!(
            joined,
            vec![
                JoinedRow::Matched { left: 0, right: 0 },
                JoinedRow::Matched { left: 1, right: 1 },
                JoinedRow::LeftOnly { left: 2 },
            ]
        );
    }

    #[test]
    fn result_preserves_source_ordering() {
        let left = dataset("source1", &["x", "m", "y"]);
        let right = dataset("source2", &["q", "m", "p"]);
        let joined = full_outer_join(&left, &right, &[0], &[0]);
        assert_eq!(
            joined,
            vec![
                JoinedRow::LeftOnly { left: 0 },
                JoinedRow::Matched { left: 1, right: 1 },
                JoinedRow::LeftOnly { left: 2 },
                JoinedRow::RightOnly { right: 0 },
                JoinedRow::RightOnly { right: 2 },
            ]
        );
    }

    #[test]
    fn null_key_components_still_join() {
        let left = NormalizedDataset {
            name: "source1".to_string(),
            schema: Schema::from_headers(&["id".to_string()]),
            rows: vec![vec![Cell::Null]],
        };
        let right = left.clone();
        let joined = full_outer_join(&left, &right, &[0], &[0]);
        assert_eq!(joined, vec![JoinedRow::Matched { left: 0, right: 0 }]);
    }
}
