//! The reconciliation engine: validates the comparison spec, then runs
//! normalize -> duplicate detection -> outer join -> column comparison ->
//! report assembly as sequential in-memory passes.

use std::collections::HashMap;

use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    compare::{self, ColumnPlan, ComparisonOutcome, ToleranceConfig, ToleranceRule},
    dataset::Dataset,
    duplicates,
    error::ConfigError,
    join::{self, JoinedRow},
    normalize::{self, NormalizedDataset},
    report::{self, ComparisonReport, Diagnostic},
    transform::Transform,
};

/// One join-key column, optionally sourced from differently named columns
/// on either side and transformed before matching.
#[derive(Debug, Clone)]
pub struct JoinColumn {
    pub column: String,
    pub left_column: Option<String>,
    pub right_column: Option<String>,
    pub left_transform: Option<Transform>,
    pub right_transform: Option<Transform>,
}

impl JoinColumn {
    pub fn named(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            left_column: None,
            right_column: None,
            left_transform: None,
            right_transform: None,
        }
    }
}

/// Immutable configuration for one comparison run. Built by the CLI or
/// the YAML job runner and handed to [`run`]; the engine owns no ambient
/// state.
#[derive(Debug, Clone)]
pub struct CompareSpec {
    pub join_columns: Vec<JoinColumn>,
    /// Explicit comparing-column allowlist. `None` compares every column
    /// common to both schemas, join columns excluded.
    pub comparing_columns: Option<Vec<String>>,
    /// Renames applied to dataset 1 before validation, so differently
    /// named columns line up across sources.
    pub column_mapping: HashMap<String, String>,
    pub tolerances: ToleranceConfig,
    pub validate_duplicates: bool,
}

impl CompareSpec {
    pub fn new(join_columns: Vec<JoinColumn>) -> Self {
        Self {
            join_columns,
            comparing_columns: None,
            column_mapping: HashMap::new(),
            tolerances: ToleranceConfig::default(),
            validate_duplicates: true,
        }
    }
}

/// Runs the full comparison pipeline. Configuration errors fail fast
/// before any row processing; everything recoverable lands in the
/// report's diagnostics list.
pub fn run(spec: &CompareSpec, mut left: Dataset, mut right: Dataset) -> Result<ComparisonReport> {
    left.rename_columns(&spec.column_mapping);
    apply_join_specs(spec, &mut left, &mut right);
    validate_config(spec, &left, &right)?;

    let key_columns: Vec<String> = spec
        .join_columns
        .iter()
        .map(|jc| jc.column.clone())
        .collect();
    let comparing = resolve_comparing_columns(spec, &left, &right)?;
    info!(
        "Comparing '{}' ({} rows) with '{}' ({} rows) on key [{}]",
        left.name,
        left.row_count(),
        right.name,
        right.row_count(),
        key_columns.iter().join(", ")
    );

    let mut diagnostics = Vec::new();
    let normalized_left = normalize::normalize(&left, &mut diagnostics);
    let normalized_right = normalize::normalize(&right, &mut diagnostics);
    warn_unreconciled_keys(
        &key_columns,
        &normalized_left,
        &normalized_right,
        &mut diagnostics,
    );

    let plan = build_plan(
        &comparing,
        &normalized_left,
        &normalized_right,
        &mut diagnostics,
    );

    let left_key = key_indices(&normalized_left, &key_columns);
    let right_key = key_indices(&normalized_right, &key_columns);

    let (left_duplicates, right_duplicates) = if spec.validate_duplicates {
        let left_dups = duplicates::detect(&normalized_left, &left_key);
        let right_dups = duplicates::detect(&normalized_right, &right_key);
        report_duplicates(&normalized_left.name, &left_dups, &mut diagnostics);
        report_duplicates(&normalized_right.name, &right_dups, &mut diagnostics);
        (left_dups, right_dups)
    } else {
        (Vec::new(), Vec::new())
    };

    let joined = join::full_outer_join(&normalized_left, &normalized_right, &left_key, &right_key);

    let outcomes: Vec<ComparisonOutcome> = joined
        .iter()
        .filter_map(|entry| match entry {
            JoinedRow::Matched { left, right } => Some(compare::compare_pair(
                &normalized_left.rows[*left],
                &normalized_right.rows[*right],
                &plan,
                &spec.tolerances,
            )),
            _ => None,
        })
        .collect();

    let report = report::assemble(
        &normalized_left,
        &normalized_right,
        &left_key,
        &right_key,
        key_columns,
        &plan,
        &joined,
        &outcomes,
        left_duplicates,
        right_duplicates,
        diagnostics,
    );
    info!(
        "Comparison complete: {} equal, {} different out of {} total ({} in both, {} only in {}, {} only in {})",
        report.summary.equal_rows,
        report.summary.different_rows,
        report.summary.total_rows,
        report.summary.in_both,
        report.summary.only_in_left,
        report.summary.left_name,
        report.summary.only_in_right,
        report.summary.right_name
    );
    Ok(report)
}

/// Renames per-side source columns to the shared key name and applies the
/// configured transforms.
fn apply_join_specs(spec: &CompareSpec, left: &mut Dataset, right: &mut Dataset) {
    for jc in &spec.join_columns {
        if let Some(source) = jc.left_column.as_deref().filter(|s| *s != jc.column) {
            left.rename_column(source, &jc.column);
        }
        if let Some(source) = jc.right_column.as_deref().filter(|s| *s != jc.column) {
            right.rename_column(source, &jc.column);
        }
        if let Some(transform) = &jc.left_transform {
            left.transform_column(&jc.column, transform);
        }
        if let Some(transform) = &jc.right_transform {
            right.transform_column(&jc.column, transform);
        }
    }
}

fn validate_config(spec: &CompareSpec, left: &Dataset, right: &Dataset) -> Result<(), ConfigError> {
    if spec.join_columns.is_empty() {
        return Err(ConfigError::EmptyJoinKey);
    }
    for jc in &spec.join_columns {
        for dataset in [left, right] {
            if !dataset.schema.contains(&jc.column) {
                return Err(ConfigError::MissingJoinColumn {
                    column: jc.column.clone(),
                    dataset: dataset.name.clone(),
                });
            }
        }
    }
    for (column, rule) in &spec.tolerances.per_column {
        let epsilon = match rule {
            ToleranceRule::Absolute(e) | ToleranceRule::Relative(e) => *e,
            ToleranceRule::Exact => continue,
        };
        if epsilon < 0.0 {
            return Err(ConfigError::NegativeTolerance {
                column: column.clone(),
                value: epsilon,
            });
        }
    }
    for (kind, value) in [
        ("absolute", spec.tolerances.abs_tol),
        ("relative", spec.tolerances.rel_tol),
    ] {
        if value < 0.0 {
            return Err(ConfigError::NegativeGlobalTolerance {
                kind: kind.to_string(),
                value,
            });
        }
    }
    Ok(())
}

/// Resolves the comparing-column list: the explicit allowlist (validated
/// against both schemas) or every common column, join key excluded.
fn resolve_comparing_columns(
    spec: &CompareSpec,
    left: &Dataset,
    right: &Dataset,
) -> Result<Vec<String>, ConfigError> {
    let is_key = |name: &str| spec.join_columns.iter().any(|jc| jc.column == name);
    match &spec.comparing_columns {
        Some(explicit) => {
            for column in explicit {
                for dataset in [left, right] {
                    if !dataset.schema.contains(column) {
                        return Err(ConfigError::MissingCompareColumn {
                            column: column.clone(),
                            dataset: dataset.name.clone(),
                        });
                    }
                }
            }
            Ok(explicit
                .iter()
                .filter(|column| !is_key(column))
                .cloned()
                .collect())
        }
        None => Ok(left
            .schema
            .headers()
            .into_iter()
            .filter(|column| !is_key(column) && right.schema.contains(column))
            .collect()),
    }
}

fn build_plan(
    comparing: &[String],
    left: &NormalizedDataset,
    right: &NormalizedDataset,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ColumnPlan> {
    comparing
        .iter()
        .map(|name| {
            // Presence was validated up front; indices are always found.
            let left_idx = left.schema.column_index(name).unwrap_or_default();
            let right_idx = right.schema.column_index(name).unwrap_or_default();
            let left_type = left.schema.columns[left_idx].data_type;
            let right_type = right.schema.columns[right_idx].data_type;
            let kind = normalize::reconcile_kind(left_type, right_type);
            if kind.is_none() {
                diagnostics.push(Diagnostic::warning(format!(
                    "column '{name}': cannot reconcile {left_type:?} ({}) with {right_type:?} ({}); every value pair reported as a mismatch",
                    left.name, right.name
                )));
            }
            ColumnPlan {
                name: name.clone(),
                left_idx,
                right_idx,
                kind,
            }
        })
        .collect()
}

/// Keys match by canonical display text, so key columns whose declared
/// types do not reconcile (e.g. Boolean vs Integer) can silently fail to
/// join. Surface that as a warning rather than an error.
fn warn_unreconciled_keys(
    key_columns: &[String],
    left: &NormalizedDataset,
    right: &NormalizedDataset,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for name in key_columns {
        let (Some(left_idx), Some(right_idx)) =
            (left.schema.column_index(name), right.schema.column_index(name))
        else {
            continue;
        };
        let left_type = left.schema.columns[left_idx].data_type;
        let right_type = right.schema.columns[right_idx].data_type;
        if normalize::reconcile_kind(left_type, right_type).is_none() {
            diagnostics.push(Diagnostic::warning(format!(
                "join column '{name}': {left_type:?} ({}) and {right_type:?} ({}) do not reconcile; keys match by canonical text only",
                left.name, right.name
            )));
        }
    }
}

fn key_indices(dataset: &NormalizedDataset, key_columns: &[String]) -> Vec<usize> {
    key_columns
        .iter()
        .filter_map(|name| dataset.schema.column_index(name))
        .collect()
}

fn report_duplicates(
    name: &str,
    groups: &[duplicates::DuplicateGroup],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if groups.is_empty() {
        return;
    }
    warn!("Found {} duplicate key(s) in {}", groups.len(), name);
    diagnostics.push(Diagnostic::warning(format!(
        "{name}: {} duplicate join key(s); matched pairs for those keys were paired positionally",
        groups.len()
    )));
}
