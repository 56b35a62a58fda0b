use thiserror::Error;

/// Configuration problems detected before any row processing starts.
///
/// These fail the run immediately; recoverable conditions (duplicate keys,
/// unparseable cells, type drift between the two sources) are reported as
/// diagnostics instead and never abort a comparison.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("join key must contain at least one column")]
    EmptyJoinKey,
    #[error("join column '{column}' not found in dataset '{dataset}'")]
    MissingJoinColumn { column: String, dataset: String },
    #[error("comparing column '{column}' not found in dataset '{dataset}'")]
    MissingCompareColumn { column: String, dataset: String },
    #[error("unknown transform '{name}'; available transforms: {available}")]
    UnknownTransform { name: String, available: String },
    #[error("tolerance for column '{column}' must be non-negative (got {value})")]
    NegativeTolerance { column: String, value: f64 },
    #[error("global {kind} tolerance must be non-negative (got {value})")]
    NegativeGlobalTolerance { kind: String, value: f64 },
    #[error("job '{name}' not found in job file")]
    UnknownJob { name: String },
}
