//! YAML-driven job runner: a job file declares named comparisons, each
//! with two source exports, a join spec, tolerances, and artifact flags.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::{error, info};
use serde::Deserialize;

use crate::{
    cli::RunArgs,
    compare::{ToleranceConfig, ToleranceRule},
    dataset::Dataset,
    engine::{self, CompareSpec, JoinColumn},
    error::ConfigError,
    io_utils,
    output::{self, OutputOptions},
    schema::Schema,
    transform::Transform,
};

#[derive(Debug, Deserialize)]
pub struct JobFile {
    pub comparisons: BTreeMap<String, JobConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schema: Option<PathBuf>,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// A join column is either a plain name shared by both sides, or a spec
/// with per-side source columns and transforms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JoinColumnConfig {
    Name(String),
    Spec {
        column: String,
        #[serde(default)]
        source1_column: Option<String>,
        #[serde(default)]
        source2_column: Option<String>,
        #[serde(default)]
        source1_transform: Option<String>,
        #[serde(default)]
        source2_transform: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub source1: SourceConfig,
    pub source2: SourceConfig,
    pub join_columns: Vec<JoinColumnConfig>,
    #[serde(default)]
    pub comparing_columns: Option<Vec<String>>,
    #[serde(default)]
    pub column_mapping: HashMap<String, String>,
    /// Per-column absolute tolerances.
    #[serde(default)]
    pub tolerance: HashMap<String, f64>,
    /// Per-column relative tolerances.
    #[serde(default)]
    pub rel_tolerance: HashMap<String, f64>,
    #[serde(default)]
    pub abs_tol: f64,
    #[serde(default)]
    pub rel_tol: f64,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub generate_full_csv: bool,
    #[serde(default = "default_true")]
    pub generate_diff_csv: bool,
    #[serde(default = "default_true")]
    pub generate_summary: bool,
    #[serde(default)]
    pub generate_summary_json: bool,
    #[serde(default)]
    pub generate_side_by_side_excel: bool,
    #[serde(default = "default_true")]
    pub validate_duplicates: bool,
}

pub fn load_job_file(path: &Path) -> Result<JobFile> {
    let file = File::open(path).with_context(|| format!("Opening job file {path:?}"))?;
    let parsed = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing job file {path:?}"))?;
    Ok(parsed)
}

pub fn execute(args: &RunArgs) -> Result<()> {
    let job_file = load_job_file(&args.config)?;
    if let Some(name) = &args.job
        && !job_file.comparisons.contains_key(name)
    {
        return Err(ConfigError::UnknownJob { name: name.clone() }.into());
    }

    let mut succeeded = Vec::new();
    let mut with_differences = Vec::new();
    let mut failed = Vec::new();

    for (name, config) in &job_file.comparisons {
        if let Some(filter) = &args.job
            && filter != name
        {
            continue;
        }
        info!("{}", "=".repeat(80));
        info!("Running job: {name}");
        info!("{}", "=".repeat(80));
        match run_job(name, config) {
            Ok(clean) => {
                if clean {
                    succeeded.push(name.clone());
                } else {
                    with_differences.push(name.clone());
                }
            }
            Err(err) => {
                error!("Job '{name}' failed: {err:#}");
                failed.push(name.clone());
            }
        }
    }

    info!(
        "Jobs complete: {} matched, {} with differences, {} failed",
        succeeded.len(),
        with_differences.len(),
        failed.len()
    );
    if !failed.is_empty() {
        bail!("{} job(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Runs a single job; returns true when the comparison is a perfect match.
fn run_job(name: &str, config: &JobConfig) -> Result<bool> {
    let left = load_source(&config.source1, "source1")?;
    let right = load_source(&config.source2, "source2")?;

    let mut spec = CompareSpec::new(resolve_join_columns(&config.join_columns)?);
    spec.comparing_columns = config.comparing_columns.clone();
    spec.column_mapping = config.column_mapping.clone();
    spec.tolerances = build_tolerances(config);
    spec.validate_duplicates = config.validate_duplicates;

    let report = engine::run(&spec, left, right)?;

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("output").join(name));
    let mut options = OutputOptions::new(output_dir);
    options.full_csv = config.generate_full_csv;
    options.diff_csv = config.generate_diff_csv;
    options.summary_text = config.generate_summary;
    options.summary_json = config.generate_summary_json;
    options.side_by_side_xlsx = config.generate_side_by_side_excel;
    output::write_artifacts(&report, &options)?;

    let summary = &report.summary;
    Ok(summary.different_rows == 0 && summary.only_in_left == 0 && summary.only_in_right == 0)
}

fn load_source(config: &SourceConfig, default_name: &str) -> Result<Dataset> {
    let name = config.name.clone().unwrap_or_else(|| default_name.to_string());
    let encoding = io_utils::resolve_encoding(config.encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&config.path, source_delimiter(config)?);
    let schema = match &config.schema {
        Some(path) => Some(
            Schema::load(path).with_context(|| format!("Loading schema from {path:?}"))?,
        ),
        None => None,
    };
    Dataset::from_csv_path(name, &config.path, schema, delimiter, encoding)
}

/// CSV delimiters are single bytes; casting a wider char would silently
/// truncate it to an unrelated byte.
fn source_delimiter(config: &SourceConfig) -> Result<Option<u8>> {
    match config.delimiter {
        Some(ch) if ch.is_ascii() => Ok(Some(ch as u8)),
        Some(ch) => bail!("Unsupported delimiter {ch:?} in job file; use a single ASCII character"),
        None => Ok(None),
    }
}

fn resolve_join_columns(configs: &[JoinColumnConfig]) -> Result<Vec<JoinColumn>> {
    configs
        .iter()
        .map(|config| {
            Ok(match config {
                JoinColumnConfig::Name(name) => JoinColumn::named(name.clone()),
                JoinColumnConfig::Spec {
                    column,
                    source1_column,
                    source2_column,
                    source1_transform,
                    source2_transform,
                } => JoinColumn {
                    column: column.clone(),
                    left_column: source1_column.clone(),
                    right_column: source2_column.clone(),
                    left_transform: parse_transform(source1_transform.as_deref())?,
                    right_transform: parse_transform(source2_transform.as_deref())?,
                },
            })
        })
        .collect()
}

fn parse_transform(spec: Option<&str>) -> Result<Option<Transform>> {
    match spec {
        Some(spec) => Ok(Some(Transform::parse(spec)?)),
        None => Ok(None),
    }
}

fn build_tolerances(config: &JobConfig) -> ToleranceConfig {
    let mut per_column = HashMap::new();
    for (column, epsilon) in &config.tolerance {
        per_column.insert(column.clone(), ToleranceRule::Absolute(*epsilon));
    }
    for (column, epsilon) in &config.rel_tolerance {
        per_column.insert(column.clone(), ToleranceRule::Relative(*epsilon));
    }
    ToleranceConfig {
        per_column,
        abs_tol: config.abs_tol,
        rel_tol: config.rel_tol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_file_parses_plain_and_spec_join_columns() {
        let yaml = r#"
comparisons:
  orders:
    source1:
      path: left.csv
    source2:
      path: right.csv
      name: staging
    join_columns:
      - id
      - column: customer_id
        source1_column: cust_id
        source1_transform: remove_prefix_and_int
    tolerance:
      total: 0.01
    rel_tol: 0.001
"#;
        let parsed: JobFile = serde_yaml::from_str(yaml).unwrap();
        let job = &parsed.comparisons["orders"];
        assert_eq!(job.source2.name.as_deref(), Some("staging"));
        assert_eq!(job.join_columns.len(), 2);
        assert!(matches!(&job.join_columns[0], JoinColumnConfig::Name(n) if n == "id"));
        assert!(matches!(
            &job.join_columns[1],
            JoinColumnConfig::Spec { column, .. } if column == "customer_id"
        ));
        assert_eq!(job.tolerance["total"], 0.01);
        assert_eq!(job.rel_tol, 0.001);
        assert!(job.generate_full_csv);
        assert!(job.validate_duplicates);
    }

    #[test]
    fn source_delimiter_rejects_non_ascii_chars() {
        let mut config = SourceConfig {
            path: PathBuf::from("a.csv"),
            name: None,
            schema: None,
            delimiter: Some(';'),
            encoding: None,
        };
        assert_eq!(source_delimiter(&config).unwrap(), Some(b';'));

        config.delimiter = Some('\t');
        assert_eq!(source_delimiter(&config).unwrap(), Some(b'\t'));

        config.delimiter = Some('→');
        let err = source_delimiter(&config).unwrap_err();
        assert!(err.to_string().contains("Unsupported delimiter"));

        config.delimiter = None;
        assert_eq!(source_delimiter(&config).unwrap(), None);
    }

    #[test]
    fn tolerances_merge_into_column_rules() {
        let yaml = r#"
comparisons:
  j:
    source1: { path: a.csv }
    source2: { path: b.csv }
    join_columns: [id]
    tolerance: { total: 0.05 }
    rel_tolerance: { rate: 0.01 }
"#;
        let parsed: JobFile = serde_yaml::from_str(yaml).unwrap();
        let config = build_tolerances(&parsed.comparisons["j"]);
        assert_eq!(config.rule_for("total"), ToleranceRule::Absolute(0.05));
        assert_eq!(config.rule_for("rate"), ToleranceRule::Relative(0.01));
        assert_eq!(config.rule_for("other"), ToleranceRule::Exact);
    }
}
