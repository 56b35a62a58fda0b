//! Wires the `compare` subcommand to the engine: loads both exports,
//! builds a [`CompareSpec`] from the flags, and writes the artifacts.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::CompareArgs,
    compare::{ToleranceConfig, ToleranceRule},
    dataset::Dataset,
    engine::{self, CompareSpec, JoinColumn},
    io_utils,
    output::{self, OutputOptions},
    schema::Schema,
};

pub fn execute(args: &CompareArgs) -> Result<()> {
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;

    let left = load_dataset(
        &args.left_name,
        &args.left,
        args.left_schema.as_deref(),
        args,
        input_encoding,
    )?;
    let right = load_dataset(
        &args.right_name,
        &args.right,
        args.right_schema.as_deref(),
        args,
        input_encoding,
    )?;

    let mut spec = CompareSpec::new(
        args.join
            .iter()
            .map(|column| JoinColumn::named(column.clone()))
            .collect(),
    );
    if !args.columns.is_empty() {
        spec.comparing_columns = Some(args.columns.clone());
    }
    spec.column_mapping = parse_pairs(&args.mappings, "--map")?
        .into_iter()
        .collect::<HashMap<_, _>>();
    spec.tolerances = build_tolerances(args)?;
    spec.validate_duplicates = !args.no_validate_duplicates;

    let report = engine::run(&spec, left, right)?;

    let mut options = OutputOptions::new(args.output_dir.clone());
    options.full_csv = !args.no_full_csv;
    options.diff_csv = !args.no_diff_csv;
    options.summary_text = !args.no_summary;
    options.summary_json = args.summary_json;
    options.side_by_side_xlsx = args.side_by_side_xlsx;
    options.encoding = output_encoding;
    let written = output::write_artifacts(&report, &options)?;
    info!("Wrote {} artifact(s) to {:?}", written.len(), args.output_dir);
    Ok(())
}

fn load_dataset(
    name: &str,
    path: &Path,
    schema_path: Option<&Path>,
    args: &CompareArgs,
    encoding: &'static encoding_rs::Encoding,
) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(path, args.delimiter);
    let schema = match schema_path {
        Some(schema_path) => Some(
            Schema::load(schema_path)
                .with_context(|| format!("Loading schema from {schema_path:?}"))?,
        ),
        None => None,
    };
    Dataset::from_csv_path(name, path, schema, delimiter, encoding)
}

fn build_tolerances(args: &CompareArgs) -> Result<ToleranceConfig> {
    let mut per_column = HashMap::new();
    for (column, value) in parse_pairs(&args.tolerances, "--tolerance")? {
        per_column.insert(column, ToleranceRule::Absolute(parse_epsilon(&value)?));
    }
    for (column, value) in parse_pairs(&args.rel_tolerances, "--rel-tolerance")? {
        per_column.insert(column, ToleranceRule::Relative(parse_epsilon(&value)?));
    }
    Ok(ToleranceConfig {
        per_column,
        abs_tol: args.abs_tol,
        rel_tol: args.rel_tol,
    })
}

fn parse_epsilon(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("Invalid tolerance value '{value}'"))
}

/// Splits repeatable `key=value` flags, rejecting entries without a `=`.
fn parse_pairs(entries: &[String], flag: &str) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| anyhow!("Invalid {flag} value '{entry}'; expected KEY=VALUE"))
        })
        .collect()
}
