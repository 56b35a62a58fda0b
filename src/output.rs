//! Serializes the in-memory comparison artifacts to disk: the full
//! merged CSV, the differences-only CSV, duplicate-key CSVs, and the
//! summary report in text and JSON form.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::info;

use crate::{
    duplicates::DuplicateGroup,
    excel, io_utils,
    report::{ComparisonReport, MergedRow},
};

const LEFT_SUFFIX: &str = "_source1";
const RIGHT_SUFFIX: &str = "_source2";

/// Which artifacts to write and how to encode them. The engine always
/// produces all artifacts in memory; these flags only gate persistence.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    pub full_csv: bool,
    pub diff_csv: bool,
    pub summary_text: bool,
    pub summary_json: bool,
    pub side_by_side_xlsx: bool,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl OutputOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            full_csv: true,
            diff_csv: true,
            summary_text: true,
            summary_json: false,
            side_by_side_xlsx: false,
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Writes the selected artifacts and returns the paths produced.
pub fn write_artifacts(report: &ComparisonReport, options: &OutputOptions) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Creating output directory {:?}", options.output_dir))?;
    let mut written = Vec::new();

    if options.full_csv {
        let path = options.output_dir.join("comparison_report.csv");
        let rows: Vec<&MergedRow> = report.rows.iter().collect();
        write_merged_csv(report, &rows, &path, options)?;
        info!("Full comparison report saved to {path:?}");
        written.push(path);
    }

    if options.diff_csv {
        let path = options.output_dir.join("differences_only.csv");
        let rows = report.differences();
        write_merged_csv(report, &rows, &path, options)?;
        info!(
            "Differences-only report saved to {path:?} ({} row(s))",
            report.differences().len()
        );
        written.push(path);
    }

    for (name, groups) in [
        (&report.summary.left_name, &report.left_duplicates),
        (&report.summary.right_name, &report.right_duplicates),
    ] {
        if groups.is_empty() {
            continue;
        }
        let path = options.output_dir.join(format!("duplicates_{name}.csv"));
        write_duplicates_csv(&report.key_columns, groups, &path, options)?;
        info!("Duplicate keys for '{name}' saved to {path:?}");
        written.push(path);
    }

    if options.summary_text {
        let path = options.output_dir.join("summary_report.txt");
        write_summary_text(report, &path)?;
        info!("Summary report saved to {path:?}");
        written.push(path);
    }

    if options.side_by_side_xlsx {
        let path = options.output_dir.join("side_by_side_comparison.xlsx");
        excel::write_side_by_side(report, &path)?;
        info!("Side-by-side Excel report saved to {path:?}");
        written.push(path);
    }

    if options.summary_json {
        let path = options.output_dir.join("summary.json");
        let file =
            File::create(&path).with_context(|| format!("Creating summary JSON {path:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report.summary)
            .context("Writing summary JSON")?;
        info!("Summary JSON saved to {path:?}");
        written.push(path);
    }

    Ok(written)
}

/// Header layout: key columns, then `<col>_source1`/`<col>_source2` value
/// pairs, the `_merge` presence column, `is_equal`, and one `<col>_match`
/// flag per comparing column.
fn merged_headers(report: &ComparisonReport) -> Vec<String> {
    let mut headers = report.key_columns.clone();
    for column in &report.comparing_columns {
        headers.push(format!("{column}{LEFT_SUFFIX}"));
        headers.push(format!("{column}{RIGHT_SUFFIX}"));
    }
    headers.push("_merge".to_string());
    headers.push("is_equal".to_string());
    for column in &report.comparing_columns {
        headers.push(format!("{column}_match"));
    }
    headers
}

fn write_merged_csv(
    report: &ComparisonReport,
    rows: &[&MergedRow],
    path: &Path,
    options: &OutputOptions,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, options.delimiter, options.encoding)?;
    writer
        .write_record(merged_headers(report))
        .context("Writing report headers")?;

    let column_count = report.comparing_columns.len();
    for row in rows {
        let mut record = Vec::with_capacity(report.key_columns.len() + column_count * 3 + 2);
        for cell in &row.key {
            record.push(cell.as_display());
        }
        for idx in 0..column_count {
            record.push(side_display(&row.left, idx));
            record.push(side_display(&row.right, idx));
        }
        record.push(
            row.presence
                .label(&report.summary.left_name, &report.summary.right_name),
        );
        record.push(row.is_equal.to_string());
        for flag in &row.column_match {
            record.push(flag.to_string());
        }
        writer.write_record(&record).context("Writing report row")?;
    }
    writer.flush().context("Flushing report output")?;
    Ok(())
}

fn side_display(side: &Option<Vec<crate::data::Cell>>, idx: usize) -> String {
    side.as_ref()
        .and_then(|cells| cells.get(idx))
        .map(|cell| cell.as_display())
        .unwrap_or_default()
}

fn write_duplicates_csv(
    key_columns: &[String],
    groups: &[DuplicateGroup],
    path: &Path,
    options: &OutputOptions,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, options.delimiter, options.encoding)?;
    let mut headers = key_columns.to_vec();
    headers.push("records".to_string());
    writer
        .write_record(&headers)
        .context("Writing duplicates headers")?;
    for group in groups {
        let mut record = group.key.clone();
        record.push(group.count.to_string());
        writer
            .write_record(&record)
            .context("Writing duplicates row")?;
    }
    writer.flush().context("Flushing duplicates output")?;
    Ok(())
}

fn write_summary_text(report: &ComparisonReport, path: &Path) -> Result<()> {
    let summary = &report.summary;
    let file = File::create(path).with_context(|| format!("Creating summary report {path:?}"))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out, "TABLE RECONCILIATION SUMMARY REPORT")?;
    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out)?;
    writeln!(
        out,
        "Generated: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out)?;
    writeln!(out, "Data Source 1: {}", summary.left_name)?;
    writeln!(out, "  Rows: {}", summary.left_rows)?;
    writeln!(out)?;
    writeln!(out, "Data Source 2: {}", summary.right_name)?;
    writeln!(out, "  Rows: {}", summary.right_rows)?;
    writeln!(out)?;
    writeln!(out, "Join Columns: {}", report.key_columns.iter().join(", "))?;
    writeln!(
        out,
        "Comparing Columns: {}",
        report.comparing_columns.iter().join(", ")
    )?;
    writeln!(out)?;
    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out, "COMPARISON RESULTS")?;
    writeln!(out, "{}", "-".repeat(80))?;
    writeln!(out)?;
    writeln!(out, "Total Rows (after merge): {}", summary.total_rows)?;
    writeln!(out, "Equal Rows: {}", summary.equal_rows)?;
    writeln!(out, "Different Rows: {}", summary.different_rows)?;
    writeln!(
        out,
        "Match Percentage: {:.2}%",
        summary.match_percentage
    )?;
    writeln!(out)?;
    writeln!(out, "MERGE STATUS:")?;
    writeln!(out, "  Rows in Both Sources: {}", summary.in_both)?;
    writeln!(
        out,
        "  Only in {}: {}",
        summary.left_name, summary.only_in_left
    )?;
    writeln!(
        out,
        "  Only in {}: {}",
        summary.right_name, summary.only_in_right
    )?;
    writeln!(out)?;

    if summary.different_rows == 0 && summary.only_in_left == 0 && summary.only_in_right == 0 {
        writeln!(out, "MATCHING STATUS: PERFECT MATCH [OK]")?;
        writeln!(
            out,
            "All rows are present in both sources and all values match."
        )?;
    } else {
        writeln!(out, "MATCHING STATUS: DIFFERENCES FOUND [WARNING]")?;
        if summary.different_rows > 0 {
            writeln!(
                out,
                "  - {} rows have different values",
                summary.different_rows
            )?;
        }
        if summary.only_in_left > 0 {
            writeln!(
                out,
                "  - {} rows exist only in {}",
                summary.only_in_left, summary.left_name
            )?;
        }
        if summary.only_in_right > 0 {
            writeln!(
                out,
                "  - {} rows exist only in {}",
                summary.only_in_right, summary.right_name
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "DUPLICATE KEYS:")?;
    writeln!(
        out,
        "  {}: {} duplicate group(s)",
        summary.left_name, summary.left_duplicate_groups
    )?;
    writeln!(
        out,
        "  {}: {} duplicate group(s)",
        summary.right_name, summary.right_duplicate_groups
    )?;

    if !report.diagnostics.is_empty() {
        writeln!(out)?;
        writeln!(out, "DIAGNOSTICS:")?;
        for diagnostic in &report.diagnostics {
            writeln!(out, "  [{:?}] {}", diagnostic.severity, diagnostic.message)?;
        }
    }

    out.flush().context("Flushing summary report")?;
    Ok(())
}
