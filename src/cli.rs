use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "table-recon",
    version,
    about = "Reconcile two tabular query-result exports",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer column types from a delimited export and write a schema file.
    Probe(ProbeArgs),
    /// Compare two delimited exports and write reconciliation artifacts.
    Compare(CompareArgs),
    /// Run the comparison jobs declared in a YAML job file.
    Run(RunArgs),
}

#[derive(Debug, Parser)]
pub struct ProbeArgs {
    /// Delimited export to sample.
    pub input: PathBuf,

    /// Destination path for the inferred schema YAML.
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Number of data rows to sample; 0 scans the whole file.
    #[arg(long, default_value_t = 0)]
    pub sample_rows: usize,

    /// Field delimiter; inferred from the file extension when omitted.
    #[arg(short, long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Input character encoding label, e.g. `utf-8` or `windows-1252`.
    #[arg(long)]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CompareArgs {
    /// First export (dataset 1).
    #[arg(long)]
    pub left: PathBuf,

    /// Second export (dataset 2).
    #[arg(long)]
    pub right: PathBuf,

    /// Schema YAML for the first export; inferred when omitted.
    #[arg(long)]
    pub left_schema: Option<PathBuf>,

    /// Schema YAML for the second export; inferred when omitted.
    #[arg(long)]
    pub right_schema: Option<PathBuf>,

    /// Display name for the first export.
    #[arg(long, default_value = "source1")]
    pub left_name: String,

    /// Display name for the second export.
    #[arg(long, default_value = "source2")]
    pub right_name: String,

    /// Join-key column name(s), comma separated.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub join: Vec<String>,

    /// Columns to compare, comma separated. Defaults to every non-key
    /// column present in both exports.
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Per-column absolute tolerance, e.g. `total=0.01`. Repeatable.
    #[arg(long = "tolerance", action = ArgAction::Append, value_name = "COLUMN=EPSILON")]
    pub tolerances: Vec<String>,

    /// Per-column relative tolerance, e.g. `rate=0.001`. Repeatable.
    #[arg(long = "rel-tolerance", action = ArgAction::Append, value_name = "COLUMN=EPSILON")]
    pub rel_tolerances: Vec<String>,

    /// Default absolute tolerance for numeric columns without an override.
    #[arg(long, default_value_t = 0.0)]
    pub abs_tol: f64,

    /// Default relative tolerance for numeric columns without an override.
    #[arg(long, default_value_t = 0.0)]
    pub rel_tol: f64,

    /// Column rename applied to the first export, e.g. `email1=email`.
    /// Repeatable.
    #[arg(long = "map", action = ArgAction::Append, value_name = "FROM=TO")]
    pub mappings: Vec<String>,

    /// Directory for generated artifacts.
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Skip the full merged comparison CSV.
    #[arg(long)]
    pub no_full_csv: bool,

    /// Skip the differences-only CSV.
    #[arg(long)]
    pub no_diff_csv: bool,

    /// Skip the plain-text summary report.
    #[arg(long)]
    pub no_summary: bool,

    /// Also write the summary as JSON.
    #[arg(long)]
    pub summary_json: bool,

    /// Also write a side-by-side Excel report with difference
    /// highlighting.
    #[arg(long)]
    pub side_by_side_xlsx: bool,

    /// Skip duplicate-key detection.
    #[arg(long)]
    pub no_validate_duplicates: bool,

    /// Field delimiter for both inputs; inferred per file when omitted.
    #[arg(short, long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Input character encoding label for both exports.
    #[arg(long)]
    pub input_encoding: Option<String>,

    /// Character encoding for generated CSV artifacts.
    #[arg(long)]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// YAML job file declaring the comparisons to run.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Run only the named job instead of every job in the file.
    #[arg(long)]
    pub job: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        v if v.as_bytes().len() == 1 => Ok(v.as_bytes()[0]),
        other => Err(format!(
            "Unsupported delimiter {other:?}; use a single character or `tab`"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_accepts_single_characters_and_tab() {
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert!(parse_delimiter("||").is_err());
    }

    #[test]
    fn compare_args_parse() {
        let cli = Cli::parse_from([
            "table-recon",
            "compare",
            "--left",
            "a.csv",
            "--right",
            "b.csv",
            "--join",
            "id,region",
            "--tolerance",
            "total=0.01",
            "--map",
            "email1=email",
            "--summary-json",
        ]);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare subcommand");
        };
        assert_eq!(args.join, vec!["id", "region"]);
        assert_eq!(args.tolerances, vec!["total=0.01"]);
        assert_eq!(args.mappings, vec!["email1=email"]);
        assert_eq!(args.left_name, "source1");
        assert!(args.summary_json);
        assert!(!args.no_validate_duplicates);
    }
}
