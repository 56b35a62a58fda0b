use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

pub mod cli;
pub mod compare;
pub mod compare_cmd;
pub mod data;
pub mod dataset;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod excel;
pub mod io_utils;
pub mod job;
pub mod join;
pub mod normalize;
pub mod output;
pub mod report;
pub mod schema;
pub mod transform;

use cli::{Cli, Commands, ProbeArgs};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("table_recon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Probe(args) => handle_probe(args),
        Commands::Compare(args) => compare_cmd::execute(args),
        Commands::Run(args) => job::execute(args),
    }
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let inferred = schema::infer_schema(&args.input, args.sample_rows, delimiter, encoding)
        .with_context(|| format!("Inferring schema from {:?}", args.input))?;
    inferred
        .save(&args.schema)
        .with_context(|| format!("Writing schema to {:?}", args.schema))?;
    info!(
        "Schema with {} column(s) saved to {:?}",
        inferred.columns.len(),
        args.schema
    );
    Ok(())
}
