//! # datastd CLI
//!
//! A command-line driver for standardizing raw instrument data files.
//!
//! ## Usage
//!
//! ```bash
//! # Validate a configuration document
//! datastd check pipeline_config.yml
//!
//! # Standardize raw CSV files and store the results
//! datastd run --config pipeline_config.yml input/*.csv
//! ```
//!
//! The driver loop is intentionally thin: batching policy lives here, not in
//! the engine. A file that fails with a data error is logged and skipped so
//! the rest of the batch still processes; a definition error aborts
//! immediately, because the configuration is wrong for every file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::error;

use datastd::config::Config;
use datastd::error::PipelineError;
use datastd::io::read_raw_csv;
use datastd::pipeline::{IngestPipeline, Pipeline};
use datastd::storage::{DatastreamStorage, FilesystemStorage};
use datastd::units::UnitRegistry;

/// datastd - Instrument Data Standardization
#[derive(Parser)]
#[command(name = "datastd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration document and print the derived identity
    Check {
        /// Configuration file(s), merged in order
        #[arg(value_name = "CONFIG", required = true)]
        config: Vec<PathBuf>,
    },

    /// Standardize raw CSV files and store the results
    Run {
        /// Configuration file(s), merged in order
        #[arg(short, long, value_name = "CONFIG", required = true)]
        config: Vec<PathBuf>,

        /// Raw input CSV files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Storage root directory
        #[arg(short, long, default_value = "storage/root")]
        root: PathBuf,
    },

    /// List the stored files of the configured output datastream
    List {
        /// Configuration file(s), merged in order
        #[arg(short, long, value_name = "CONFIG", required = true)]
        config: Vec<PathBuf>,

        /// Storage root directory
        #[arg(short, long, default_value = "storage/root")]
        root: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Run {
            config,
            inputs,
            root,
        } => run(&config, &inputs, &root),
        Commands::List { config, root } => list(&config, &root),
    }
}

fn load_config(paths: &[PathBuf]) -> Result<Config> {
    let units = UnitRegistry::standard();
    Config::load_files(paths, &units).context("configuration is invalid")
}

fn check(paths: &[PathBuf]) -> Result<()> {
    let config = load_config(paths)?;
    let pipeline = &config.pipeline;

    println!("Pipeline type:     {:?}", pipeline.pipeline_type);
    println!("Input datastream:  {}", pipeline.input_datastream_name());
    println!("Output datastream: {}", pipeline.output_datastream_name());
    println!();
    println!("Coordinates:");
    for (name, coord) in &config.dataset.coords {
        println!("  {name} ({})", coord.dtype);
    }
    println!("Data variables:");
    for (name, var) in &config.dataset.data_vars {
        println!("  {name} ({}) dims {:?}", var.dtype, var.dims);
    }
    println!();
    println!("Configuration OK");
    Ok(())
}

fn run(config: &[PathBuf], inputs: &[PathBuf], root: &Path) -> Result<()> {
    let config = load_config(config)?;
    let storage = FilesystemStorage::new(root)?;
    let pipeline = IngestPipeline::new(config, storage);

    let mut failures = 0usize;
    for input in inputs {
        match process(&pipeline, input) {
            Ok(path) => println!("{} -> {}", input.display(), path.display()),
            Err(err @ PipelineError::Definition(_)) => {
                return Err(err).context("configuration is invalid");
            }
            Err(err) => {
                error!("failed to process {}: {err}", input.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} input file(s) failed", inputs.len());
    }
    Ok(())
}

fn process<S: DatastreamStorage>(
    pipeline: &IngestPipeline<S>,
    input: &Path,
) -> Result<PathBuf, PipelineError> {
    let raw = read_raw_csv(input)?;
    pipeline.run(&raw)
}

fn list(config: &[PathBuf], root: &Path) -> Result<()> {
    let config = load_config(config)?;
    let storage = FilesystemStorage::new(root)?;
    let datastream = config.pipeline.output_datastream_name();

    let files = storage.fetch(&datastream)?;
    if files.is_empty() {
        println!("no stored files for {datastream}");
    } else {
        for file in files {
            println!("{}", file.display());
        }
    }
    Ok(())
}
