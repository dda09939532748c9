//! rddprep: parallel preparation of multi-country road damage datasets.
//!
//! The pipeline converts Pascal VOC XML annotations into normalized YOLO
//! label files, shuffles and splits each country's images into train and
//! validation subsets, and copies image/label pairs into a single training
//! tree. Every stage fans its work out over a fixed number of workers.
//!
//! # Modules
//!
//! - [`partition`]: Split a work list into contiguous shards
//! - [`orchestrator`]: Run one worker per shard and join them
//! - [`transcode`]: VOC XML to YOLO label conversion
//! - [`materialize`]: Shuffle, split and copy paired records
//! - [`resize`]: In-place image resizing
//! - [`stats`]: Per-country dataset statistics
//! - [`pipeline`]: Multi-country drivers tying the stages together
//! - [`error`]: Error types for rddprep operations

pub mod error;
pub mod layout;
pub mod materialize;
pub mod orchestrator;
pub mod partition;
pub mod pipeline;
pub mod resize;
pub mod stats;
pub mod transcode;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::PrepError;

use orchestrator::RunOptions;
use pipeline::PipelineConfig;
use transcode::{ClassTable, WritePolicy};

/// The rddprep CLI application.
#[derive(Parser)]
#[command(name = "rddprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert VOC XML annotations of every country into YOLO label files.
    Convert(ConvertArgs),
    /// Shuffle, split and copy image/label pairs into one training tree.
    Split(SplitArgs),
    /// Resize the images of the training tree in place.
    Resize(ResizeArgs),
    /// Write per-country image and label counts to <data-dir>/stats.
    Stats(StatsArgs),
}

/// Options shared by the parallel subcommands.
#[derive(clap::Args)]
struct PipelineArgs {
    /// Dataset root containing one directory per country.
    #[arg(long, env = "RDDPREP_DATA_DIR")]
    data_dir: PathBuf,

    /// Number of concurrent workers per stage.
    #[arg(long, env = "RDDPREP_WORKERS", default_value_t = 3, value_parser = parse_workers)]
    workers: usize,

    /// Name of the materialized dataset directory under the data root.
    #[arg(long, default_value = layout::DEFAULT_OUTPUT_NAME)]
    out_name: String,

    /// Stop starting new items after the first failure.
    #[arg(long)]
    fail_fast: bool,
}

impl PipelineArgs {
    fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.data_dir,
            workers: self.workers,
            out_name: self.out_name,
            run: RunOptions {
                fail_fast: self.fail_fast,
                ..Default::default()
            },
        }
    }
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Ordered class names; the position of a name is its class index.
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Replace label files that already exist.
    #[arg(long)]
    overwrite: bool,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Fraction of each country's images assigned to the training subset.
    #[arg(long, default_value_t = materialize::DEFAULT_TRAIN_RATIO, value_parser = parse_ratio)]
    ratio: f64,

    /// Seed for a reproducible shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Ordered class names written to data.yaml.
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,
}

/// Arguments for the resize subcommand.
#[derive(clap::Args)]
struct ResizeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Length of the shorter image side after resizing.
    #[arg(long, default_value_t = resize::DEFAULT_TARGET_SIZE)]
    target_size: u32,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// Dataset root containing one directory per country.
    #[arg(long, env = "RDDPREP_DATA_DIR")]
    data_dir: PathBuf,

    /// Name of the materialized dataset directory, excluded from the table.
    #[arg(long, default_value = layout::DEFAULT_OUTPUT_NAME)]
    out_name: String,

    /// Output format for the table printed to stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn parse_workers(value: &str) -> Result<usize, String> {
    let workers: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a whole number"))?;
    if workers == 0 {
        return Err("worker count must be at least 1".to_string());
    }
    Ok(workers)
}

fn parse_ratio(value: &str) -> Result<f64, String> {
    let ratio: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    materialize::validate_ratio(ratio).map_err(|e| e.to_string())?;
    Ok(ratio)
}

fn class_table(names: Option<Vec<String>>) -> Result<ClassTable, PrepError> {
    match names {
        Some(names) => ClassTable::new(names),
        None => Ok(ClassTable::road_damage()),
    }
}

/// Run the rddprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Resize(args)) => run_resize(args),
        Some(Commands::Stats(args)) => run_stats(args),
        None => {
            println!("rddprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Road damage dataset preparation.");
            println!();
            println!("Run 'rddprep --help' for usage information.");
            Ok(())
        }
    }
}

/// Map the totals of a finished stage to the process result.
fn finish(processed: usize, failed: usize) -> Result<(), PrepError> {
    if failed > 0 {
        Err(PrepError::PipelineFailed { processed, failed })
    } else {
        Ok(())
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), PrepError> {
    let classes = class_table(args.classes)?;
    let policy = if args.overwrite {
        WritePolicy::Overwrite
    } else {
        WritePolicy::SkipExisting
    };
    let config = args.pipeline.into_config();

    let report = pipeline::convert_all(&config, &classes, policy)?;
    print!("{}", report);
    finish(report.attempted(), report.failed())
}

fn run_split(args: SplitArgs) -> Result<(), PrepError> {
    let classes = class_table(args.classes)?;
    let config = args.pipeline.into_config();

    let report = pipeline::materialize_all(&config, args.ratio, args.seed, &classes)?;
    print!("{}", report);
    finish(report.attempted(), report.failed())
}

fn run_resize(args: ResizeArgs) -> Result<(), PrepError> {
    let config = args.pipeline.into_config();

    let report = pipeline::resize_all(&config, args.target_size)?;
    print!("{}", report);
    finish(report.attempted(), report.failed())
}

fn run_stats(args: StatsArgs) -> Result<(), PrepError> {
    let mut config = PipelineConfig::new(args.data_dir);
    config.out_name = args.out_name;

    let report = pipeline::stats_all(&config)?;
    match args.output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => print!("{}", report),
    }
    Ok(())
}
