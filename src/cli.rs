use std::path::PathBuf;

use clap::builder::TypedValueParser;
use clap::{ArgAction, Parser};

use crate::logging::LogFormat;
use crate::types::{
    ProcessingOptions, DEFAULT_INPUT, DEFAULT_MIN_CELL, DEFAULT_OUTPUT, DEFAULT_TARGET_BINS,
};

/// Aggregate individual-level cohort records into privacy-safe summary statistics
#[derive(Parser, Debug)]
#[command(name = "cohort-aggregate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file: JSON array of records, or CSV/TSV with a header row
    #[arg(long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Output JSON file path ("-" for stdout)
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Suppress counts below this threshold
    #[arg(long = "min-cell", default_value_t = DEFAULT_MIN_CELL)]
    pub min_cell: u64,

    /// Target bin count for continuous and wide integer histograms
    #[arg(
        long,
        default_value_t = DEFAULT_TARGET_BINS,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
    )]
    pub bins: usize,

    /// Schema catalog JSON (built-in Generations Study catalog if omitted)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Record the SHA-256 of the input file in the metadata
    #[arg(long, default_value_t = false)]
    pub hash_file: bool,

    /// Indent the output document
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (-q warnings only, -qq errors only)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            min_cell: self.min_cell,
            target_bins: self.bins,
            hash_file: self.hash_file,
            pretty: self.pretty,
        }
    }

    /// Whether the document goes to stdout
    pub fn writes_stdout(&self) -> bool {
        self.output.as_os_str() == "-"
    }
}
