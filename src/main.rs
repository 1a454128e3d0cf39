mod aggregate;
mod cli;
mod error;
mod frequency;
mod histogram;
mod inference;
mod logging;
mod output;
mod privacy;
mod readers;
mod report;
mod schema;
mod stats;
mod strata;
mod types;

use std::io::IsTerminal;

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use logging::{init_logging, LogConfig};
use schema::SchemaCatalog;
use types::Result;

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_format(cli.log_format)
        .with_ansi(std::io::stderr().is_terminal());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.processing_options();

    let catalog = match &cli.schema {
        Some(path) => {
            info!("Loading schema catalog from {}", path.display());
            SchemaCatalog::from_path(path)?
        }
        None => SchemaCatalog::builtin()?,
    };

    info!("Aggregating (min_cell={})", options.min_cell);
    let report = report::build_report(&cli.input, &catalog, &options)?;

    if cli.writes_stdout() {
        output::write_json_stdout(&report, options.pretty)?;
    } else {
        info!("Writing {}", cli.output.display());
        let size = output::write_json_file(&report, &cli.output, options.pretty)?;
        info!(
            "Done. {} ({:.1} KB)",
            cli.output.display(),
            size as f64 / 1024.0
        );
    }

    info!(
        "Whole-cohort stats for {} variables, stratified by {} variables",
        report.meta.n_variables,
        report.meta.strat_variables.len()
    );
    info!(
        "Suppressed: {} strata and {} frequency cells (min_cell={})",
        report.meta.suppressed_strata,
        report.meta.suppressed_cells,
        report.meta.min_cell
    );

    Ok(())
}
